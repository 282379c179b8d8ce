//! Run orchestrator: drives fetch and extraction across all configured
//! targets with bounded concurrency.
//!
//! Targets are independent: one failure is recorded in that target's
//! outcome and the rest of the run proceeds. Results are aggregated by a
//! single collector after the concurrent work completes, so no two
//! targets ever contend over shared output state.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::ExtractionEngine;
use crate::fetchers::{FetcherExt, HttpFetcher, RateLimitedFetcher, RetryingFetcher};
use crate::traits::extractor::FieldExtractor;
use crate::traits::fetcher::Fetcher;
use crate::types::config::{RunConfig, TargetConfig};
use crate::types::record::ExtractedRecord;

/// What happened for one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetOutcome {
    pub target: String,
    pub url: String,
    pub records: Vec<ExtractedRecord>,
    /// Set when the target failed outright (fetch exhausted retries,
    /// no pattern found, invalid selector).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregated results of a full run, in target order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunOutcome {
    /// True when any target failed. Partial-confidence records do not
    /// count as failure; only failed targets do.
    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(TargetOutcome::failed)
    }

    pub fn total_records(&self) -> usize {
        self.outcomes.iter().map(|o| o.records.len()).sum()
    }

    pub fn records(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.outcomes.iter().flat_map(|o| o.records.iter())
    }
}

/// Drives a run over many targets. Generic over the fetch and
/// extraction capabilities so tests can run entirely on mocks.
pub struct Orchestrator<F, X> {
    fetcher: F,
    engine: ExtractionEngine<X>,
    config: RunConfig,
    cancel: CancellationToken,
}

impl<F: Fetcher, X: FieldExtractor> Orchestrator<F, X> {
    pub fn new(fetcher: F, extractor: X) -> Self {
        let config = RunConfig::default();
        Self {
            fetcher,
            engine: ExtractionEngine::new(extractor).with_config(config.engine.clone()),
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.engine = self.engine.with_config(config.engine.clone());
        self.config = config;
        self
    }

    /// Token to cancel an in-flight run; unstarted targets are marked
    /// cancelled, in-flight ones finish or abort at the next await.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every target and aggregate outcomes in target order.
    pub async fn run(&self, targets: &[TargetConfig]) -> RunOutcome {
        info!(
            targets = targets.len(),
            concurrency = self.config.concurrency,
            "run starting"
        );

        let outcomes: Vec<TargetOutcome> = stream::iter(targets)
            .map(|target| self.process_target(target))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let outcome = RunOutcome { outcomes };
        info!(
            records = outcome.total_records(),
            failed = outcome.outcomes.iter().filter(|o| o.failed()).count(),
            "run complete"
        );
        outcome
    }

    async fn process_target(&self, target: &TargetConfig) -> TargetOutcome {
        if self.cancel.is_cancelled() {
            return TargetOutcome {
                target: target.name.clone(),
                url: target.url.clone(),
                records: Vec::new(),
                error: Some("run cancelled".to_string()),
            };
        }

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err("run cancelled".to_string()),
            result = self.fetch_and_extract(target) => result,
        };

        match result {
            Ok(records) => {
                info!(target = %target.name, records = records.len(), "target complete");
                TargetOutcome {
                    target: target.name.clone(),
                    url: target.url.clone(),
                    records,
                    error: None,
                }
            }
            Err(error) => {
                warn!(target = %target.name, %error, "target failed");
                TargetOutcome {
                    target: target.name.clone(),
                    url: target.url.clone(),
                    records: Vec::new(),
                    error: Some(error),
                }
            }
        }
    }

    async fn fetch_and_extract(
        &self,
        target: &TargetConfig,
    ) -> std::result::Result<Vec<ExtractedRecord>, String> {
        let page = self
            .fetcher
            .fetch(&target.url)
            .await
            .map_err(|e| e.to_string())?;

        self.engine
            .extract(target, &page)
            .await
            .map_err(|e| e.to_string())
    }
}

impl<X: FieldExtractor> Orchestrator<RetryingFetcher<RateLimitedFetcher<HttpFetcher>>, X> {
    /// Production stack: HTTP fetch behind per-host rate limiting and
    /// retry with exponential backoff, all driven by `config`.
    pub fn with_http(extractor: X, config: RunConfig) -> Self {
        let fetcher = RetryingFetcher::new(
            HttpFetcher::new().rate_limited(config.requests_per_second),
            config.max_fetch_attempts,
            Duration::from_millis(config.backoff_ms),
        );
        Self::new(fetcher, extractor).with_config(config)
    }
}
