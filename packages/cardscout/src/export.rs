//! JSON export of run results and analysis reports.
//!
//! Exports carry a metadata block with counts and a generation
//! timestamp; the in-memory results stay untouched, so a failed write
//! never invalidates what the run produced.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::analyze::recommendations;
use crate::error::Result;
use crate::orchestrator::RunOutcome;
use crate::types::record::{Confidence, ExtractedRecord};
use crate::types::report::AnalysisReport;

/// Counts and provenance for an export file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub sources: usize,
    pub full_records: usize,
    pub partial_records: usize,
}

/// One target's slice of an export, grouped under the target name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordGroup {
    pub url: String,
    pub count: usize,
    pub records: Vec<ExtractedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializable view of a run: metadata plus records grouped by target,
/// in target order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordsExport {
    pub metadata: ExportMetadata,
    pub groups: IndexMap<String, RecordGroup>,
}

impl RecordsExport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let mut groups = IndexMap::new();
        for target in &outcome.outcomes {
            groups.insert(
                target.target.clone(),
                RecordGroup {
                    url: target.url.clone(),
                    count: target.records.len(),
                    records: target.records.clone(),
                    error: target.error.clone(),
                },
            );
        }

        let full_records = outcome
            .records()
            .filter(|r| r.confidence == Confidence::Full)
            .count();

        Self {
            metadata: ExportMetadata {
                generated_at: Utc::now(),
                total_records: outcome.total_records(),
                sources: outcome.outcomes.len(),
                full_records,
                partial_records: outcome.total_records() - full_records,
            },
            groups,
        }
    }
}

/// Write run results as grouped JSON.
pub fn write_records(path: impl AsRef<Path>, outcome: &RunOutcome) -> Result<()> {
    let path = path.as_ref();
    let export = RecordsExport::from_outcome(outcome);
    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), records = export.metadata.total_records, "records exported");
    Ok(())
}

/// Read a previously exported records file.
pub fn read_records(path: impl AsRef<Path>) -> Result<RecordsExport> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serializable view of an analysis run: the report plus derived
/// recommendations and a generation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportExport {
    pub generated_at: DateTime<Utc>,
    pub report: AnalysisReport,
    pub recommendations: Vec<String>,
}

impl ReportExport {
    pub fn from_report(report: AnalysisReport) -> Self {
        Self {
            generated_at: Utc::now(),
            recommendations: recommendations(&report),
            report,
        }
    }
}

/// Write an analysis report with recommendations attached.
pub fn write_report(path: impl AsRef<Path>, report: &AnalysisReport) -> Result<()> {
    let path = path.as_ref();
    let export = ReportExport::from_report(report.clone());
    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), sites = report.sites_analyzed(), "report exported");
    Ok(())
}

/// Read a previously exported report file.
pub fn read_report(path: impl AsRef<Path>) -> Result<ReportExport> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&raw)?)
}
