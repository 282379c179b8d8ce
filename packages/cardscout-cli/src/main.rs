//! Command-line front end for cardscout.
//!
//! `run` scrapes one target, `batch` scrapes every configured target,
//! `analyze` probes site structure without extracting. Exit status is
//! non-zero when any target fails outright; partial-confidence records
//! are a success.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cardscout::{
    builtin_operator, builtin_operators, load_targets, recommendations, ChatCompletionExtractor,
    FetcherExt, HttpFetcher, Orchestrator, RetryingFetcher, RunConfig, RunOutcome, SiteAnalyzer,
    TargetConfig,
};

#[derive(Parser)]
#[command(name = "cardscout")]
#[command(version, about = "Extract structured records from listing-page cards")]
struct Cli {
    /// Suppress per-target output; only warnings and errors are logged
    #[arg(long, global = true)]
    silent: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a single target
    Run {
        /// Built-in operator name (telia, telenor, ice, mycall)
        #[arg(long, conflicts_with = "url")]
        operator: Option<String>,

        /// Ad-hoc target: a name for grouping plus the page URL
        #[arg(long, num_args = 2, value_names = ["NAME", "URL"])]
        url: Option<Vec<String>>,

        /// Card container selector override
        #[arg(long)]
        selector: Option<String>,

        /// Output file for grouped records
        #[arg(long, short, default_value = "records.json")]
        output: PathBuf,
    },

    /// Scrape every built-in operator, or the targets from a config file
    Batch {
        /// JSON config file with a "targets" array
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file for grouped records
        #[arg(long, short, default_value = "records.json")]
        output: PathBuf,
    },

    /// Analyze site structure without extracting records
    Analyze {
        /// JSON config file with a "targets" array
        #[arg(long)]
        config: Option<PathBuf>,

        /// Limit analysis to one built-in operator
        #[arg(long, conflicts_with = "config")]
        operator: Option<String>,

        /// Output file for the analysis report
        #[arg(long, short, default_value = "analysis_report.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.silent);

    match cli.command {
        Commands::Run {
            operator,
            url,
            selector,
            output,
        } => {
            let mut target = resolve_single_target(operator.as_deref(), url.as_deref())?;
            if let Some(selector) = selector {
                target = target.with_selector(selector);
            }
            run_targets(&[target], &output, cli.silent).await
        }
        Commands::Batch { config, output } => {
            let targets = resolve_targets(config.as_deref())?;
            run_targets(&targets, &output, cli.silent).await
        }
        Commands::Analyze {
            config,
            operator,
            output,
        } => {
            let targets = match operator {
                Some(name) => vec![builtin_operator(&name)?],
                None => resolve_targets(config.as_deref())?,
            };
            analyze_targets(&targets, &output, cli.silent).await
        }
    }
}

fn init_logging(silent: bool) {
    let default_directive = if silent { "warn" } else { "cardscout=info,warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_single_target(operator: Option<&str>, url: Option<&[String]>) -> Result<TargetConfig> {
    match (operator, url) {
        (Some(name), None) => Ok(builtin_operator(name)?),
        (None, Some(pair)) => match pair {
            [name, url] => Ok(TargetConfig::new(name, url)),
            _ => bail!("--url takes exactly NAME and URL"),
        },
        _ => bail!("run needs either --operator or --url NAME URL"),
    }
}

fn resolve_targets(config: Option<&std::path::Path>) -> Result<Vec<TargetConfig>> {
    match config {
        Some(path) => {
            let targets = load_targets(path)
                .with_context(|| format!("failed to load targets from {}", path.display()))?;
            if targets.is_empty() {
                bail!("config file {} contains no targets", path.display());
            }
            Ok(targets)
        }
        None => Ok(builtin_operators()),
    }
}

async fn run_targets(targets: &[TargetConfig], output: &PathBuf, silent: bool) -> Result<()> {
    let extractor = ChatCompletionExtractor::from_env()
        .context("set DEEPSEEK_API_KEY (or put it in .env) to run extraction")?;

    let orchestrator = Orchestrator::with_http(extractor, RunConfig::default());
    let outcome = orchestrator.run(targets).await;

    cardscout::write_records(output, &outcome)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !silent {
        print_run_summary(&outcome, output);
    }

    if outcome.any_failed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn analyze_targets(targets: &[TargetConfig], output: &PathBuf, silent: bool) -> Result<()> {
    let config = RunConfig::default();
    let fetcher = RetryingFetcher::new(
        HttpFetcher::new().rate_limited(config.requests_per_second),
        config.max_fetch_attempts,
        std::time::Duration::from_millis(config.backoff_ms),
    );

    let analyzer = SiteAnalyzer::new(fetcher).with_concurrency(config.concurrency);
    let report = analyzer.analyze(targets).await;

    cardscout::write_report(output, &report)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if !silent {
        print_analysis_summary(&report, output);
    }

    if report.sites_succeeded() < report.sites_analyzed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_run_summary(outcome: &RunOutcome, output: &PathBuf) {
    println!();
    for target in &outcome.outcomes {
        match &target.error {
            Some(error) => println!("  {:<12} FAILED: {}", target.target, error),
            None => {
                let full = target.records.iter().filter(|r| r.is_full()).count();
                println!(
                    "  {:<12} {} records ({} full, {} partial)",
                    target.target,
                    target.records.len(),
                    full,
                    target.records.len() - full
                );
            }
        }
    }
    println!();
    println!(
        "{} records from {} targets -> {}",
        outcome.total_records(),
        outcome.outcomes.len(),
        output.display()
    );
}

fn print_analysis_summary(report: &cardscout::AnalysisReport, output: &PathBuf) {
    println!();
    for site in &report.per_site {
        match &site.error {
            Some(error) => println!("  {:<12} FAILED: {}", site.name, error),
            None => {
                let hazards: Vec<String> = site.hazards.iter().map(|h| h.to_string()).collect();
                println!(
                    "  {:<12} {} candidate selectors{}",
                    site.name,
                    site.candidate_selectors.len(),
                    if hazards.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", hazards.join(", "))
                    }
                );
            }
        }
    }

    let hints = recommendations(report);
    if !hints.is_empty() {
        println!();
        println!("Recommendations:");
        for hint in hints {
            println!("  - {hint}");
        }
    }

    println!();
    println!(
        "{}/{} sites analyzed -> {}",
        report.sites_succeeded(),
        report.sites_analyzed(),
        output.display()
    );
}
