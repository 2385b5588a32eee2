use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use ooo_core::cache::RunIdentity;
use ooo_core::config::OrchestratorConfig;
use ooo_core::{Orchestrator, TimeRange};

#[derive(Parser)]
#[command(
    name = "ooo",
    about = "Summarize what happened across your sources while you were out",
    version
)]
struct Cli {
    /// Start of the OOO period (YYYY-MM-DD)
    start_date: Option<String>,

    /// End of the OOO period (YYYY-MM-DD)
    end_date: Option<String>,

    /// Scenario identifier for the report cache; omit to skip caching
    #[arg(long)]
    scenario: Option<String>,

    /// Cache key version suffix
    #[arg(long, default_value = "v1")]
    cache_version: String,

    /// Path to the YAML config (defaults apply when the file is absent)
    #[arg(long, default_value = "ooo.yaml")]
    config: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let range = match (&cli.start_date, &cli.end_date) {
        (Some(start), Some(end)) => TimeRange::parse(start, end)?,
        (None, None) => TimeRange::parse("2024-01-01", "2024-01-03")?,
        _ => anyhow::bail!("usage: ooo <start_date> <end_date> (e.g. ooo 2024-02-01 2024-02-14)"),
    };

    let identity = cli.scenario.as_ref().map(|scenario| {
        RunIdentity::new(scenario)
            .with_version(&cli.cache_version)
            .with_time_range(range)
    });

    let config = OrchestratorConfig::load(&cli.config).context("failed to load config")?;
    let orchestrator = Orchestrator::new(config).context("failed to construct orchestrator")?;

    let rt = tokio::runtime::Runtime::new().context("tokio runtime")?;
    let report = rt
        .block_on(orchestrator.generate_report(range, identity))
        .context("report generation failed")?;

    // The report JSON is the only stdout payload; everything diagnostic goes
    // through tracing to stderr.
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
