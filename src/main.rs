use anyhow::{Context, Result};
use assembler::{AnalysisReport, ResearchPipeline};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{ResearchConfig, load_config, load_config_from};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the LAVA liquidity research tool.
fn main() -> Result<()> {
    // Optional .env with LAVA__* overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args),
        Commands::Summary(args) => handle_summary(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Liquidity sourcing and efficiency research for payment markets.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Also write logs to a daily rolling file in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the report as JSON.
    Analyze(AnalyzeArgs),
    /// Print per-market scores and the headline findings.
    Summary(SummaryArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Input document: an array of records, a `providers` list or a keyed object.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the report. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Configuration file. Defaults to `research.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Parser)]
struct SummaryArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,
}

// ==============================================================================
// Setup
// ==============================================================================

/// Logs to stderr, or to `<dir>/lava.log.<date>` when a directory is given.
/// The returned guard must be held until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lava.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<ResearchConfig> {
    let config = match path {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_config().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn run_pipeline(input: &Path, config: ResearchConfig) -> Result<AnalysisReport> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Input {} is not valid JSON", input.display()))?;

    let report = ResearchPipeline::new(config).run_document(&document, Utc::now())?;
    Ok(report)
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let report = run_pipeline(&args.input, config)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written.");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let report = run_pipeline(&args.input, config)?;

    let fmt = |value: Option<Decimal>| value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table.set_header(vec![
        "Market", "Region", "Type", "Score", "Grade", "Friction", "Onchain", "Hybrid",
    ]);
    for market in &report.efficiency_analysis.markets {
        let onchain = report
            .onchain_analysis
            .as_ref()
            .and_then(|o| o.market(&market.market_name));
        let friction: Vec<String> = market.friction.flags.iter().map(|f| f.to_string()).collect();
        table.add_row(vec![
            market.market_name.clone(),
            market.region.clone(),
            format!("{:?}", market.provider_type),
            market.composite_score.to_string(),
            market.grade.to_string(),
            friction.join(", "),
            fmt(onchain.map(|o| o.onchain_score)),
            fmt(onchain.and_then(|o| o.hybrid_score)),
        ]);
    }
    // Pure onchain providers have no efficiency score.
    for onchain in report.onchain_analysis.iter().flat_map(|o| &o.markets) {
        if report.efficiency_analysis.market(&onchain.market_name).is_none() {
            table.add_row(vec![
                onchain.market_name.clone(),
                "-".to_string(),
                format!("{:?}", onchain.provider_type),
                "-".to_string(),
                "-".to_string(),
                String::new(),
                onchain.onchain_score.to_string(),
                fmt(onchain.hybrid_score),
            ]);
        }
    }
    println!("{table}");

    println!("\nFindings:");
    for finding in &report.findings {
        println!("  - {finding}");
    }
    Ok(())
}
