use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::info;

use whois_chain::{
    batch::{resolve_all, resolve_all_from, BatchOutcome},
    report::ReportWriter,
    Config, FieldExtractor, WhoisResolver,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

/// Follow whois referrals for each domain and report every hop
#[derive(Debug, Parser)]
#[command(name = "whois-chain", version, about)]
struct Cli {
    /// Domains to resolve (unicode names are IDNA-encoded)
    #[arg(required = true)]
    domains: Vec<String>,

    /// Start at this whois server instead of the exception table / IANA root
    #[arg(long)]
    server: Option<String>,

    /// Keep full thin-registry responses in the chain
    #[arg(long)]
    never_cut: bool,

    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Domains resolved concurrently (defaults to configuration)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so the report can be piped
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "whois_chain=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("loading configuration")?;
    if cli.never_cut {
        config.never_cut = true;
    }
    info!("Configuration loaded successfully");

    let resolver = WhoisResolver::from_config(&config);
    let concurrency = cli.concurrency.unwrap_or(config.concurrent_whois_queries);

    let outcomes = match &cli.server {
        Some(server) => resolve_all_from(&resolver, cli.domains.clone(), server, concurrency).await,
        None => resolve_all(&resolver, cli.domains.clone(), concurrency).await,
    };

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };

    match cli.format {
        OutputFormat::Csv => write_csv(sink, &outcomes)?,
        OutputFormat::Json => write_json(sink, &outcomes)?,
    }

    // Failures were logged as they happened
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        info!("{} of {} domains failed", failed, outcomes.len());
        Ok(ExitCode::FAILURE)
    }
}

fn write_csv(sink: Box<dyn Write>, outcomes: &[BatchOutcome]) -> anyhow::Result<()> {
    let mut writer = ReportWriter::new(sink)?;
    for outcome in outcomes {
        if let Ok(resolution) = &outcome.result {
            writer.write_resolution(&outcome.domain, resolution)?;
        }
    }
    writer.finish()?;
    Ok(())
}

fn write_json(mut sink: Box<dyn Write>, outcomes: &[BatchOutcome]) -> anyhow::Result<()> {
    let extractor = FieldExtractor::new();
    let entries: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(resolution) => serde_json::json!({
                "domain": outcome.domain,
                "servers": resolution.servers,
                "hops": resolution
                    .steps_in_hop_order()
                    .map(|step| serde_json::json!({
                        "server": step.server,
                        "record": extractor.extract(step.record_text()),
                        "raw": step.response,
                    }))
                    .collect::<Vec<_>>(),
            }),
            Err(e) => serde_json::json!({
                "domain": outcome.domain,
                "error": e.to_string(),
            }),
        })
        .collect();

    serde_json::to_writer_pretty(&mut sink, &entries)?;
    writeln!(sink)?;
    Ok(())
}
