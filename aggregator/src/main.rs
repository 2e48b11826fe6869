use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ultra_router::config::AppConfig;
use ultra_router::metrics;
use ultra_router::scenario::Scenario;

/// Replays route calls from a scenario file and prints one JSON line per call.
#[derive(Debug, Parser)]
#[command(name = "route-replay", version)]
struct Cli {
    /// YAML scenario describing balances, venues and route calls
    #[arg(long)]
    scenario: PathBuf,
    /// Engine config file; ROUTER__* environment variables apply on top
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print prometheus metrics to stderr after the replay
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let app = match &cli.config {
        Some(path) => Some(
            AppConfig::load(Some(path))
                .with_context(|| format!("load configuration from {}", path.display()))?,
        ),
        None => None,
    };
    init_tracing(app.as_ref().and_then(|a| a.log_filter.as_deref()))
        .context("initialize tracing subscriber")?;

    if let Err(err) = run(&cli, app) {
        tracing::error!(error = ?err, "fatal replay error");
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli, app: Option<AppConfig>) -> Result<()> {
    let scenario = Scenario::load(&cli.scenario)?;
    let engine = app.map(|a| a.engine);
    if engine.is_none() {
        info!("no config file given; using the scenario's engine settings");
    }

    let outcomes = scenario.run(engine)?;
    let failed = outcomes.iter().filter(|o| !o.ok).count();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for outcome in &outcomes {
        serde_json::to_writer(&mut out, outcome).context("serialize outcome")?;
        writeln!(out)?;
    }
    out.flush()?;

    if failed > 0 {
        warn!(failed, total = outcomes.len(), "some routes failed");
    } else {
        info!(total = outcomes.len(), "all routes succeeded");
    }

    if cli.metrics {
        let text = metrics::render().map_err(|err| anyhow!("render metrics: {err}"))?;
        eprint!("{text}");
    }
    Ok(())
}

fn init_tracing(configured: Option<&str>) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
