use anyhow::Result;
use clap::{Parser, Subcommand};
use covid_etl::{config::PipelineConfig, pipeline::Pipeline};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "COVID data ETL: ingest, inject defects, clean, enrich")]
struct Cli {
    /// YAML file overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root for the store, CSV exports and audit reports.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Seed for defect injection.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Fetch the COVID series into the store.
    Ingest,
    /// Inject defects into the stored series, then clean it.
    Clean,
    /// Join the external sources onto the cleaned table.
    Enrich,
    /// Every stage in order.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) config ───────────────────────────────────────────────────
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        config.paths.output_dir = dir;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    info!(command = ?cli.command, output_dir = %config.paths.output_dir.display(), seed = config.seed, "startup");

    // ─── 3) run ──────────────────────────────────────────────────────
    let pipeline = Pipeline::new(config)?;
    let result = match cli.command {
        Command::Ingest => pipeline.ingest().await,
        Command::Clean => pipeline.clean().await,
        Command::Enrich => pipeline.enrich().await,
        Command::Run => pipeline.run().await,
    };

    match result {
        Ok(table) => {
            info!(rows = table.num_rows(), columns = table.num_columns(), "done");
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "pipeline failed");
            Err(e)
        }
    }
}
