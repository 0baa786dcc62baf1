use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wellflow_bucket::S3BucketStore;
use wellflow_core::{BronzeSteps, PipelinesConfig};

mod sink;
mod source;

use sink::{BucketSink, LocalDiskSink, RemoteSettings, TableSink};
use source::{LocalCsvSource, TableSource};

const LOCAL_OUTPUT_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(author, version, about = "Bronze/silver pipelines for well-record extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bronze and silver pipelines over one extract
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// CSV extract to ingest
    #[arg(long)]
    input_filename: PathBuf,
    /// Name of the persisted table
    #[arg(long, default_value = "wells.csv")]
    output_filename: String,
    /// Write the silver table under data/ instead of uploading both tiers
    #[arg(long)]
    output_local: bool,
    /// TOML file with bronze and silver pipeline definitions
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let config = match &args.config {
        Some(path) => PipelinesConfig::load(path)
            .with_context(|| format!("failed to load pipeline config {}", path.display()))?,
        None => PipelinesConfig::default(),
    };

    let (raw, provenance) = LocalCsvSource::new(&args.input_filename).load()?;
    info!(
        source = %provenance.source_uri,
        rows = raw.height(),
        columns = raw.width(),
        "loaded raw extract"
    );

    let bronze = config
        .bronze
        .build_with::<BronzeSteps>(|options| provenance.apply_to(options))
        .context("invalid bronze pipeline")?
        .run(&raw)
        .context("bronze pipeline failed")?;

    let silver = config
        .silver_pipeline()
        .context("invalid silver pipeline")?
        .run(&bronze)
        .context("silver pipeline failed")?;

    if args.output_local {
        LocalDiskSink::new(LOCAL_OUTPUT_DIR)
            .persist(&silver, &args.output_filename)
            .await?;
    } else {
        let settings = RemoteSettings::from_env()?;
        let bronze_sink = BucketSink::new(
            S3BucketStore::new(settings.bronze())
                .await
                .context("failed to build bronze bucket store")?,
        );
        let silver_sink = BucketSink::new(
            S3BucketStore::new(settings.silver())
                .await
                .context("failed to build silver bucket store")?,
        );
        bronze_sink.persist(&bronze, &args.output_filename).await?;
        silver_sink.persist(&silver, &args.output_filename).await?;
    }

    info!(
        bronze_rows = bronze.height(),
        silver_rows = silver.height(),
        "run complete"
    );
    Ok(())
}
