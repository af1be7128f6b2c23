use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use salesflow_bucket::{S3BucketStore, S3Config};
use salesflow_core::{pipeline, Reporter, StorageLayout, TableStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Reads tickets, items and clients from the bronze tier, writes sales tables to silver.
#[derive(Parser, Debug)]
#[command(author, version, about = "Sales data lake ETL (bronze -> silver)", long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .init();

    let _cli = Cli::parse();
    dotenvy::dotenv().ok();

    let layout = StorageLayout::default();
    let bucket = S3BucketStore::new(S3Config::from_env(layout.bucket.clone()))
        .await
        .context("failed to configure S3 client")?;
    let store = TableStore::new(Arc::new(bucket), layout);

    // Unlocked: the lock would be held across every await of the run.
    let mut reporter = Reporter::new(io::stdout());
    let summary = pipeline::run(&store, &mut reporter)
        .await
        .context("ETL run failed")?;

    let summary_json =
        serde_json::to_string(&summary).context("failed to serialize run summary")?;
    info!(summary = %summary_json, "ETL run complete");
    let layout = store.layout();
    reporter.line(&format!(
        "\nProceso ETL completado. Los resultados han sido guardados en s3://{}/{}",
        layout.bucket, layout.silver_prefix
    ));

    Ok(())
}
