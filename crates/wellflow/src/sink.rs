//! Destinations for finished tables.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use polars::prelude::DataFrame;
use tracing::info;
use wellflow_bucket::{BucketStore, S3Config};
use wellflow_core::outputs::create_csv_bytes;

const CSV_CONTENT_TYPE: &str = "text/csv";

#[async_trait]
pub trait TableSink: Send + Sync {
    /// Persists `df` under `destination` and returns where it landed.
    async fn persist(&self, df: &DataFrame, destination: &str) -> Result<String>;
}

/// Writes into a directory on local disk, creating it if needed.
#[derive(Debug, Clone)]
pub struct LocalDiskSink {
    root: PathBuf,
}

impl LocalDiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TableSink for LocalDiskSink {
    async fn persist(&self, df: &DataFrame, destination: &str) -> Result<String> {
        let bytes = create_csv_bytes(df).context("failed to encode table")?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.root.join(destination);
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;

        let location = path.display().to_string();
        info!(location = %location, rows = df.height(), "table written to disk");
        Ok(location)
    }
}

pub struct BucketSink<S> {
    store: S,
}

impl<S: BucketStore> BucketSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: BucketStore> TableSink for BucketSink<S> {
    async fn persist(&self, df: &DataFrame, destination: &str) -> Result<String> {
        let bytes = Bytes::from(create_csv_bytes(df).context("failed to encode table")?);
        self.store
            .put_object(destination, bytes, CSV_CONTENT_TYPE)
            .await
            .with_context(|| format!("failed to upload {destination} to {}", self.store.bucket()))?;

        let location = format!("s3://{}/{destination}", self.store.bucket());
        info!(location = %location, rows = df.height(), "table uploaded");
        Ok(location)
    }
}

/// Connection settings shared by both buckets plus each tier's bucket name.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub connection: S3Config,
    pub bronze_bucket: String,
    pub silver_bucket: String,
}

impl RemoteSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = S3Config::default();
        let force_path_style = match lookup("WELLFLOW_S3_FORCE_PATH_STYLE") {
            Some(raw) => parse_flag(&raw).with_context(|| {
                format!("WELLFLOW_S3_FORCE_PATH_STYLE must be true or false, got '{raw}'")
            })?,
            None => defaults.force_path_style,
        };

        let connection = S3Config {
            bucket: String::new(),
            region: lookup("WELLFLOW_S3_REGION").unwrap_or(defaults.region),
            endpoint: lookup("WELLFLOW_S3_ENDPOINT"),
            access_key_id: lookup("WELLFLOW_S3_ACCESS_KEY_ID"),
            secret_access_key: lookup("WELLFLOW_S3_SECRET_ACCESS_KEY"),
            force_path_style,
        };

        Ok(Self {
            connection,
            bronze_bucket: lookup("WELLFLOW_S3_BUCKET_BRONZE")
                .unwrap_or_else(|| "wellflow-bronze".to_string()),
            silver_bucket: lookup("WELLFLOW_S3_BUCKET_SILVER")
                .unwrap_or_else(|| "wellflow-silver".to_string()),
        })
    }

    pub fn bronze(&self) -> S3Config {
        self.connection.for_bucket(self.bronze_bucket.as_str())
    }

    pub fn silver(&self) -> S3Config {
        self.connection.for_bucket(self.silver_bucket.as_str())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
