//! Raw extracts read from local disk.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use wellflow_core::Provenance;

/// Something that can produce the raw table for one run.
pub trait TableSource {
    fn load(&self) -> Result<(DataFrame, Provenance)>;
}

/// A header-first CSV file. Every column is read as text and empty cells stay
/// empty strings; typing happens in the silver tier.
#[derive(Debug, Clone)]
pub struct LocalCsvSource {
    path: PathBuf,
}

impl LocalCsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn provenance(&self) -> Result<Provenance> {
        let absolute = fs::canonicalize(&self.path)
            .with_context(|| format!("failed to resolve {}", self.path.display()))?;
        let metadata = fs::metadata(&absolute)
            .with_context(|| format!("failed to stat {}", absolute.display()))?;

        let source_filename = absolute
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| absolute.display().to_string());

        Ok(Provenance {
            source_filename,
            source_uri: file_uri(&absolute),
            source_created_at: metadata.created().ok().map(to_utc),
            source_updated_at: metadata.modified().ok().map(to_utc),
        })
    }
}

impl TableSource for LocalCsvSource {
    fn load(&self) -> Result<(DataFrame, Provenance)> {
        let content = fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let parse_options = CsvParseOptions::default().with_missing_is_null(false);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_options)
            .into_reader_with_file_handle(Cursor::new(content))
            .finish()
            .with_context(|| format!("failed to parse {} as CSV", self.path.display()))?;

        Ok((df, self.provenance()?))
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
