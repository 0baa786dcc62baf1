//! Byte encoding for persisted tables.

use std::io::Cursor;

use polars::prelude::*;

use crate::error::Result;

pub const FIELD_SEPARATOR: u8 = b'|';
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encodes a table as UTF-8 delimited text: `|` separated, header row, no
/// index column, dates as `%Y-%m-%d`.
pub fn create_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        CsvWriter::new(&mut cursor)
            .include_header(true)
            .with_separator(FIELD_SEPARATOR)
            .with_date_format(Some(DATE_FORMAT.into()))
            .finish(&mut clone)?;
    }
    Ok(buffer)
}
