//! Output formatting for stored records.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

use csv::WriterBuilder;
use std::fs::{self, OpenOptions};

/// Logs a record using Rust's debug pretty-print format.
pub fn print_pretty(record: &impl Debug) {
    debug!("{:#?}", record);
}

/// Logs a record as pretty-printed JSON.
pub fn print_json(record: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Appends records as rows to a CSV file.
///
/// Creates the file if needed; headers are written while it is still empty.
pub fn append_records<T: Serialize>(path: &str, records: &[T]) -> Result<()> {
    let has_rows = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    debug!(path, has_rows, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!has_rows) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}
