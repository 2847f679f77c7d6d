//! Output formatting and persistence for paths, vehicles and poll statistics.
//!
//! Supports JSON to stdout or a file (optionally gzip-compressed) and CSV append.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::debug;

use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serializes `value` as pretty JSON to `path`, or to stdout when `path` is `None`.
///
/// With `gzip` the bytes are gzip-compressed; stdout output is never compressed.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T, gzip: bool) -> Result<()> {
    match path {
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let writer = BufWriter::new(file);
            if gzip {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                serde_json::to_writer(&mut encoder, value)?;
                encoder.finish()?.flush()?;
            } else {
                let mut writer = writer;
                serde_json::to_writer_pretty(&mut writer, value)?;
                writer.flush()?;
            }
            debug!(path = %path.display(), gzip, "JSON written");
        }
    }
    Ok(())
}

/// Appends serializable rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = rows.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
