//! Extraction of the GTFS tables from a feed's ZIP archive.

use std::io::{Cursor, Read};

use tracing::{debug, info};
use zip::ZipArchive;

use super::error::ScheduleError;

/// Refuse archives that would decompress past 2 GB.
const MAX_DECOMPRESSED_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Raw text of the tables the schedule is built from.
#[derive(Debug, Clone, Default)]
pub struct FeedTables {
    pub routes: String,
    pub trips: String,
    pub stops: String,
    pub stop_times: Option<String>,
    pub shapes: Option<String>,
}

impl FeedTables {
    /// Reads the tables out of an in-memory ZIP archive.
    ///
    /// Entries are matched by file name, so archives that wrap the tables in
    /// a top-level directory load too.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::MissingTable`] when `routes.txt`, `trips.txt` or
    /// `stops.txt` is absent. Missing `stop_times.txt` or `shapes.txt` is
    /// not an error.
    pub fn from_archive(bytes: &[u8]) -> Result<Self, ScheduleError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut total_uncompressed: u64 = 0;
        for i in 0..archive.len() {
            if let Ok(entry) = archive.by_index(i) {
                total_uncompressed += entry.size();
            }
        }
        if total_uncompressed > MAX_DECOMPRESSED_SIZE {
            return Err(ScheduleError::TooLarge {
                size: total_uncompressed,
                limit: MAX_DECOMPRESSED_SIZE,
            });
        }
        info!(
            entries = archive.len(),
            compressed_kb = bytes.len() / 1024,
            decompressed_kb = total_uncompressed / 1024,
            "Opened GTFS archive"
        );

        let tables = FeedTables {
            routes: read_table(&mut archive, "routes.txt")?
                .ok_or(ScheduleError::MissingTable("routes.txt"))?,
            trips: read_table(&mut archive, "trips.txt")?
                .ok_or(ScheduleError::MissingTable("trips.txt"))?,
            stops: read_table(&mut archive, "stops.txt")?
                .ok_or(ScheduleError::MissingTable("stops.txt"))?,
            stop_times: read_table(&mut archive, "stop_times.txt")?,
            shapes: read_table(&mut archive, "shapes.txt")?,
        };

        if tables.stop_times.is_none() {
            info!("No stop_times.txt in GTFS archive (optional file)");
        }
        if tables.shapes.is_none() {
            info!("No shapes.txt in GTFS archive (optional file)");
        }
        Ok(tables)
    }
}

fn read_table(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ScheduleError> {
    let entry_name = {
        let names: Vec<&str> = archive.file_names().collect();
        names
            .iter()
            .find(|n| **n == name)
            .or_else(|| names.iter().find(|n| n.rsplit('/').next() == Some(name)))
            .map(|n| n.to_string())
    };
    let Some(entry_name) = entry_name else {
        return Ok(None);
    };

    let mut file = archive.by_name(&entry_name)?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    debug!(entry = %entry_name, bytes = buf.len(), "Read archive entry");

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
