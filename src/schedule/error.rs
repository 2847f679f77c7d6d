//! Static schedule loading errors.

use crate::fetch::FetchRetryError;

/// Errors that abort loading a single feed.
///
/// Individual malformed rows never surface here; they are skipped and
/// counted while parsing.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A mandatory table is absent from the archive.
    #[error("missing {0} in GTFS archive")]
    MissingTable(&'static str),

    /// A table exists but lacks a key column.
    #[error("{table} is missing column {column}")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive decompresses to {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to download {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchRetryError,
    },
}
