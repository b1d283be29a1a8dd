//! Persisted record store: load, merge, save.
//!
//! The store is a JSON array of [`Record`]s sorted newest first. [`merge`]
//! is insert-if-absent, so re-ingesting identical feed output leaves the
//! store unchanged.

use crate::models::Record;
use crate::utils::{read_json_or_default, write_json_atomic};
use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Default upper bound on stored records.
pub const DEFAULT_MAX_RECORDS: usize = 200;

/// File-backed repository for the record corpus.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    max_records: usize,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records,
        }
    }

    /// Read the persisted corpus.
    ///
    /// # Returns
    ///
    /// The stored records, newest first. A missing or malformed file yields
    /// an empty list so the next save replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read (for example
    /// a permission problem or a directory in its place).
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<Record>, Box<dyn Error>> {
        let records: Vec<Record> = read_json_or_default(&self.path).await?;
        info!(count = records.len(), "Loaded record store");
        Ok(records)
    }

    /// Merge `incoming` into `current` using this store's size bound.
    pub fn merge(&self, current: Vec<Record>, incoming: Vec<Record>) -> Vec<Record> {
        merge(current, incoming, self.max_records)
    }

    /// Replace the persisted corpus in a single atomic rename.
    ///
    /// # Arguments
    ///
    /// * `records` - The complete corpus, already merged and bounded
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// temporary file cannot be written or renamed. The previous store stays
    /// intact in that case.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = records.len()))]
    pub async fn save(&self, records: &[Record]) -> Result<(), Box<dyn Error>> {
        write_json_atomic(&self.path, records).await?;
        info!("Saved record store");
        Ok(())
    }
}

/// Merge incoming records into the current corpus.
///
/// Each record is keyed by its `url`, or by its `title` when the url is
/// empty. Existing entries always win: an incoming record is dropped when its
/// url, or its title, is already a key. The result is sorted by date
/// descending (ISO dates compare lexicographically) and truncated to
/// `max_records`, dropping the oldest entries.
pub fn merge(current: Vec<Record>, incoming: Vec<Record>, max_records: usize) -> Vec<Record> {
    let mut keys: HashSet<String> = current.iter().map(|r| r.merge_key().to_string()).collect();
    let mut merged = current;
    let mut added = 0usize;

    for record in incoming {
        let url_seen = !record.url.is_empty() && keys.contains(&record.url);
        if url_seen || keys.contains(&record.title) {
            continue;
        }
        keys.insert(record.merge_key().to_string());
        merged.push(record);
        added += 1;
    }

    merged.sort_by(|a, b| b.date.cmp(&a.date));
    let dropped = merged.len().saturating_sub(max_records);
    merged.truncate(max_records);
    info!(added, dropped, total = merged.len(), "Merged records");
    merged
}
