//! History of records already used as generation sources.
//!
//! Stored as a JSON array of strings (urls and titles). The set only grows
//! during a run; the article assembler saves it after each document.

use crate::models::Record;
use crate::utils::{read_json_or_default, write_json_atomic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// In-memory history set. Preserves insertion order for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct HistorySet {
    entries: Vec<String>,
    index: HashSet<String>,
}

impl HistorySet {
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Add `key`; returns `false` if it was already present or empty.
    pub fn insert(&mut self, key: &str) -> bool {
        if key.is_empty() || !self.index.insert(key.to_string()) {
            return false;
        }
        self.entries.push(key.to_string());
        true
    }

    /// Mark a record as used by adding both its url and title.
    pub fn mark_used(&mut self, record: &Record) {
        let url_added = self.insert(&record.url);
        let title_added = self.insert(&record.title);
        debug!(url_added, title_added, url = %record.url, "Marked record as used");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for HistorySet {
    fn from(raw: Vec<String>) -> Self {
        let mut set = HistorySet::default();
        for key in raw {
            set.insert(&key);
        }
        set
    }
}

impl From<HistorySet> for Vec<String> {
    fn from(set: HistorySet) -> Self {
        set.entries
    }
}

/// File-backed repository for the [`HistorySet`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted history.
    ///
    /// # Returns
    ///
    /// The set of urls and titles already used. A missing or malformed file
    /// yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read.
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<HistorySet, Box<dyn Error>> {
        let history: HistorySet = read_json_or_default(&self.path).await?;
        if history.is_empty() {
            debug!("No generation history yet");
        }
        info!(count = history.len(), "Loaded history");
        Ok(history)
    }

    /// Persist `history` as a JSON array, replacing the file atomically.
    ///
    /// # Arguments
    ///
    /// * `history` - The full set, including entries added during this run
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written; the generate run
    /// treats this as fatal.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = history.len()))]
    pub async fn save(&self, history: &HistorySet) -> Result<(), Box<dyn Error>> {
        write_json_atomic(&self.path, &history.entries).await?;
        info!("Saved history");
        Ok(())
    }
}
