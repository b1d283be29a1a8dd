//! Choice of the record an article is written about.

use crate::history::HistorySet;
use crate::models::Record;
use tracing::{debug, info};

/// Pick the next source record, preferring material not used before.
///
/// In store order (newest first): the first record whose url is not in
/// history, else the first whose title is not in history, else the first
/// record. Returns `None` only for an empty store.
pub fn select<'a>(records: &'a [Record], history: &HistorySet) -> Option<&'a Record> {
    if let Some(record) = records.iter().find(|r| !history.contains(&r.url)) {
        info!(url = %record.url, "Selected record with unused url");
        return Some(record);
    }
    if let Some(record) = records.iter().find(|r| !history.contains(&r.title)) {
        info!(title = %record.title, "Selected record with unused title");
        return Some(record);
    }
    let first = records.first();
    debug!(reused = first.is_some(), "Every record already used; reusing newest");
    first
}
