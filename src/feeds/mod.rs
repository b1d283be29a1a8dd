//! Feed retrieval and decoding for the ingestion run.
//!
//! # Submodules
//!
//! - [`decoder`]: turns one raw RSS document into [`Record`]s
//!
//! [`fetch_all`] fetches every configured source concurrently and reduces the
//! decoded records into one batch. A source that fails (network error,
//! non-success status, missing URL) is logged and skipped; it never aborts
//! its siblings.

pub mod decoder;

use crate::api::FetchAsync;
use crate::config::FeedSource;
use crate::models::Record;
use decoder::FeedDecoder;
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

/// Fetch and decode every feed, at most `concurrency` requests in flight.
///
/// The returned batch is complete only once every fetch has settled, so the
/// caller can merge it into the store in one step. Batches keep the order of
/// `feeds`, so when two sources carry the same article the earlier source
/// wins the merge regardless of which response arrived first.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len(), concurrency = concurrency))]
pub async fn fetch_all<F, D>(
    fetcher: &F,
    decoder: &D,
    feeds: &[FeedSource],
    concurrency: usize,
) -> Vec<Record>
where
    F: FetchAsync,
    D: FeedDecoder,
{
    let batches: Vec<Vec<Record>> = stream::iter(feeds.iter())
        .map(|feed| async move {
            let Some(url) = feed.resolved_url() else {
                warn!(category = %feed.category, "Feed has neither url nor query; skipping");
                return Vec::new();
            };
            match fetcher.fetch(&url).await {
                Ok(raw) => {
                    let records = decoder.decode(&raw, &feed.lang, &feed.category);
                    info!(%url, count = records.len(), "Decoded feed");
                    records
                }
                Err(e) => {
                    error!(%url, error = %e, "Feed fetch failed; skipping source");
                    Vec::new()
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let records: Vec<Record> = batches.into_iter().flatten().collect();
    info!(count = records.len(), "Fetched all feeds");
    records
}
