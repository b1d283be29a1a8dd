//! Data models shared by the ingestion and generation runs.
//!
//! - [`Record`]: one normalized news item, persisted in the record store
//! - [`GeneratedDocument`]: the article produced by a generation run
//! - [`ManifestEntry`]: one line of the `posts.json` summary
//!
//! Field names match the JSON written to `data/news.json` and `posts.json`,
//! which the static site reads directly.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single syndicated news item after decoding.
///
/// Records are created by the feed decoder and never mutated afterwards.
/// The store keys them by `url`, falling back to `title` when `url` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Record {
    /// Stable identifier derived from `url` (or `title`), see [`record_id`].
    pub id: String,
    /// Headline with entities decoded.
    pub title: String,
    /// Plain-text summary, markup stripped.
    pub summary: String,
    /// Category tag of the feed the item came from.
    pub category: String,
    /// Language tag of the feed the item came from (e.g. `"JP"`, `"EN"`).
    pub lang: String,
    /// Publication date as `YYYY-MM-DD`.
    pub date: String,
    /// Host name of the link, without a leading `www.`.
    pub source: String,
    /// Canonical link with the query string removed.
    pub url: String,
}

impl Record {
    /// Key used for deduplication: the url, or the title when there is no url.
    pub fn merge_key(&self) -> &str {
        if self.url.is_empty() {
            &self.title
        } else {
            &self.url
        }
    }
}

/// Derive a record id from its url (or title when the url is empty).
///
/// The id is `"n-"` followed by the first 12 hex digits of the SHA-256 of
/// the key, so the same link always maps to the same id across runs.
pub fn record_id(url: &str, title: &str) -> String {
    let key = if url.is_empty() { title } else { url };
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("n-{}", &hex[..12])
}

/// A fully assembled article, ready to be rendered into the HTML shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub title: String,
    pub description: String,
    /// Publication date as `YYYY-MM-DD`.
    pub date: String,
    /// File name without the `.html` extension.
    pub slug: String,
    pub keywords: Vec<String>,
    /// Up to five most recent records; empty when the corpus is empty.
    pub highlights: Vec<Record>,
    /// HTML fragment: enrichment output or the fallback template.
    pub body: String,
}

/// One entry of the generated-posts manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManifestEntry {
    /// File name including the `.html` extension.
    pub slug: String,
    pub title: String,
    pub description: String,
    /// File modification date as `YYYY-MM-DD`.
    pub date: String,
    /// Site-relative path, `post/<file>`.
    pub url: String,
}
