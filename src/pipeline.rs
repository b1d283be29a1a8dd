//! The three runs: ingest, generate, manifest.
//!
//! Recoverable problems (failed feeds, corrupt state, enrichment failures)
//! are logged inside the components. Errors returned from here are
//! persistence failures and end the process with a non-zero status.

use crate::api::FetchAsync;
use crate::config::Config;
use crate::enrichment::{EnrichmentRequest, Enricher};
use crate::feeds::{self, decoder::PatternDecoder};
use crate::history::HistoryStore;
use crate::keywords::{KeywordExtractor, corpus_text, page_text};
use crate::outputs::article::{ArticleAssembler, enrichment_context};
use crate::outputs::manifest;
use crate::selector::select;
use crate::store::RecordStore;
use chrono::NaiveDateTime;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Summary of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub stored: usize,
}

/// Fetch all feeds, then merge the complete batch into the store.
#[instrument(level = "info", skip_all)]
pub async fn ingest<F: FetchAsync>(config: &Config, fetcher: &F) -> Result<IngestReport, Box<dyn Error>> {
    let store = RecordStore::new(&config.news_path, config.max_records);
    let current = store.load().await?;

    let decoder = PatternDecoder::new();
    let incoming = feeds::fetch_all(fetcher, &decoder, &config.feeds, config.fetch.concurrency).await;
    let fetched = incoming.len();

    let merged = store.merge(current, incoming);
    store.save(&merged).await?;
    info!(fetched, stored = merged.len(), "news.json updated");

    Ok(IngestReport {
        fetched,
        stored: merged.len(),
    })
}

/// Keyword source text when the store is empty.
async fn fallback_text(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(html) => page_text(&html),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Fallback page unavailable; using fallback keywords only");
            String::new()
        }
    }
}

/// Generate one article at `now` and return the path written.
#[instrument(level = "info", skip_all, fields(now = %now))]
pub async fn generate<E: Enricher>(
    config: &Config,
    enricher: &E,
    now: NaiveDateTime,
) -> Result<PathBuf, Box<dyn Error>> {
    let store = RecordStore::new(&config.news_path, config.max_records);
    let history_store = HistoryStore::new(&config.history_path);
    let records = store.load().await?;
    let mut history = history_store.load().await?;

    let selected = select(&records, &history).cloned();

    let text = if records.is_empty() {
        fallback_text(&config.fallback_page).await
    } else {
        corpus_text(&records)
    };
    let keywords = KeywordExtractor::default().extract(&text);
    info!(keywords = ?keywords, "Extracted keywords");

    let date = now.format("%Y-%m-%d").to_string();
    let context = enrichment_context(&records, selected.as_ref(), config.enrichment.context_records);
    let request = EnrichmentRequest {
        records: &context,
        keywords: &keywords,
        date: &date,
    };
    let enrichment = enricher.enrich(&request).await;

    let assembler = ArticleAssembler::new(&config.posts_dir, history_store, config.highlight_count);
    let mut doc = assembler.compose(&request, &records, selected.as_ref(), enrichment, now);
    let path = assembler.publish(&mut doc, selected.as_ref(), &mut history).await?;
    info!(path = %path.display(), slug = %doc.slug, "Blog generated");
    Ok(path)
}

/// Rebuild `posts.json` from the generated articles.
pub async fn rebuild_manifest(config: &Config) -> Result<usize, Box<dyn Error>> {
    manifest::write_manifest(&config.posts_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::DisabledEnricher;
    use crate::history::HistorySet;
    use crate::models::Record;
    use crate::outputs::article::fallback_body;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    struct StaticFeed(&'static str);

    impl FetchAsync for StaticFeed {
        async fn fetch(&self, _url: &str) -> Result<String, Box<dyn Error>> {
            Ok(self.0.to_string())
        }
    }

    /// Records the request it was given and answers with a fixed body.
    struct FixedEnricher {
        body: Option<&'static str>,
        seen_records: RefCell<Vec<String>>,
    }

    impl Enricher for FixedEnricher {
        async fn enrich(&self, request: &EnrichmentRequest<'_>) -> Option<String> {
            *self.seen_records.borrow_mut() = request.records.iter().map(|r| r.title.clone()).collect();
            self.body.map(str::to_string)
        }
    }

    const FEED: &str = "<rss><channel>\
        <item><title>Model X launches</title><link>https://ex.com/a?x=1</link>\
        <description>New model</description><pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate></item>\
        <item><title>Agents everywhere</title><link>https://ex.com/b</link>\
        <description>Agent model</description><pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate></item>\
        </channel></rss>";

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.news_path = dir.join("data").join("news.json");
        config.history_path = dir.join("data").join("history.json");
        config.posts_dir = dir.join("post");
        config.fallback_page = dir.join("index.html");
        config.feeds.truncate(1);
        config
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let first = ingest(&config, &StaticFeed(FEED)).await.unwrap();
        assert_eq!(first, IngestReport { fetched: 2, stored: 2 });
        let after_first = std::fs::read_to_string(&config.news_path).unwrap();

        let second = ingest(&config, &StaticFeed(FEED)).await.unwrap();
        assert_eq!(second.stored, 2);
        assert_eq!(std::fs::read_to_string(&config.news_path).unwrap(), after_first);

        let records: Vec<Record> = serde_json::from_str(&after_first).unwrap();
        assert_eq!(records[0].title, "Agents everywhere");
        assert_eq!(records[1].url, "https://ex.com/a");
    }

    #[tokio::test]
    async fn test_generate_rotates_through_unused_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        ingest(&config, &StaticFeed(FEED)).await.unwrap();

        generate(&config, &DisabledEnricher, at(9, 0, 0)).await.unwrap();
        generate(&config, &DisabledEnricher, at(9, 0, 1)).await.unwrap();

        let history = HistoryStore::new(&config.history_path).load().await.unwrap();
        assert!(history.contains("https://ex.com/b"));
        assert!(history.contains("https://ex.com/a"));
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_generate_with_enrichment_uses_it_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        ingest(&config, &StaticFeed(FEED)).await.unwrap();

        let enricher = FixedEnricher {
            body: Some("<h2>生成</h2><p>enriched body</p>"),
            seen_records: RefCell::new(Vec::new()),
        };
        let path = generate(&config, &enricher, at(10, 0, 0)).await.unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("<h2>生成</h2><p>enriched body</p>"));
        assert!(!html.contains("このブログで伝えたいこと"));
        assert!(html.contains("直近の注目記事"));
        assert_eq!(*enricher.seen_records.borrow(), vec!["Agents everywhere", "Model X launches"]);
    }

    #[tokio::test]
    async fn test_generate_fallback_matches_template() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        ingest(&config, &StaticFeed(FEED)).await.unwrap();

        let records = RecordStore::new(&config.news_path, config.max_records).load().await.unwrap();
        let keywords = KeywordExtractor::default().extract(&corpus_text(&records));
        let selected = select(&records, &HistorySet::default()).cloned();

        let path = generate(&config, &DisabledEnricher, at(11, 0, 0)).await.unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains(&fallback_body(&keywords, selected.as_ref())));
    }

    #[tokio::test]
    async fn test_generate_with_empty_corpus_uses_fallback_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(
            &config.fallback_page,
            "<html><script>ignored ignored ignored</script><body>transformer transformer</body></html>",
        )
        .unwrap();

        let path = generate(&config, &DisabledEnricher, at(12, 0, 0)).await.unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<span class=\"tag\">transformer</span>"));
        assert!(!html.contains("ignored"));
        assert!(!html.contains("直近の注目記事"));
        assert!(!config.history_path.exists());
    }

    #[tokio::test]
    async fn test_generate_without_any_text_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let path = generate(&config, &DisabledEnricher, at(13, 0, 0)).await.unwrap();
        assert!(path.ends_with("daily-ai-news-20240103-130000.html"));
        assert_eq!(rebuild_manifest(&config).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_fails_when_store_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        // A directory where the temporary store file must go.
        std::fs::create_dir_all(dir.path().join("data").join("news.json.tmp")).unwrap();

        assert!(ingest(&config, &StaticFeed(FEED)).await.is_err());
        assert!(!config.news_path.exists());
    }

    #[tokio::test]
    async fn test_generate_fails_when_posts_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        ingest(&config, &StaticFeed(FEED)).await.unwrap();
        std::fs::write(&config.posts_dir, "not a directory").unwrap();

        assert!(generate(&config, &DisabledEnricher, at(14, 0, 0)).await.is_err());
        assert!(!config.history_path.exists());
    }

    #[tokio::test]
    async fn test_generate_fails_when_history_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        ingest(&config, &StaticFeed(FEED)).await.unwrap();
        std::fs::create_dir_all(dir.path().join("data").join("history.json.tmp")).unwrap();

        assert!(generate(&config, &DisabledEnricher, at(15, 0, 0)).await.is_err());
        assert!(!config.history_path.exists());
    }
}
