//! YAML configuration for feed sources, storage paths and the enrichment call.
//!
//! Every field has a default, so running without a config file uses the
//! built-in Google News searches and the `data/` + `post/` layout of the site.
//!
//! ```yaml
//! news_path: data/news.json
//! max_records: 200
//! fetch:
//!   concurrency: 4
//! feeds:
//!   - query: "AI OR 人工知能"
//!     lang: JP
//!     category: AIニュース
//!   - url: https://example.com/rss.xml
//!     lang: EN
//!     category: Research
//! ```

use crate::store::DEFAULT_MAX_RECORDS;
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persisted record store.
    pub news_path: PathBuf,
    /// Persisted history of records already used for generation.
    pub history_path: PathBuf,
    /// Directory receiving generated articles and `posts.json`.
    pub posts_dir: PathBuf,
    /// Page whose visible text seeds keywords when the store is empty.
    pub fallback_page: PathBuf,
    /// Upper bound on the number of stored records.
    pub max_records: usize,
    /// Number of most recent records listed in an article.
    pub highlight_count: usize,
    pub fetch: FetchConfig,
    pub enrichment: EnrichmentConfig,
    pub feeds: Vec<FeedSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news_path: PathBuf::from("data/news.json"),
            history_path: PathBuf::from("data/history.json"),
            posts_dir: PathBuf::from("post"),
            fallback_page: PathBuf::from("index.html"),
            max_records: DEFAULT_MAX_RECORDS,
            highlight_count: 5,
            fetch: FetchConfig::default(),
            enrichment: EnrichmentConfig::default(),
            feeds: default_feeds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of feeds fetched at the same time.
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Retries per feed after the first attempt.
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout_secs: 20,
            max_retries: 2,
            base_delay_ms: 500,
            user_agent: format!("daily_ai_news/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Base URL of the Generative Language API.
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// How many of the most recent records are described in the prompt.
    pub context_records: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 60,
            context_records: 5,
        }
    }
}

/// One syndicated feed to ingest.
///
/// Either `url` is given directly, or `query` is turned into a Google News
/// search feed for the language in `lang`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_lang() -> String {
    "EN".to_string()
}

fn default_category() -> String {
    "ニュース".to_string()
}

impl FeedSource {
    fn query(query: &str, lang: &str, category: &str) -> Self {
        Self {
            url: None,
            query: Some(query.to_string()),
            lang: lang.to_string(),
            category: category.to_string(),
        }
    }

    /// Resolve the URL to fetch, or `None` if neither `url` nor `query` is set.
    pub fn resolved_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.trim().to_string());
        }
        let query = self.query.as_deref().filter(|q| !q.trim().is_empty())?;
        let locale = if self.lang.eq_ignore_ascii_case("JP") || self.lang.eq_ignore_ascii_case("JA") {
            "hl=ja&gl=JP&ceid=JP:ja"
        } else {
            "hl=en-US&gl=US&ceid=US:en"
        };
        // Google News expects '+' between terms rather than %20.
        let encoded = urlencoding::encode(query.trim()).replace("%20", "+");
        Some(format!("https://news.google.com/rss/search?q={}&{}", encoded, locale))
    }
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::query("AI OR 人工知能", "JP", "AIニュース"),
        FeedSource::query("生成AI OR LLM OR マルチモーダル", "JP", "生成AI"),
        FeedSource::query("AI model OR LLM", "EN", "Models"),
        FeedSource::query("AI research OR machine learning", "EN", "Research"),
    ]
}

impl Config {
    /// Load the configuration from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
                let config: Config = serde_yaml::from_str(&raw)
                    .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
                info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
                Ok(config)
            }
            None => {
                info!("No config file given; using defaults");
                Ok(Config::default())
            }
        }
    }
}
