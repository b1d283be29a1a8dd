//! Topic keyword extraction.
//!
//! Tokens are runs of ASCII alphanumerics or runs of Japanese script. The
//! eight most frequent tokens that survive the stop-list are followed by a
//! fixed domain vocabulary, deduplicated and capped at twelve.

use crate::models::Record;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Maximum number of keywords returned.
pub const MAX_KEYWORDS: usize = 12;
/// Number of corpus-derived keywords placed ahead of the fallback list.
pub const TOP_RANKED: usize = 8;

/// Markup terms and words too generic for this site.
pub const STOP_WORDS: &[&str] = &[
    "html", "head", "body", "meta", "charset", "lang", "id", "class", "title", "script", "style",
    "news", "daily", "ai", "jp", "en",
];

/// Domain vocabulary that pads short keyword lists.
pub const FALLBACK_KEYWORDS: &[&str] = &[
    "aiニュース",
    "生成ai",
    "最新モデル",
    "企業動向",
    "研究速報",
    "プロダクトレビュー",
    "日本のニュース",
    "マルチモーダル",
    "llm",
    "api統合",
];

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+|[ぁ-んァ-ヴー一-龠々]+").unwrap());
static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Ranks corpus tokens and pads them with a fallback vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stop_words: Vec<String>,
    fallback: Vec<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(STOP_WORDS, FALLBACK_KEYWORDS)
    }
}

impl KeywordExtractor {
    pub fn new(stop_words: &[&str], fallback: &[&str]) -> Self {
        Self {
            stop_words: stop_words.iter().map(|w| w.to_lowercase()).collect(),
            fallback: fallback.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Extract up to [`MAX_KEYWORDS`] keywords from `text`.
    ///
    /// Ranking is by frequency, ties broken by first occurrence, so the
    /// result is deterministic for identical input.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let ranked = self.rank(text);
        debug!(unique_tokens = ranked.len(), "Ranked corpus tokens");

        ranked
            .into_iter()
            .take(TOP_RANKED)
            .chain(self.fallback.iter().cloned())
            .unique()
            .take(MAX_KEYWORDS)
            .collect()
    }

    /// All surviving tokens, most frequent first.
    fn rank(&self, text: &str) -> Vec<String> {
        // token -> (count, first occurrence)
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for m in TOKEN_RE.find_iter(text) {
            let token = m.as_str();
            if token.chars().count() < 2 {
                continue;
            }
            let key = token.to_lowercase();
            if self.stop_words.contains(&key) {
                continue;
            }
            let next = counts.len();
            counts.entry(key).or_insert((0, next)).0 += 1;
        }

        counts
            .into_iter()
            .sorted_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)))
            .map(|(token, _)| token)
            .collect()
    }
}

/// Corpus text for keyword extraction: `"{title} {summary}"` per record.
pub fn corpus_text(records: &[Record]) -> String {
    records
        .iter()
        .map(|r| format!("{} {}", r.title, r.summary))
        .join(" ")
}

/// Visible text of an HTML page: script and style blocks and tags removed.
pub fn page_text(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    TAG_RE.replace_all(&text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record_id;

    fn fallback() -> Vec<String> {
        FALLBACK_KEYWORDS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_frequency_ranking_with_no_matching_stop_words() {
        let extractor = KeywordExtractor::new(&["html"], FALLBACK_KEYWORDS);
        let keywords = extractor.extract("AI AI model model model");
        assert_eq!(keywords[0], "model");
        assert_eq!(keywords[1], "ai");
        assert_eq!(keywords[2..], fallback()[..10]);
        assert_eq!(keywords.len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_default_stop_list_drops_generic_terms() {
        let keywords = KeywordExtractor::default().extract("AI AI model model model news Daily");
        assert_eq!(keywords[0], "model");
        assert!(!keywords.contains(&"news".to_string()));
        assert!(!keywords.contains(&"daily".to_string()));
        assert_eq!(keywords[1], "aiニュース");
    }

    #[test]
    fn test_ties_keep_first_occurrence_order() {
        let keywords = KeywordExtractor::default().extract("zeta alpha mid zeta alpha mid");
        assert_eq!(keywords[..3], ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_short_tokens_are_discarded() {
        let keywords = KeywordExtractor::default().extract("a b c x 1 2 go");
        assert_eq!(keywords[0], "go");
        assert_eq!(keywords[1], "aiニュース");
    }

    #[test]
    fn test_japanese_runs_are_tokens() {
        let keywords = KeywordExtractor::default().extract("生成モデル、生成モデル。エージェント！");
        assert_eq!(keywords[0], "生成モデル");
        assert_eq!(keywords[1], "エージェント");
    }

    #[test]
    fn test_top_eight_then_fallback_deduplicated() {
        let text = "one two three four five six seven eight nine llm llm llm";
        let keywords = KeywordExtractor::default().extract(text);
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(keywords[0], "llm");
        assert_eq!(keywords[1..8], ["one", "two", "three", "four", "five", "six", "seven"]);
        assert!(!keywords.contains(&"eight".to_string()));
        assert_eq!(keywords.iter().filter(|k| *k == "llm").count(), 1);
        assert_eq!(keywords[8..], ["aiニュース", "生成ai", "最新モデル", "企業動向"]);
    }

    #[test]
    fn test_empty_text_yields_fallback() {
        let keywords = KeywordExtractor::default().extract("");
        assert_eq!(keywords, fallback());
    }

    #[test]
    fn test_deterministic() {
        let text = "alpha beta gamma beta delta alpha epsilon beta";
        let extractor = KeywordExtractor::default();
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }

    #[test]
    fn test_page_text_drops_scripts_and_styles() {
        let html = r#"<html><head><style>.hidden { color: red }</style>
            <script type="text/javascript">var secretToken = 1;</script></head>
            <body><h1>Visible Heading</h1></body></html>"#;
        let text = page_text(html);
        assert!(text.contains("Visible Heading"));
        assert!(!text.contains("secretToken"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_corpus_text_joins_titles_and_summaries() {
        let record = |t: &str, s: &str| Record {
            id: record_id("", t),
            title: t.to_string(),
            summary: s.to_string(),
            category: String::new(),
            lang: String::new(),
            date: String::new(),
            source: String::new(),
            url: String::new(),
        };
        let text = corpus_text(&[record("T1", "S1"), record("T2", "S2")]);
        assert_eq!(text, "T1 S1 T2 S2");
    }
}
