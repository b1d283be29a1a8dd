//! Pattern-based RSS item decoder.
//!
//! Feeds come from semi-trusted aggregators and are frequently not valid XML
//! (stray entities, HTML inside descriptions), so items are recovered with
//! tag-scoped patterns instead of a strict parser. [`FeedDecoder`] is the
//! seam where a compliant parser can be substituted.

use crate::models::{Record, record_id};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

/// Host used when an item link does not parse as a URL.
pub const DEFAULT_SOURCE: &str = "news.google.com";
/// Summary used when an item has no usable description.
pub const MISSING_SUMMARY: &str = "要約情報は取得できませんでした。";
const DEFAULT_CATEGORY: &str = "ニュース";
const DEFAULT_LANG: &str = "EN";

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item\s*>").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| tag_regex("title"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| tag_regex("link"));
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| tag_regex("description"));
static PUB_DATE_RE: Lazy<Regex> = Lazy::new(|| tag_regex("pubDate"));
static CDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!\[CDATA\[|\]\]>").unwrap());
static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn tag_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>")).unwrap()
}

/// Turns one raw feed document into normalized records.
pub trait FeedDecoder {
    /// Decode every well-formed item; malformed items are skipped.
    fn decode(&self, raw: &str, lang: &str, category: &str) -> Vec<Record>;
}

/// Regex-driven decoder for RSS 2.0 `<item>` blocks.
#[derive(Debug, Clone)]
pub struct PatternDecoder {
    /// Date assigned to items whose `pubDate` is missing or unparseable.
    fallback_date: NaiveDate,
}

impl PatternDecoder {
    /// Decoder that stamps undated items with today's UTC date.
    pub fn new() -> Self {
        Self::with_fallback_date(Utc::now().date_naive())
    }

    pub fn with_fallback_date(fallback_date: NaiveDate) -> Self {
        Self { fallback_date }
    }

    fn decode_item(&self, block: &str, lang: &str, category: &str) -> Option<Record> {
        let title = capture(&TITLE_RE, block).map(|t| decode_text(&t))?;
        let link = capture(&LINK_RE, block).map(|l| decode_text(&l))?;
        if title.is_empty() || link.is_empty() {
            return None;
        }

        let url = canonical_url(&link);
        let summary = capture(&DESCRIPTION_RE, block)
            .map(|d| strip_markup(&decode_text(&d)))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| MISSING_SUMMARY.to_string());
        let date = capture(&PUB_DATE_RE, block)
            .and_then(|d| parse_date(&decode_text(&d)))
            .unwrap_or(self.fallback_date);

        Some(Record {
            id: record_id(&url, &title),
            source: source_host(&url),
            title,
            summary,
            category: non_empty_or(category, DEFAULT_CATEGORY),
            lang: non_empty_or(lang, DEFAULT_LANG),
            date: date.format("%Y-%m-%d").to_string(),
            url,
        })
    }
}

impl Default for PatternDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedDecoder for PatternDecoder {
    #[instrument(level = "debug", skip(self, raw), fields(bytes = raw.len()))]
    fn decode(&self, raw: &str, lang: &str, category: &str) -> Vec<Record> {
        let mut blocks = 0usize;
        let records: Vec<Record> = ITEM_RE
            .captures_iter(raw)
            .filter_map(|caps| {
                blocks += 1;
                self.decode_item(caps.get(1)?.as_str(), lang, category)
            })
            .collect();
        debug!(blocks, decoded = records.len(), "Decoded feed items");
        records
    }
}

fn capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn non_empty_or(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Remove CDATA markers, decode entities and trim.
///
/// Entities quick-xml does not know (e.g. `&nbsp;`) make it reject the whole
/// string; the common five are then decoded by hand.
pub fn decode_text(raw: &str) -> String {
    let without_cdata = CDATA_RE.replace_all(raw, "");
    let decoded = match unescape(&without_cdata) {
        Ok(text) => text.into_owned(),
        Err(_) => without_cdata
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&"),
    };
    decoded.trim().to_string()
}

/// Replace markup with spaces, decode the result and collapse whitespace.
pub fn strip_markup(html: &str) -> String {
    let text = decode_text(&MARKUP_RE.replace_all(html, " "));
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Drop the query string (and anything after it) from a link.
pub fn canonical_url(link: &str) -> String {
    link.split('?').next().unwrap_or_default().trim().to_string()
}

/// Host of `url` without a leading `www.`, or [`DEFAULT_SOURCE`].
pub fn source_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
}

/// Parse an RFC 2822, RFC 3339 or bare ISO date into its UTC calendar day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
