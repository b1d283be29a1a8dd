//! `posts.json` manifest of generated articles.
//!
//! Read-only over the articles themselves: each `*.html` file in the posts
//! directory contributes its `<title>`, its description meta tag and its
//! modification date. Entries are sorted newest first.

use crate::models::ManifestEntry;
use crate::utils::write_json_atomic;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const MANIFEST_FILE: &str = "posts.json";
const MISSING_DESCRIPTION: &str = "記事の概要が未設定です。";

/// Title and description of one article page.
pub fn page_metadata(html: &str) -> (Option<String>, Option<String>) {
    let document = Html::parse_document(html);
    let title = Selector::parse("title").ok().and_then(|sel| {
        document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    });
    let description = Selector::parse(r#"meta[name="description"]"#).ok().and_then(|sel| {
        document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|c| c.trim().to_string())
    });
    (title.filter(|t| !t.is_empty()), description)
}

/// Scan `posts_dir` for articles and build the manifest entries.
#[instrument(level = "info", skip_all, fields(posts_dir = %posts_dir.display()))]
pub async fn scan_posts(posts_dir: &Path) -> Result<Vec<ManifestEntry>, Box<dyn Error>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut dir = fs::read_dir(posts_dir).await?;
    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if is_html && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping file with non UTF-8 name");
            continue;
        };
        let html = fs::read_to_string(&path).await?;
        let modified: DateTime<Utc> = fs::metadata(&path).await?.modified()?.into();
        let (title, description) = page_metadata(&html);
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| file_name.clone());

        entries.push(ManifestEntry {
            title: title.unwrap_or(stem),
            description: description.unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
            date: modified.format("%Y-%m-%d").to_string(),
            url: format!("post/{}", file_name),
            slug: file_name,
        });
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
}

/// Rebuild `posts.json` in `posts_dir`; returns the number of entries.
#[instrument(level = "info", skip_all, fields(posts_dir = %posts_dir.display()))]
pub async fn write_manifest(posts_dir: &Path) -> Result<usize, Box<dyn Error>> {
    let entries = scan_posts(posts_dir).await?;
    write_json_atomic(&posts_dir.join(MANIFEST_FILE), &entries).await?;
    info!(count = entries.len(), "posts.json updated");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_metadata() {
        let html = r#"<!DOCTYPE html><html><head>
            <title> Daily AI News トレンド解説 - 2024-01-02 </title>
            <meta name="description" content="llm / model にフォーカスした自動生成ブログ。">
            </head><body></body></html>"#;
        let (title, description) = page_metadata(html);
        assert_eq!(title.unwrap(), "Daily AI News トレンド解説 - 2024-01-02");
        assert_eq!(description.unwrap(), "llm / model にフォーカスした自動生成ブログ。");
    }

    #[test]
    fn test_page_metadata_missing() {
        let (title, description) = page_metadata("<p>fragment</p>");
        assert!(title.is_none());
        assert!(description.is_none());
    }

    #[tokio::test]
    async fn test_write_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.html"),
            r#"<html><head><title>A</title><meta name="description" content="About A"></head></html>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.HTML"), "<p>no head</p>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let count = write_manifest(dir.path()).await.unwrap();
        assert_eq!(count, 2);

        let raw = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let entries: Vec<ManifestEntry> = serde_json::from_str(&raw).unwrap();
        let a = entries.iter().find(|e| e.slug == "a.html").unwrap();
        assert_eq!(a.title, "A");
        assert_eq!(a.description, "About A");
        assert_eq!(a.url, "post/a.html");
        assert_eq!(a.date.len(), 10);

        let b = entries.iter().find(|e| e.slug == "b.HTML").unwrap();
        assert_eq!(b.title, "b");
        assert_eq!(b.description, MISSING_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_missing_posts_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_manifest(&dir.path().join("nope")).await.is_err());
    }
}
