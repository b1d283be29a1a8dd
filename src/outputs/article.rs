//! Article assembly: compose, write to a unique slot, record history.
//!
//! # Naming
//!
//! Files are named `daily-ai-news-YYYYMMDD-HHMMSS.html`. When that name is
//! taken the assembler tries `-1`, `-2`, … and creates the file with
//! create-new semantics, so two documents generated in the same second never
//! share a file.

use super::html::render_document;
use crate::enrichment::EnrichmentRequest;
use crate::history::{HistorySet, HistoryStore};
use crate::models::{GeneratedDocument, Record};
use crate::utils::slugify;
use chrono::NaiveDateTime;
use itertools::Itertools;
use quick_xml::escape::escape;
use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Guard against an unbounded search for a free file name.
const MAX_SLUG_ATTEMPTS: usize = 10_000;

/// `Daily AI News トレンド解説 - {date}`.
pub fn document_title(date: &str) -> String {
    format!("Daily AI News トレンド解説 - {}", date)
}

/// Meta description built from the five leading keywords.
pub fn document_description(keywords: &[String]) -> String {
    format!("{} にフォーカスした自動生成ブログ。", keywords.iter().take(5).join(" / "))
}

fn leading(keywords: &[String], n: usize, sep: &str) -> String {
    keywords.iter().take(n).map(|k| escape(k.as_str())).join(sep)
}

/// Body used when enrichment is unavailable.
///
/// Depends only on the keywords and the selected record's title; the
/// pick-up paragraph is omitted when no record was selected.
pub fn fallback_body(keywords: &[String], record: Option<&Record>) -> String {
    let mut body = String::new();
    body.push_str("<h2>このブログで伝えたいこと</h2>\n");
    body.push_str(&format!(
        "<p>Daily AI News では、{} を中心に、最新動向や事業に直結するポイントをコンパクトにまとめます。</p>\n",
        leading(keywords, 3, "・")
    ));
    if let Some(record) = record {
        body.push_str("<h2>今日のピックアップ</h2>\n");
        body.push_str(&format!(
            "<p>「{}」を手がかりに、{} の観点から今日の動きを整理します。</p>\n",
            escape(record.title.as_str()),
            leading(keywords, 2, " と ")
        ));
    }
    body.push_str("<h2>注目ポイント</h2>\n");
    body.push_str(
        "<p>マルチモーダル対応や API 統合など、実務で活きるトピックをピックアップ。\
         国内外の動向を追いつつ、ビジネスでの活用視点を優先して解説します。</p>\n",
    );
    body.push_str("<h2>なぜ今重要か</h2>\n");
    body.push_str(&format!(
        "<p>{} の進化は、競争優位やオペレーション効率に直結します。最新ニュースを追うことで、次の打ち手を早めに検討できます。</p>\n",
        leading(keywords, 2, " と ")
    ));
    body.push_str(&format!(
        "<div class=\"cta\">次回以降も {} を軸に、実務に役立つ視点でアップデートしていきます。</div>",
        leading(keywords, 4, " / ")
    ));
    body
}

/// Timestamped base slug, unique per second.
pub fn base_slug(now: NaiveDateTime) -> String {
    slugify(&format!("daily-ai-news-{}", now.format("%Y%m%d-%H%M%S")))
}

/// Context records for enrichment: the selected record first, then the
/// newest others, `limit` in total.
pub fn enrichment_context(records: &[Record], selected: Option<&Record>, limit: usize) -> Vec<Record> {
    selected
        .into_iter()
        .chain(records.iter().filter(|r| Some(*r) != selected))
        .take(limit)
        .cloned()
        .collect()
}

/// Write `bytes` to a freshly created `out`, removing `path` if the write fails.
///
/// A partially written article would otherwise be listed by the manifest.
async fn write_or_discard<W>(path: &Path, mut out: W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        out.write_all(bytes).await?;
        out.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(out);
        if let Err(rm) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %rm, "Could not remove partial article");
        }
        return Err(e);
    }
    Ok(())
}

/// Builds generated documents and persists them with their history update.
#[derive(Debug, Clone)]
pub struct ArticleAssembler {
    posts_dir: PathBuf,
    history_store: HistoryStore,
    highlight_count: usize,
}

impl ArticleAssembler {
    pub fn new(posts_dir: impl Into<PathBuf>, history_store: HistoryStore, highlight_count: usize) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            history_store,
            highlight_count,
        }
    }

    /// Compose the document; the slug is the base slug until [`Self::publish`].
    ///
    /// `enrichment` is used verbatim when non-empty; otherwise the body is
    /// [`fallback_body`]. Highlights are the newest records of the store.
    pub fn compose(
        &self,
        request: &EnrichmentRequest<'_>,
        store: &[Record],
        selected: Option<&Record>,
        enrichment: Option<String>,
        now: NaiveDateTime,
    ) -> GeneratedDocument {
        let body = match enrichment.filter(|b| !b.trim().is_empty()) {
            Some(body) => {
                debug!("Using enriched body");
                body
            }
            None => {
                debug!("Using fallback body");
                fallback_body(request.keywords, selected)
            }
        };

        GeneratedDocument {
            title: document_title(request.date),
            description: document_description(request.keywords),
            date: request.date.to_string(),
            slug: base_slug(now),
            keywords: request.keywords.to_vec(),
            highlights: store.iter().take(self.highlight_count).cloned().collect(),
            body,
        }
    }

    /// Write the document to a free slot, then mark `selected` as used.
    ///
    /// Updates `doc.slug` to the name actually written. Any write failure is
    /// returned to the caller.
    #[instrument(level = "info", skip_all, fields(posts_dir = %self.posts_dir.display(), slug = %doc.slug))]
    pub async fn publish(
        &self,
        doc: &mut GeneratedDocument,
        selected: Option<&Record>,
        history: &mut HistorySet,
    ) -> Result<PathBuf, Box<dyn Error>> {
        tokio::fs::create_dir_all(&self.posts_dir).await?;
        let html = render_document(doc);
        let base = doc.slug.clone();

        let mut attempt = 0usize;
        let path = loop {
            let slug = if attempt == 0 { base.clone() } else { format!("{}-{}", base, attempt) };
            let path = self.posts_dir.join(format!("{}.html", slug));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    write_or_discard(&path, file, html.as_bytes()).await?;
                    doc.slug = slug;
                    break path;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_SLUG_ATTEMPTS => {
                    debug!(%slug, "Slug taken; trying next suffix");
                    attempt += 1;
                }
                Err(e) => return Err(Box::new(e)),
            }
        };
        info!(path = %path.display(), "Wrote article");

        if let Some(record) = selected {
            history.mark_used(record);
            self.history_store.save(history).await?;
        }
        Ok(path)
    }
}
