//! Rendering of a [`GeneratedDocument`] into the site's standalone HTML page.
//!
//! Title, description, badges and highlights are escaped; the body is an
//! HTML fragment and is inserted as-is.

use crate::models::GeneratedDocument;
use quick_xml::escape::escape;
use std::fmt::Write;

const STYLE: &str = r#"    :root {
      --bg: #0b0d10;
      --panel: #121722;
      --text: #e8ecf2;
      --muted: #9aa3b6;
      --accent: #4fd1c5;
      --accent-2: #6c8bff;
      --border: #1f2733;
      --radius: 18px;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      font-family: "Inter", "Noto Sans JP", system-ui, -apple-system, sans-serif;
      background: radial-gradient(circle at 20% 20%, rgba(79,209,197,0.08), transparent 28%),
                  radial-gradient(circle at 80% 0%, rgba(108,139,255,0.07), transparent 32%),
                  var(--bg);
      color: var(--text);
      line-height: 1.7;
      padding: 24px 16px 60px;
    }
    .wrap {
      max-width: 900px;
      margin: 0 auto;
      background: var(--panel);
      border: 1px solid var(--border);
      border-radius: var(--radius);
      box-shadow: 0 16px 40px rgba(0,0,0,0.35);
      padding: 26px 26px 34px;
    }
    .title { margin: 0 0 6px; font-size: 28px; font-weight: 800; letter-spacing: 0.01em; }
    .meta { color: var(--muted); margin: 0 0 16px; }
    .tags { display: flex; flex-wrap: wrap; gap: 8px; margin: 14px 0 18px; }
    .tag {
      display: inline-flex;
      padding: 6px 10px;
      border-radius: 999px;
      background: rgba(79,209,197,0.12);
      border: 1px solid rgba(79,209,197,0.4);
      color: var(--text);
      font-weight: 700;
      font-size: 13px;
    }
    h2 { margin: 18px 0 10px; font-size: 20px; }
    p { margin: 10px 0; color: var(--muted); }
    ul { padding-left: 18px; color: var(--muted); }
    .hl-date { margin-left: 8px; color: var(--muted); font-size: 12px; }
    .cta {
      margin-top: 22px;
      padding: 14px 16px;
      background: linear-gradient(135deg, rgba(79,209,197,0.15), rgba(108,139,255,0.15));
      border-radius: 14px;
      border: 1px solid var(--border);
      color: var(--text);
      font-weight: 700;
    }
    a { color: var(--accent); }"#;

/// Render the full page, ending with a single newline.
pub fn render_document(doc: &GeneratedDocument) -> String {
    let title = escape(doc.title.as_str());
    let description = escape(doc.description.as_str());

    let badges: String = doc
        .keywords
        .iter()
        .map(|k| format!("<span class=\"tag\">{}</span>", escape(k.as_str())))
        .collect();

    let mut page = String::new();
    let _ = writeln!(page, "<!DOCTYPE html>");
    let _ = writeln!(page, "<html lang=\"ja\">");
    let _ = writeln!(page, "<head>");
    let _ = writeln!(page, "  <meta charset=\"UTF-8\">");
    let _ = writeln!(page, "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
    let _ = writeln!(page, "  <title>{}</title>", title);
    let _ = writeln!(page, "  <meta name=\"description\" content=\"{}\">", description);
    let _ = writeln!(page, "  <style>\n{}\n  </style>", STYLE);
    let _ = writeln!(page, "</head>");
    let _ = writeln!(page, "<body>");
    let _ = writeln!(page, "  <article class=\"wrap\">");
    let _ = writeln!(page, "    <h1 class=\"title\">{}</h1>", title);
    let _ = writeln!(page, "    <p class=\"meta\">公開日: {}</p>", escape(doc.date.as_str()));
    let _ = writeln!(page, "    <div class=\"tags\">{}</div>", badges);
    let _ = writeln!(page, "{}", doc.body.trim());
    if !doc.highlights.is_empty() {
        let items: String = doc
            .highlights
            .iter()
            .map(|r| {
                format!(
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a><span class=\"hl-date\">{}</span></li>",
                    escape(r.url.as_str()),
                    escape(r.title.as_str()),
                    escape(r.date.as_str())
                )
            })
            .collect();
        let _ = writeln!(page, "    <h2>直近の注目記事</h2><ul>{}</ul>", items);
    }
    let _ = writeln!(page, "  </article>");
    let _ = writeln!(page, "</body>");
    let _ = writeln!(page, "</html>");
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, record_id};

    fn doc(highlights: Vec<Record>) -> GeneratedDocument {
        GeneratedDocument {
            title: "Daily AI News トレンド解説 - 2024-01-02".to_string(),
            description: "llm / model にフォーカスした自動生成ブログ。".to_string(),
            date: "2024-01-02".to_string(),
            slug: "daily-ai-news-20240102-090000".to_string(),
            keywords: vec!["llm".to_string(), "<b>".to_string()],
            highlights,
            body: "<p>body</p>".to_string(),
        }
    }

    #[test]
    fn test_renders_head_and_badges() {
        let html = render_document(&doc(Vec::new()));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Daily AI News トレンド解説 - 2024-01-02</title>"));
        assert!(html.contains("<meta name=\"description\" content=\"llm / model にフォーカスした自動生成ブログ。\">"));
        assert!(html.contains("<span class=\"tag\">llm</span><span class=\"tag\">&lt;b&gt;</span>"));
        assert!(html.contains("<p>body</p>"));
        assert!(!html.contains("直近の注目記事"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_renders_escaped_highlights() {
        let record = Record {
            id: record_id("https://ex.com/a", "A & B"),
            title: "A & B".to_string(),
            summary: String::new(),
            category: String::new(),
            lang: String::new(),
            date: "2024-01-01".to_string(),
            source: "ex.com".to_string(),
            url: "https://ex.com/a".to_string(),
        };
        let html = render_document(&doc(vec![record]));
        assert!(html.contains("<h2>直近の注目記事</h2>"));
        assert!(html.contains(">A &amp; B</a><span class=\"hl-date\">2024-01-01</span>"));
    }
}
