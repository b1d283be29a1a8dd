//! Optional article body generation through the Gemini API.
//!
//! The gateway never fails its caller: a missing credential, a transport
//! error or timeout, a non-success status, an undecodable response or an
//! empty answer all resolve to `None`, and the assembler falls back to its
//! deterministic body. One request per invocation, no retry.

use crate::config::EnrichmentConfig;
use crate::models::Record;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::Write;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Elements the generated fragment may use.
pub const ALLOWED_TAGS: &[&str] = &["h2", "h3", "p", "ul", "li", "strong"];

/// Context handed to an [`Enricher`].
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentRequest<'a> {
    /// Most recent records, the selected one first when available.
    pub records: &'a [Record],
    pub keywords: &'a [String],
    /// Target publication date, `YYYY-MM-DD`.
    pub date: &'a str,
}

/// Source of an enriched article body.
pub trait Enricher {
    /// Return an HTML fragment, or `None` when no usable content is available.
    async fn enrich(&self, request: &EnrichmentRequest<'_>) -> Option<String>;
}

/// Enricher that is always unavailable; used with `--no-enrich`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEnricher;

impl Enricher for DisabledEnricher {
    async fn enrich(&self, _request: &EnrichmentRequest<'_>) -> Option<String> {
        info!("Enrichment disabled; using fallback body");
        None
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiEnricher {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiEnricher {
    /// Build the client; `api_key = None` leaves the gateway disabled.
    pub fn new(config: &EnrichmentConfig, api_key: Option<String>) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    async fn call(&self, api_key: &str, prompt: String) -> Result<GenerateResponse, Box<dyn Error>> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status, truncate_for_log(&text, 200)).into());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl Enricher for GeminiEnricher {
    #[instrument(level = "info", skip_all, fields(model = %self.model, date = request.date))]
    async fn enrich(&self, request: &EnrichmentRequest<'_>) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            info!("No Gemini API key configured; using fallback body");
            return None;
        };

        let t0 = Instant::now();
        let response = match self.call(api_key, build_prompt(request)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Enrichment call failed; using fallback body");
                return None;
            }
        };

        match extract_fragment(&response) {
            Some(fragment) => {
                info!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = fragment.len(), "Enrichment succeeded");
                Some(fragment)
            }
            None => {
                warn!("Enrichment returned no usable text; using fallback body");
                None
            }
        }
    }
}

/// Instruction sent to the model.
pub fn build_prompt(request: &EnrichmentRequest<'_>) -> String {
    let tags = ALLOWED_TAGS.iter().map(|t| format!("<{t}>")).collect::<Vec<_>>().join(" ");
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "あなたは AI 業界のニュース解説者です。{} 付けのブログ記事本文を日本語で書いてください。",
        request.date
    );
    let _ = writeln!(prompt, "重視するキーワード: {}", request.keywords.join(", "));
    if !request.records.is_empty() {
        let _ = writeln!(prompt, "\n参考にする最新ニュース:");
        for record in request.records {
            let _ = writeln!(
                prompt,
                "- {} ({}, {}): {}",
                record.title, record.source, record.date, record.summary
            );
        }
    }
    let _ = writeln!(
        prompt,
        "\n出力は HTML の断片のみとし、使用できる要素は {} だけです。\
         <html> や <body>、コードブロック記法は含めないでください。",
        tags
    );
    prompt
}

/// Concatenate the first candidate's text parts, stripping code fences.
fn extract_fragment(response: &GenerateResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text: String = candidate.content.parts.iter().map(|p| p.text.as_str()).collect();
    let fragment = strip_code_fence(text.trim()).trim().to_string();
    if fragment.is_empty() { None } else { Some(fragment) }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the language tag line (```html)
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.strip_suffix("```").unwrap_or(rest)
}
