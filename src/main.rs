//! # Daily AI News
//!
//! Ingests AI news feeds into a deduplicated, size-bounded corpus and turns
//! that corpus into daily trend articles for a static site.
//!
//! ## Usage
//!
//! ```sh
//! daily_ai_news ingest            # feeds -> data/news.json
//! daily_ai_news generate          # data/news.json -> post/<slug>.html
//! daily_ai_news manifest          # post/*.html -> post/posts.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Ingest**: fetch every feed concurrently, decode items, merge them into
//!    the record store (existing entries win), save atomically
//! 2. **Generate**: select an unused record, extract keywords, optionally
//!    enrich the body through Gemini, write the article and update history
//! 3. **Manifest**: summarize the generated articles into `posts.json`
//!
//! Only failures to persist state or output end a run with an error.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod enrichment;
mod feeds;
mod history;
mod keywords;
mod models;
mod outputs;
mod pipeline;
mod selector;
mod store;
mod utils;

use cli::{Cli, Command};
use config::Config;
use enrichment::{DisabledEnricher, GeminiEnricher};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_ai_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    let config = Config::load(args.config.as_deref().map(Path::new))?;

    let result = match args.command {
        Command::Ingest => run_ingest(&config).await,
        Command::Generate {
            no_enrich,
            gemini_api_key,
        } => run_generate(&config, no_enrich, gemini_api_key).await,
        Command::Manifest => run_manifest(&config).await,
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(
            ?elapsed,
            secs = elapsed.as_secs(),
            millis = elapsed.subsec_millis(),
            "Execution complete"
        ),
        Err(e) => error!(?elapsed, error = %e, "Run failed"),
    }
    result
}

async fn run_ingest(config: &Config) -> Result<(), Box<dyn Error>> {
    let fetcher = api::feed_fetcher(&config.fetch)?;
    let report = pipeline::ingest(config, &fetcher).await?;
    info!(fetched = report.fetched, stored = report.stored, "Ingestion finished");
    Ok(())
}

async fn run_generate(
    config: &Config,
    no_enrich: bool,
    gemini_api_key: Option<String>,
) -> Result<(), Box<dyn Error>> {
    // Early check: fail before any network call if the output is not writable
    if let Err(e) = ensure_writable_dir(&config.posts_dir).await {
        error!(
            path = %config.posts_dir.display(),
            error = %e,
            "Posts directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let now = Local::now().naive_local();
    let path = if no_enrich {
        pipeline::generate(config, &DisabledEnricher, now).await?
    } else {
        let enricher = GeminiEnricher::new(&config.enrichment, gemini_api_key)?;
        pipeline::generate(config, &enricher, now).await?
    };
    info!(path = %path.display(), "Generation finished");
    Ok(())
}

async fn run_manifest(config: &Config) -> Result<(), Box<dyn Error>> {
    let count = pipeline::rebuild_manifest(config).await?;
    info!(count, "Manifest finished");
    Ok(())
}
