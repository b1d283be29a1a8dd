//! Command-line interface definitions.
//!
//! Each subcommand is one independent run; `ingest` and `generate` share only
//! the persisted record store and history files.

use clap::{Parser, Subcommand};

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Pull feeds into data/news.json
/// daily_ai_news ingest
///
/// # Write a new article into post/, with Gemini enrichment when a key is set
/// GEMINI_API_KEY=... daily_ai_news generate
///
/// # Rebuild post/posts.json
/// daily_ai_news --config site.yaml manifest
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch every configured feed and merge new items into the record store
    Ingest,
    /// Generate one article from the record store
    Generate {
        /// Skip the Gemini call and always use the fallback body
        #[arg(long)]
        no_enrich: bool,

        /// Gemini API key; enrichment is disabled when absent
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
    },
    /// Rebuild posts.json from the generated articles
    Manifest,
}
