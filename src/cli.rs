//! Command-line interface definitions.
//!
//! Every deployment setting can come from a flag or from the environment
//! variable named next to it, so the same binary runs from a shell, a cron
//! job, or a function-style wrapper that only sets variables.

use clap::{Parser, Subcommand};

/// Disaster news ingestion and classification pipeline.
///
/// # Examples
///
/// ```sh
/// # Fetch new articles for the default topic
/// disaster_news_pipeline scrape
///
/// # Classify a table change event read from stdin
/// disaster_news_pipeline classify < event.json
///
/// # Ingest, then classify what was just inserted
/// disaster_news_pipeline --data-dir ./data run --topic "wildfire evacuation"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "PIPELINE_CONFIG", global = true)]
    pub config: Option<String>,

    /// Directory holding the article table
    #[arg(long, env = "DATA_DIR", default_value = "./data", global = true)]
    pub data_dir: String,

    /// Name of the article table
    #[arg(long, env = "DYNAMO_TABLE_NAME", default_value = "NewsTable", global = true)]
    pub table_name: String,

    /// Keep the article table in memory for this invocation only
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// GNews API key
    #[arg(long, env = "GNEWS_API_KEY", hide_env_values = true, global = true)]
    pub gnews_api_key: Option<String>,

    /// Gemini API key used for summaries
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Bearer token for the classification inference endpoint
    #[arg(long, env = "INFERENCE_API_KEY", hide_env_values = true, global = true)]
    pub inference_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search for new articles, summarize and store them
    Scrape {
        /// Search topic (overrides the event and the config file)
        #[arg(short, long, env = "NEWS_TOPIC")]
        topic: Option<String>,

        /// Path to a scrape event JSON file (`{"topic": "..."}`)
        #[arg(short, long)]
        event: Option<String>,
    },

    /// Classify the articles named by a table change event
    Classify {
        /// Path to the change event JSON, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },

    /// Scrape, then classify every article inserted by that run
    Run {
        /// Search topic (overrides the config file)
        #[arg(short, long, env = "NEWS_TOPIC")]
        topic: Option<String>,
    },
}
