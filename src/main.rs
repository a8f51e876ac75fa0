//! # Disaster News Pipeline
//!
//! Ingests disaster-related news articles, summarizes them, stores them in
//! an article table keyed by URL, and classifies each stored article for
//! disaster-response needs.
//!
//! ## Stages
//!
//! 1. **Ingestion** (`scrape`): page through search results for a topic,
//!    skip URLs already in the table (one batched lookup per page), summarize
//!    and insert the rest. Stops after the first page that yields new data.
//! 2. **Classification** (`classify`): for every INSERT/MODIFY record in a
//!    table change event, ask the inference endpoint for a structured
//!    assessment, extract the JSON object from the free-form answer and
//!    write the normalized fields back to the record.
//!
//! `run` chains both stages locally, feeding the classifier a change event
//! built from the records the scrape just inserted.
//!
//! ## Usage
//!
//! ```sh
//! GNEWS_API_KEY=... GEMINI_API_KEY=... disaster_news_pipeline run
//! ```

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classify;
mod cli;
mod config;
mod error;
mod events;
mod extract;
mod ingest;
mod models;
mod prompts;
mod scrapers;
mod store;
mod summarize;
mod utils;

use api::{ReqwestTransport, RetryPolicy, RetryingClient};
use classify::{Classifier, handle_stream_event};
use cli::{Cli, Command};
use config::{Credentials, PipelineConfig, load_config};
use events::{ScrapeEvent, ScrapeOutcome, StreamEvent, read_event};
use ingest::handle_scrape_event;
use store::{ArticleStore, JsonFileStore, MemoryStore};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "disaster_news_pipeline starting up");

    let args = Cli::parse();
    debug!(?args.command, data_dir = %args.data_dir, table = %args.table_name, "Parsed CLI arguments");

    let config = load_config(args.config.as_deref()).await?;
    let credentials = Credentials {
        gnews_api_key: args.gnews_api_key.clone(),
        gemini_api_key: args.gemini_api_key.clone(),
        inference_api_key: args.inference_api_key.clone(),
    };
    debug!(?credentials, "Resolved credentials");

    let transport = ReqwestTransport::new(Duration::from_secs(config.retry.timeout_secs))?;
    let http = RetryingClient::new(transport, RetryPolicy::from(&config.retry));

    let result = if args.in_memory {
        info!("Using an in-memory article table; nothing will be persisted");
        let store = MemoryStore::new();
        let result = execute(&args.command, &http, &store, &config, &credentials).await;
        info!(records = store.len(), "Discarding in-memory article table");
        result
    } else {
        // Early check: the table file must be writable before any API is called
        let data_dir = Path::new(&args.data_dir);
        if let Err(e) = ensure_writable_dir(data_dir).await {
            error!(
                path = %args.data_dir,
                error = %e,
                "Data directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
        let store = JsonFileStore::open(data_dir, &args.table_name).await?;
        execute(&args.command, &http, &store, &config, &credentials).await
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result
}

async fn execute<S: ArticleStore>(
    command: &Command,
    http: &RetryingClient<ReqwestTransport>,
    store: &S,
    config: &PipelineConfig,
    credentials: &Credentials,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Scrape { topic, event } => {
            let mut event = match event {
                Some(path) => read_event::<ScrapeEvent>(path).await?,
                None => ScrapeEvent::default(),
            };
            if topic.is_some() {
                event.topic = topic.clone();
            }
            let outcome = handle_scrape_event(http, store, config, credentials, &event).await;
            print_outcome(&outcome)
        }
        Command::Classify { event } => {
            let event: StreamEvent = read_event(event).await?;
            let classifier = Classifier {
                http,
                config: &config.inference,
                api_key: credentials.inference_api_key.as_deref(),
            };
            let outcome = handle_stream_event(&classifier, store, &event).await;
            print_outcome(&outcome)
        }
        Command::Run { topic } => run(http, store, config, credentials, topic.clone()).await,
    }
}

/// Scrape, then classify every record the scrape inserted.
#[instrument(level = "info", skip_all)]
async fn run<S: ArticleStore>(
    http: &RetryingClient<ReqwestTransport>,
    store: &S,
    config: &PipelineConfig,
    credentials: &Credentials,
    topic: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let scrape = handle_scrape_event(http, store, config, credentials, &ScrapeEvent { topic }).await;
    print_outcome(&scrape)?;

    let ScrapeOutcome::Success { inserted_urls, .. } = &scrape else {
        warn!("Scrape did not succeed; skipping classification");
        return Ok(());
    };
    let mut inserted = Vec::with_capacity(inserted_urls.len());
    for url in inserted_urls {
        if let Some(record) = store.get(url).await? {
            inserted.push(record);
        }
    }
    info!(count = inserted.len(), "Classifying newly inserted articles");

    let classifier = Classifier {
        http,
        config: &config.inference,
        api_key: credentials.inference_api_key.as_deref(),
    };
    let outcome = handle_stream_event(&classifier, store, &StreamEvent::inserts(&inserted)).await;
    print_outcome(&outcome)
}

fn print_outcome<O: Serialize>(outcome: &O) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
