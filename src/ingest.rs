//! Deduplication and ingestion loop.
//!
//! Walks search-result pages for a topic, asks the store once per page which
//! URLs it already holds, summarizes and inserts only the new articles, and
//! stops according to the configured [`StopPolicy`]:
//!
//! - `first_new_page` (default): stop after the first page that stored at
//!   least one article. Pages that were all duplicates move on to the next.
//!   Keeps API usage low at the cost of never back-filling older pages.
//! - `exhaustive`: keep going until the source runs dry or `max_pages`.
//!
//! A failed page fetch ends the run; whatever was stored before stays.

use crate::api::{RetryingClient, Transport};
use crate::config::{Credentials, PipelineConfig, StopPolicy};
use crate::error::{RequestError, StoreError};
use crate::events::{ScrapeEvent, ScrapeOutcome};
use crate::models::ArticleRecord;
use crate::scrapers::gnews::GNewsClient;
use crate::store::ArticleStore;
use crate::summarize::Summarizer;
use chrono::Utc;
use itertools::Itertools;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("search request failed: {0}")]
    Search(#[from] RequestError),
}

/// Totals of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub topic: String,
    pub count: usize,
    /// Last page that was requested (0 if none was).
    pub pages_checked: u32,
    pub inserted_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    Exhausted,
    Processed { saved: usize },
}

/// Wiring for one ingestion run.
#[derive(Debug)]
pub struct Ingestor<'a, T, S> {
    pub search: GNewsClient<'a, T>,
    pub summarizer: Summarizer<'a, T>,
    pub store: &'a S,
    pub summary_max_chars: usize,
}

impl<'a, T, S> Ingestor<'a, T, S>
where
    T: Transport,
    S: ArticleStore,
{
    /// Run the page loop for `topic`. Never fails; errors end the loop early
    /// and are reflected in the returned counts.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, topic: &str) -> IngestReport {
        let t0 = Instant::now();
        let max_pages = self.search.config.max_pages;
        let policy = self.search.config.stop_policy;
        let mut report = IngestReport {
            topic: topic.to_string(),
            count: 0,
            pages_checked: 0,
            inserted_urls: Vec::new(),
        };
        info!(max_pages, ?policy, "Starting news search");

        for page in 1..=max_pages {
            report.pages_checked = page;
            info!(page, max_pages, "Checking page");

            match self.process_page(topic, page, &mut report).await {
                Ok(PageOutcome::Exhausted) => {
                    warn!(page, "No articles returned; ending search");
                    break;
                }
                Ok(PageOutcome::Processed { saved }) if saved > 0 && policy == StopPolicy::FirstNewPage => {
                    info!(page, saved, "Found new articles; stopping pagination");
                    break;
                }
                Ok(PageOutcome::Processed { saved }) => {
                    info!(page, saved, "Moving to next page");
                }
                Err(IngestError::Search(e)) => {
                    error!(page, status = ?e.status(), error = %e, "Error during search; stopping");
                    break;
                }
            }
        }

        info!(
            count = report.count,
            pages_checked = report.pages_checked,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Ingestion complete"
        );
        report
    }

    async fn process_page(
        &self,
        topic: &str,
        page: u32,
        report: &mut IngestReport,
    ) -> Result<PageOutcome, IngestError> {
        let articles = self.search.search_page(topic, page).await?;
        if articles.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        // The batched lookup rejects duplicate keys.
        let urls: Vec<String> = articles.iter().map(|a| a.url.clone()).unique().collect();
        let existing = match self.store.existing_urls(&urls).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(page, error = %e, "Batch existence check failed; treating all as new");
                HashSet::new()
            }
        };
        info!(
            page,
            existing = existing.len(),
            total = articles.len(),
            "Checked for existing articles"
        );

        let mut saved = 0usize;
        let mut seen: HashSet<&str> = HashSet::new();
        for (i, article) in articles.iter().enumerate() {
            if existing.contains(&article.url) || !seen.insert(article.url.as_str()) {
                continue;
            }

            let title = article.title.as_deref().unwrap_or("");
            info!(index = i + 1, page, %title, "Processing article");
            let summary = self
                .summarizer
                .summarize(title, article.description_or_default(), self.summary_max_chars)
                .await;
            let record = ArticleRecord::from_search(article, summary, Utc::now().to_rfc3339());

            match self.store.insert(&record).await {
                Ok(()) => {
                    saved += 1;
                    report.count += 1;
                    report.inserted_urls.push(record.url);
                    info!(%title, "Saved new article");
                }
                Err(StoreError::AlreadyExists(url)) => {
                    debug!(%url, "Article already stored; skipping");
                }
                Err(e) => {
                    error!(url = %article.url, error = %e, "Failed to store article");
                }
            }
        }
        Ok(PageOutcome::Processed { saved })
    }
}

/// Handle one scrape trigger end to end.
///
/// # Arguments
///
/// * `http` - Shared retrying client for search and summary calls
/// * `store` - Article table
/// * `config` - Pipeline tunables
/// * `credentials` - API keys
/// * `event` - Trigger payload; its `topic` overrides the configured one
///
/// # Returns
///
/// [`ScrapeOutcome::Success`] with the run totals, or
/// [`ScrapeOutcome::Error`] without touching the network when the search API
/// key is missing.
#[instrument(level = "info", skip_all)]
pub async fn handle_scrape_event<T, S>(
    http: &RetryingClient<T>,
    store: &S,
    config: &PipelineConfig,
    credentials: &Credentials,
    event: &ScrapeEvent,
) -> ScrapeOutcome
where
    T: Transport,
    S: ArticleStore,
{
    let Some(api_key) = credentials.gnews_key() else {
        error!("GNEWS_API_KEY is not configured");
        return ScrapeOutcome::Error {
            message: "GNews API Key is missing.".to_string(),
        };
    };
    if credentials.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; summaries will likely fail");
    }

    let topic = event
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&config.search.topic);

    let ingestor = Ingestor {
        search: GNewsClient {
            http,
            config: &config.search,
            api_key,
        },
        summarizer: Summarizer {
            http,
            endpoint: &config.summary.endpoint,
            api_key: credentials.gemini_api_key.as_deref(),
        },
        store,
        summary_max_chars: config.summary.max_chars,
    };
    let report = ingestor.run(topic).await;

    ScrapeOutcome::Success {
        count: report.count,
        topic: report.topic,
        pages_checked: report.pages_checked,
        inserted_urls: report.inserted_urls,
    }
}
