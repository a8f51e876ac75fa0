//! Summarization stage: one bounded-length summary per new article.
//!
//! The summary is requested from a Gemini-style `generateContent` endpoint
//! and then hard-truncated to the character budget, whatever the model
//! returned. Failures never reach the caller; they become a placeholder
//! summary that embeds the error.

use crate::api::{HttpRequest, RetryingClient, Transport};
use crate::error::RequestError;
use crate::prompts::{summary_system_prompt, summary_user_prompt};
use crate::utils::{truncate_chars, truncate_for_log};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Used when the endpoint answers but carries no candidate text.
pub const EMPTY_GENERATION: &str = "AI summary failed.";

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Client for the text-generation endpoint.
#[derive(Debug)]
pub struct Summarizer<'a, T> {
    pub http: &'a RetryingClient<T>,
    pub endpoint: &'a str,
    pub api_key: Option<&'a str>,
}

impl<'a, T> Summarizer<'a, T>
where
    T: Transport,
{
    /// Summarize an article in at most `max_chars` characters.
    ///
    /// # Arguments
    ///
    /// * `title` - Article headline
    /// * `description` - Source description, the text actually summarized
    /// * `max_chars` - Character budget for the stored summary
    ///
    /// # Returns
    ///
    /// The trimmed model output cut to `max_chars`. Never fails: on any error
    /// the result is `[Error: Failed to summarize article. <error>]`, cut to
    /// the same budget.
    #[instrument(level = "info", skip_all, fields(max_chars = max_chars))]
    pub async fn summarize(&self, title: &str, description: &str, max_chars: usize) -> String {
        let t0 = Instant::now();
        match self.try_summarize(title, description, max_chars).await {
            Ok(summary) => {
                info!(
                    chars = summary.chars().count(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Generated AI summary"
                );
                summary
            }
            Err(e) => {
                warn!(error = %e, "Summary generation failed; storing placeholder");
                // The placeholder is stored as the summary, so it obeys the same budget.
                truncate_chars(&format!("[Error: Failed to summarize article. {e}]"), max_chars)
            }
        }
    }

    /// The fallible core of [`Self::summarize`].
    pub async fn try_summarize(
        &self,
        title: &str,
        description: &str,
        max_chars: usize,
    ) -> Result<String, SummaryError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": summary_user_prompt(title, description) }] }],
            "systemInstruction": { "parts": [{ "text": summary_system_prompt(max_chars) }] },
        });
        let mut request = HttpRequest::post_json(self.endpoint, payload);
        if let Some(key) = self.api_key {
            request = request.query("key", key);
        }

        let response: GenerateResponse = self.http.request_json(&request).await?;
        let generated = response
            .first_text()
            .unwrap_or_else(|| EMPTY_GENERATION.to_string());
        let summary = truncate_chars(generated.trim(), max_chars);
        if summary.len() < generated.trim().len() {
            info!(
                generated_chars = generated.chars().count(),
                preview = %truncate_for_log(&generated, 80),
                "Model exceeded the character budget; truncated"
            );
        }
        Ok(summary)
    }
}
