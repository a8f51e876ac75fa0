//! Classification stage: disaster-response assessment of stored articles.
//!
//! Triggered by table change events. For every INSERT or MODIFY record the
//! article text is sent to the inference endpoint, the model's answer is run
//! through [`crate::extract`], the fields are normalized, and the five
//! classification attributes are written back to the same record.
//!
//! Nothing in this stage fails its caller: inference or parse problems
//! produce the fallback classification, and a failed write is logged while
//! the rest of the batch carries on.

use crate::api::{HttpRequest, RetryingClient, Transport};
use crate::config::InferenceConfig;
use crate::error::RequestError;
use crate::events::{ChangeKind, ClassifyOutcome, StreamEvent};
use crate::extract::extract;
use crate::models::{Classification, UNKNOWN_LOCATION};
use crate::prompts::classification_prompt;
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("inference request failed: {0}")]
    Request(#[from] RequestError),
    #[error("inference response carried no generated text")]
    EmptyGeneration,
}

/// Body returned by the inference endpoint. Different model families name
/// the text field differently.
#[derive(Debug, Default, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    generation: Option<String>,
    #[serde(default)]
    completion: Option<String>,
}

impl InferenceResponse {
    fn text(self) -> String {
        self.generation
            .filter(|s| !s.trim().is_empty())
            .or(self.completion)
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Client for the model inference endpoint.
#[derive(Debug)]
pub struct Classifier<'a, T> {
    pub http: &'a RetryingClient<T>,
    pub config: &'a InferenceConfig,
    pub api_key: Option<&'a str>,
}

impl<'a, T> Classifier<'a, T>
where
    T: Transport,
{
    /// Classify one article for disaster-response needs.
    ///
    /// # Arguments
    ///
    /// * `title` - Article headline
    /// * `content` - Article text (content snippet, or the summary)
    /// * `location_hint` - Location used when the model names none
    ///
    /// # Returns
    ///
    /// The normalized [`Classification`]. Never fails; an inference error
    /// yields [`Classification::fallback`] located at `location_hint`, and
    /// output without a usable JSON object yields the same values.
    #[instrument(level = "info", skip_all, fields(location_hint = %location_hint))]
    pub async fn classify(&self, title: &str, content: &str, location_hint: &str) -> Classification {
        match self.try_classify(title, content, location_hint).await {
            Ok(c) => {
                info!(
                    support_level = %c.support_level,
                    confidence = c.confidence,
                    location = %c.location,
                    people_affected = c.people_affected,
                    "Classified article"
                );
                c
            }
            Err(e) => {
                warn!(error = %e, "Classification failed; using fallback record");
                Classification::fallback(location_hint)
            }
        }
    }

    /// The fallible core of [`Self::classify`]. Output without a usable JSON
    /// object is not an error here; it yields the fallback record.
    pub async fn try_classify(
        &self,
        title: &str,
        content: &str,
        location_hint: &str,
    ) -> Result<Classification, ClassifyError> {
        let completion = self.infer(&classification_prompt(title, content)).await?;
        debug!(raw = %truncate_for_log(&completion, 500), "Inference raw output");
        if completion.is_empty() {
            return Err(ClassifyError::EmptyGeneration);
        }
        let record = extract(&completion, location_hint);
        Ok(Classification::from_record(&record, location_hint))
    }

    async fn infer(&self, prompt: &str) -> Result<String, RequestError> {
        let body = json!({
            "prompt": prompt,
            "max_gen_len": self.config.max_gen_len,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        });
        let mut request =
            HttpRequest::post_json(&self.config.endpoint, body).header("Accept", "application/json");
        if let Some(key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response: InferenceResponse = self.http.request_json(&request).await?;
        Ok(response.text())
    }
}

/// Handle one batch of table change records.
///
/// INSERT and MODIFY records are classified and written back; other record
/// kinds and records without a URL are skipped. Returns
/// [`ClassifyOutcome::NoRecords`] when the event carries no `Records` key.
#[instrument(level = "info", skip_all)]
pub async fn handle_stream_event<T, S>(
    classifier: &Classifier<'_, T>,
    store: &S,
    event: &StreamEvent,
) -> ClassifyOutcome
where
    T: Transport,
    S: ArticleStore,
{
    let Some(records) = &event.records else {
        warn!("No Records found in event");
        return ClassifyOutcome::NoRecords;
    };
    info!(count = records.len(), "Received change records");

    let mut updated = 0usize;
    for record in records {
        if !matches!(record.kind(), ChangeKind::Insert | ChangeKind::Modify) {
            debug!(event_name = ?record.event_name, "Ignoring change record");
            continue;
        }

        let Some(url) = record.string_attr("url") else {
            warn!("Skipping record with missing URL");
            continue;
        };
        let title = record.string_attr("title").unwrap_or("");
        let content = record
            .string_attr("content")
            .or_else(|| record.string_attr("summary"))
            .unwrap_or("");
        let location = record.string_attr("location").unwrap_or(UNKNOWN_LOCATION);

        info!(%url, %title, "Processing article");
        let classification = classifier.classify(title, content, location).await;

        match store.update_classification(url, &classification).await {
            Ok(()) => {
                updated += 1;
                info!(%url, "Updated article classification");
            }
            Err(e) => error!(%url, error = %e, "Classification update failed"),
        }
    }

    info!(records = records.len(), updated, "Finished change batch");
    ClassifyOutcome::Processed {
        records: records.len(),
    }
}
