//! GNews search API client.
//!
//! Results are requested one page at a time; the ingestion loop decides how
//! many pages to walk. Every request goes through the retrying client.

use crate::api::{HttpRequest, RetryingClient, Transport};
use crate::config::SearchConfig;
use crate::error::RequestError;
use crate::models::{SearchArticle, SearchResponse};
use tracing::{info, instrument};

#[derive(Debug)]
pub struct GNewsClient<'a, T> {
    pub http: &'a RetryingClient<T>,
    pub config: &'a SearchConfig,
    pub api_key: &'a str,
}

impl<'a, T> GNewsClient<'a, T>
where
    T: Transport,
{
    fn page_request(&self, topic: &str, page: u32) -> HttpRequest {
        HttpRequest::get(&self.config.endpoint)
            .query("q", topic)
            .query("lang", &self.config.language)
            .query("country", &self.config.country)
            .query("max", self.config.page_size)
            .query("token", self.api_key)
            .query("page", page)
    }

    /// Fetch one page of results for `topic`.
    ///
    /// # Arguments
    ///
    /// * `topic` - Search query
    /// * `page` - 1-based page number
    ///
    /// # Returns
    ///
    /// The articles on that page, in API order. An empty vector means the
    /// source is exhausted.
    ///
    /// # Errors
    ///
    /// [`RequestError`] when the request fails after retries or the body is
    /// not a search response.
    #[instrument(level = "info", skip(self))]
    pub async fn search_page(&self, topic: &str, page: u32) -> Result<Vec<SearchArticle>, RequestError> {
        let response: SearchResponse = self.http.request_json(&self.page_request(topic, page)).await?;
        info!(count = response.articles.len(), "Fetched search results");
        Ok(response.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedTransport, no_delay, response};

    #[tokio::test]
    async fn test_page_request_parameters() {
        let http = RetryingClient::new(
            ScriptedTransport::always(200, r#"{"articles": []}"#),
            no_delay(1),
        );
        let config = SearchConfig::default();
        let client = GNewsClient {
            http: &http,
            config: &config,
            api_key: "tok",
        };
        let articles = client.search_page("flood", 2).await.unwrap();
        assert!(articles.is_empty());

        let sent = client.page_request("flood", 2);
        assert_eq!(sent.url, config.endpoint);
        assert_eq!(
            sent.query,
            vec![
                ("q".to_string(), "flood".to_string()),
                ("lang".to_string(), "en".to_string()),
                ("country".to_string(), "world".to_string()),
                ("max".to_string(), "10".to_string()),
                ("token".to_string(), "tok".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_page_is_an_error() {
        let http = RetryingClient::new(
            ScriptedTransport::new(vec![], response(200, r#"{"articles": [{"title": "no url"}]}"#)),
            no_delay(1),
        );
        let config = SearchConfig::default();
        let client = GNewsClient {
            http: &http,
            config: &config,
            api_key: "tok",
        };
        let err = client.search_page("flood", 1).await.unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
    }
}
