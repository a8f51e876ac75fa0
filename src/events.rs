//! Trigger payloads and handler results.
//!
//! Two kinds of events drive the pipeline:
//!
//! - [`ScrapeEvent`]: starts one ingestion run, optionally naming a topic
//! - [`StreamEvent`]: a batch of change records from the article table,
//!   in the change-stream shape
//!   `{"Records": [{"eventName": "INSERT", "dynamodb": {"NewImage": {...}}}]}`
//!
//! Handlers answer with [`ScrapeOutcome`] / [`ClassifyOutcome`], which
//! serialize to a JSON object tagged by `status`.

use crate::error::ConfigError;
use crate::models::ArticleRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::io::AsyncReadExt;

/// Payload that starts one ingestion run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScrapeEvent {
    #[serde(default)]
    pub topic: Option<String>,
}

/// A batch of table change records.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<StreamRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub dynamodb: StreamPayload,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamPayload {
    #[serde(rename = "NewImage", default)]
    pub new_image: HashMap<String, AttributeValue>,
}

/// A typed attribute value. Only string attributes are read; other types
/// deserialize with `s == None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AttributeValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl AttributeValue {
    pub fn string(s: impl Into<String>) -> Self {
        Self { s: Some(s.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
    Other,
}

impl StreamRecord {
    pub fn kind(&self) -> ChangeKind {
        match self.event_name.as_deref() {
            Some("INSERT") => ChangeKind::Insert,
            Some("MODIFY") => ChangeKind::Modify,
            Some("REMOVE") => ChangeKind::Remove,
            _ => ChangeKind::Other,
        }
    }

    /// Non-empty string attribute `name` of the new image.
    pub fn string_attr(&self, name: &str) -> Option<&str> {
        self.dynamodb
            .new_image
            .get(name)
            .and_then(|v| v.s.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Change record announcing that `record` was inserted.
    pub fn insert_of(record: &ArticleRecord) -> Self {
        let mut image = HashMap::new();
        image.insert("url".to_string(), AttributeValue::string(&record.url));
        image.insert("summary".to_string(), AttributeValue::string(&record.summary));
        image.insert(
            "source_description".to_string(),
            AttributeValue::string(&record.source_description),
        );
        if let Some(title) = &record.title {
            image.insert("title".to_string(), AttributeValue::string(title));
        }
        if let Some(location) = &record.location {
            image.insert("location".to_string(), AttributeValue::string(location));
        }
        Self {
            event_name: Some("INSERT".to_string()),
            dynamodb: StreamPayload { new_image: image },
        }
    }
}

impl StreamEvent {
    /// One INSERT record per stored article, as the table stream would emit.
    pub fn inserts<'a>(records: impl IntoIterator<Item = &'a ArticleRecord>) -> Self {
        Self {
            records: Some(records.into_iter().map(StreamRecord::insert_of).collect()),
        }
    }
}

/// Result of one ingestion invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Success {
        count: usize,
        topic: String,
        pages_checked: u32,
        inserted_urls: Vec<String>,
    },
    Error {
        message: String,
    },
}

/// Result of one change-event invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifyOutcome {
    NoRecords,
    Processed { records: usize },
}

/// Read an event payload from `path`, or from stdin when `path` is `-`.
pub async fn read_event<E: DeserializeOwned>(path: &str) -> Result<E, ConfigError> {
    let raw = if path == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .map_err(|source| ConfigError::Read {
                path: "<stdin>".to_string(),
                source,
            })?;
        raw
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?
    };
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::tests::record;
    use serde_json::json;

    #[test]
    fn test_stream_event_deserialization() {
        let raw = json!({
            "Records": [
                {
                    "eventName": "INSERT",
                    "dynamodb": {
                        "Keys": {"url": {"S": "https://a"}},
                        "NewImage": {
                            "url": {"S": "https://a"},
                            "title": {"S": "Flood"},
                            "confidence": {"N": "0.5"},
                            "priority_needs": {"L": [{"S": "food"}]}
                        }
                    }
                },
                {"eventName": "REMOVE", "dynamodb": {}}
            ]
        });
        let event: StreamEvent = serde_json::from_value(raw).unwrap();
        let records = event.records.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), ChangeKind::Insert);
        assert_eq!(records[0].string_attr("url"), Some("https://a"));
        assert_eq!(records[0].string_attr("confidence"), None);
        assert_eq!(records[1].kind(), ChangeKind::Remove);
        assert_eq!(records[1].string_attr("url"), None);
    }

    #[test]
    fn test_missing_records_key() {
        let event: StreamEvent = serde_json::from_str("{}").unwrap();
        assert!(event.records.is_none());
    }

    #[test]
    fn test_insert_of_record() {
        let rec = record("https://b");
        let event = StreamEvent::inserts([&rec]);
        let records = event.records.unwrap();
        assert_eq!(records[0].kind(), ChangeKind::Insert);
        assert_eq!(records[0].string_attr("summary"), Some("summary"));
        assert_eq!(records[0].string_attr("title"), Some("Title for https://b"));
        assert_eq!(records[0].string_attr("location"), None);
    }

    #[tokio::test]
    async fn test_read_event_from_file() {
        let path = std::env::temp_dir().join(format!("dnp-event-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"topic": "tsunami warning"}"#).unwrap();
        let event: ScrapeEvent = read_event(path.to_str().unwrap()).await.unwrap();
        assert_eq!(event.topic.as_deref(), Some("tsunami warning"));

        std::fs::write(&path, "not json").unwrap();
        let err = read_event::<ScrapeEvent>(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Event(_)));
        let _ = std::fs::remove_file(&path);

        let err = read_event::<StreamEvent>("/nonexistent/event.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = ScrapeOutcome::Success {
            count: 2,
            topic: "flood".to_string(),
            pages_checked: 1,
            inserted_urls: vec![],
        };
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["count"], 2);
        assert_eq!(v["pages_checked"], 1);

        let err = ScrapeOutcome::Error {
            message: "GNews API Key is missing.".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "message": "GNews API Key is missing."})
        );

        assert_eq!(
            serde_json::to_value(ClassifyOutcome::NoRecords).unwrap(),
            json!({"status": "no_records"})
        );
        assert_eq!(
            serde_json::to_value(ClassifyOutcome::Processed { records: 3 }).unwrap(),
            json!({"status": "processed", "records": 3})
        );
    }
}
