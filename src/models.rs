//! Data models for search results, stored articles, and classifications.
//!
//! - [`SearchArticle`]: one article as returned by the news-search API
//! - [`ArticleRecord`]: the persisted row, keyed by URL
//! - [`Classification`]: the five disaster-response fields written back by
//!   the classification stage
//! - [`SupportLevel`]: ordinal severity of the support an event needs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on `priority_needs` entries.
pub const MAX_PRIORITY_NEEDS: usize = 3;

pub const NO_DESCRIPTION: &str = "No source description.";
pub const NO_CONTENT_SNIPPET: &str = "No content snippet available.";
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Page of results from the news-search API.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub articles: Vec<SearchArticle>,
}

/// An article as returned by the news-search API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchArticle {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchArticle {
    /// Description used both as summary input and as the audit copy.
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }
}

/// A persisted article. `url` is the primary key and never changes.
///
/// Ingestion fields are written once. The classification fields are `None`
/// until the classification stage has run, and are overwritten as a group
/// each time it runs again.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: Option<String>,
    pub summary: String,
    pub source_description: String,
    pub raw_content_snippet: String,
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub inserted_at: String,
    /// Ingestion-time location guess, used as the classification hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_level: Option<SupportLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_needs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people_affected: Option<u64>,
}

impl ArticleRecord {
    /// Build the ingestion-time record for a freshly summarized article.
    pub fn from_search(article: &SearchArticle, summary: String, inserted_at: String) -> Self {
        Self {
            url: article.url.clone(),
            title: article.title.clone(),
            summary,
            source_description: article.description_or_default().to_string(),
            raw_content_snippet: article
                .content
                .clone()
                .unwrap_or_else(|| NO_CONTENT_SNIPPET.to_string()),
            source: article.source.as_ref().and_then(|s| s.name.clone()),
            published_at: article.published_at.clone(),
            inserted_at,
            location: None,
            support_level: None,
            confidence: None,
            detected_location: None,
            priority_needs: None,
            people_affected: None,
        }
    }

    /// Overwrite the classification fields.
    pub fn apply_classification(&mut self, c: &Classification) {
        self.support_level = Some(c.support_level);
        self.confidence = Some(c.confidence);
        self.detected_location = Some(c.location.clone());
        self.priority_needs = Some(c.priority_needs.clone());
        self.people_affected = Some(c.people_affected);
    }
}

/// Severity of the support a reported event needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum SupportLevel {
    #[serde(rename = "Minimal Support")]
    Minimal,
    #[serde(rename = "Moderate Support")]
    Moderate,
    #[serde(rename = "High Support")]
    High,
    #[serde(rename = "Emergency/Critical Support")]
    Emergency,
    #[default]
    Unknown,
}

impl SupportLevel {
    pub fn label(self) -> &'static str {
        match self {
            SupportLevel::Minimal => "Minimal Support",
            SupportLevel::Moderate => "Moderate Support",
            SupportLevel::High => "High Support",
            SupportLevel::Emergency => "Emergency/Critical Support",
            SupportLevel::Unknown => "Unknown",
        }
    }

    /// Lenient parse of a model-produced label.
    ///
    /// Matching is case-insensitive and keyword based, so `"high"`,
    /// `"HIGH SUPPORT"` and `"High Support needed"` all map to [`Self::High`].
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase();
        if l.contains("emergency") || l.contains("critical") {
            SupportLevel::Emergency
        } else if l.contains("high") {
            SupportLevel::High
        } else if l.contains("moderate") {
            SupportLevel::Moderate
        } else if l.contains("minimal") {
            SupportLevel::Minimal
        } else {
            SupportLevel::Unknown
        }
    }
}

impl std::fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Disaster-response assessment of one article.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Classification {
    pub location: String,
    pub support_level: SupportLevel,
    pub confidence: f64,
    pub priority_needs: Vec<String>,
    pub people_affected: u64,
}

impl Classification {
    /// The all-defaults record used whenever no trustworthy result exists.
    pub fn fallback(location: &str) -> Self {
        Self {
            location: location.to_string(),
            support_level: SupportLevel::Unknown,
            confidence: 0.0,
            priority_needs: Vec::new(),
            people_affected: 0,
        }
    }

    /// Normalize a loosely typed record into a `Classification`.
    ///
    /// Missing or empty fields take their defaults and numeric fields are
    /// coerced; nothing here can fail.
    pub fn from_record(record: &Map<String, Value>, location_hint: &str) -> Self {
        let location = record
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(location_hint)
            .to_string();

        let support_level = record
            .get("support_level")
            .and_then(Value::as_str)
            .map(SupportLevel::from_label)
            .unwrap_or_default();

        let confidence = record
            .get("confidence")
            .map(coerce_confidence)
            .and_then(Result::ok)
            .unwrap_or(0.0);

        let people_affected = record
            .get("people_affected")
            .map(coerce_people_affected)
            .and_then(Result::ok)
            .unwrap_or(0);

        let priority_needs = record
            .get("priority_needs")
            .map(coerce_priority_needs)
            .unwrap_or_default();

        Self {
            location,
            support_level,
            confidence,
            priority_needs,
            people_affected,
        }
    }
}

/// Why a raw value could not be coerced to its declared numeric type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot coerce {0} to a number")]
pub struct CoerceError(pub String);

/// Coerce a raw `confidence` value into `[0, 1]`.
pub fn coerce_confidence(value: &Value) -> Result<f64, CoerceError> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match raw {
        Some(f) if f.is_finite() => Ok(f.clamp(0.0, 1.0)),
        _ => Err(CoerceError(value.to_string())),
    }
}

/// Coerce a raw `people_affected` value into a non-negative integer.
///
/// Floats are truncated; negative numbers clamp to zero.
pub fn coerce_people_affected(value: &Value) -> Result<u64, CoerceError> {
    let raw = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|i| i.max(0) as u64))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc().max(0.0) as u64)
            }),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| i.max(0) as u64),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    };
    raw.ok_or_else(|| CoerceError(value.to_string()))
}

/// Keep the first [`MAX_PRIORITY_NEEDS`] non-empty needs.
pub fn coerce_priority_needs(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter(|s| !s.is_empty())
        .take(MAX_PRIORITY_NEEDS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_search_response_deserialization() {
        let body = r#"{
            "totalArticles": 1,
            "articles": [{
                "title": "Floods hit coast",
                "description": "Heavy rain",
                "content": "Long text",
                "url": "https://news.example/a",
                "image": null,
                "publishedAt": "2025-05-06T10:00:00Z",
                "source": {"name": "Example News", "url": "https://news.example"}
            }]
        }"#;
        let page: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.articles.len(), 1);
        let a = &page.articles[0];
        assert_eq!(a.url, "https://news.example/a");
        assert_eq!(a.published_at.as_deref(), Some("2025-05-06T10:00:00Z"));
        assert_eq!(a.source.as_ref().unwrap().name.as_deref(), Some("Example News"));
    }

    #[test]
    fn test_record_from_search_uses_defaults() {
        let article = SearchArticle {
            url: "https://news.example/b".to_string(),
            title: Some("Quake".to_string()),
            description: None,
            content: None,
            source: None,
            published_at: None,
        };
        let rec = ArticleRecord::from_search(&article, "summary".to_string(), "now".to_string());
        assert_eq!(rec.source_description, NO_DESCRIPTION);
        assert_eq!(rec.raw_content_snippet, NO_CONTENT_SNIPPET);
        assert_eq!(rec.source, None);
        assert_eq!(rec.support_level, None);
    }

    #[test]
    fn test_record_serialization_skips_unset_classification() {
        let article = SearchArticle {
            url: "https://news.example/c".to_string(),
            title: None,
            description: Some("d".to_string()),
            content: Some("c".to_string()),
            source: None,
            published_at: None,
        };
        let mut rec = ArticleRecord::from_search(&article, "s".to_string(), "t".to_string());
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("support_level"));

        rec.apply_classification(&Classification {
            location: "Riverside Town".to_string(),
            support_level: SupportLevel::High,
            confidence: 0.9,
            priority_needs: vec!["shelter".to_string()],
            people_affected: 2000,
        });
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains(r#""support_level":"High Support""#));
        assert!(json.contains(r#""detected_location":"Riverside Town""#));
        let back: ArticleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_support_level_from_label() {
        assert_eq!(SupportLevel::from_label("High Support"), SupportLevel::High);
        assert_eq!(SupportLevel::from_label("minimal"), SupportLevel::Minimal);
        assert_eq!(SupportLevel::from_label("MODERATE SUPPORT"), SupportLevel::Moderate);
        assert_eq!(
            SupportLevel::from_label("Emergency/Critical Support"),
            SupportLevel::Emergency
        );
        assert_eq!(SupportLevel::from_label("critical"), SupportLevel::Emergency);
        assert_eq!(SupportLevel::from_label("who knows"), SupportLevel::Unknown);
        assert_eq!(SupportLevel::from_label(""), SupportLevel::Unknown);
    }

    #[test]
    fn test_confidence_coercion() {
        assert_eq!(coerce_confidence(&json!(0.75)), Ok(0.75));
        assert_eq!(coerce_confidence(&json!("0.4")), Ok(0.4));
        assert_eq!(coerce_confidence(&json!(1)), Ok(1.0));
        assert_eq!(coerce_confidence(&json!(7.5)), Ok(1.0));
        assert!(coerce_confidence(&json!("very sure")).is_err());
        assert!(coerce_confidence(&json!("NaN")).is_err());
        assert!(coerce_confidence(&Value::Null).is_err());
        assert!(coerce_confidence(&json!([0.5])).is_err());
    }

    #[test]
    fn test_people_affected_coercion() {
        assert_eq!(coerce_people_affected(&json!(2000)), Ok(2000));
        assert_eq!(coerce_people_affected(&json!("350")), Ok(350));
        assert_eq!(coerce_people_affected(&json!(12.9)), Ok(12));
        assert_eq!(coerce_people_affected(&json!(-5)), Ok(0));
        assert!(coerce_people_affected(&json!("about 2,000")).is_err());
        assert!(coerce_people_affected(&json!("12.5")).is_err());
        assert!(coerce_people_affected(&Value::Null).is_err());
    }

    #[test]
    fn test_priority_needs_coercion() {
        assert_eq!(
            coerce_priority_needs(&json!(["food", " water ", "", "shelter", "rescue"])),
            vec!["food", "water", "shelter"]
        );
        assert_eq!(coerce_priority_needs(&json!("medical care")), vec!["medical care"]);
        assert!(coerce_priority_needs(&json!(42)).is_empty());
    }

    #[test]
    fn test_from_record_fills_defaults() {
        let c = Classification::from_record(&record(json!({})), "Springfield");
        assert_eq!(c, Classification::fallback("Springfield"));
    }

    #[test]
    fn test_from_record_non_numeric_values_become_zero() {
        let c = Classification::from_record(
            &record(json!({
                "location": "",
                "support_level": "High Support",
                "confidence": "unsure",
                "people_affected": "many",
                "priority_needs": null
            })),
            "Hint City",
        );
        assert_eq!(c.location, "Hint City");
        assert_eq!(c.support_level, SupportLevel::High);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.people_affected, 0);
        assert!(c.priority_needs.is_empty());
    }

    #[test]
    fn test_from_record_is_deterministic() {
        let r = record(json!({"location": "Valley", "support_level": "moderate", "confidence": "0.5"}));
        assert_eq!(
            Classification::from_record(&r, "x"),
            Classification::from_record(&r, "x")
        );
    }
}
