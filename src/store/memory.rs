//! In-process article table.

use super::ArticleStore;
use crate::error::StoreError;
use crate::models::{ArticleRecord, Classification};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, ArticleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_records(records: impl IntoIterator<Item = ArticleRecord>) -> Self {
        let items = records.into_iter().map(|r| (r.url.clone(), r)).collect();
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // A poisoned lock only means another thread panicked mid-operation; every
    // operation leaves the map consistent, so keep using it.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ArticleRecord>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArticleStore for MemoryStore {
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        let items = self.lock();
        Ok(urls
            .iter()
            .filter(|u| items.contains_key(u.as_str()))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        let mut items = self.lock();
        if items.contains_key(&record.url) {
            return Err(StoreError::AlreadyExists(record.url.clone()));
        }
        items.insert(record.url.clone(), record.clone());
        Ok(())
    }

    async fn update_classification(
        &self,
        url: &str,
        classification: &Classification,
    ) -> Result<(), StoreError> {
        let mut items = self.lock();
        let record = items
            .get_mut(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        record.apply_classification(classification);
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.lock().get(url).cloned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{SearchArticle, SupportLevel};

    pub(crate) fn record(url: &str) -> ArticleRecord {
        let article = SearchArticle {
            url: url.to_string(),
            title: Some(format!("Title for {url}")),
            description: Some("desc".to_string()),
            content: Some("content".to_string()),
            source: None,
            published_at: None,
        };
        ArticleRecord::from_search(&article, "summary".to_string(), "2025-01-01T00:00:00Z".to_string())
    }

    #[tokio::test]
    async fn test_insert_never_overwrites() {
        let store = MemoryStore::new();
        store.insert(&record("https://a")).await.unwrap();

        let mut changed = record("https://a");
        changed.summary = "different".to_string();
        let err = store.insert(&changed).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.get("https://a").await.unwrap().unwrap().summary, "summary");
    }

    #[tokio::test]
    async fn test_existing_urls_batch() {
        let store = MemoryStore::from_records([record("https://a"), record("https://b")]);
        let urls = vec![
            "https://a".to_string(),
            "https://c".to_string(),
            "https://b".to_string(),
        ];
        let existing = store.existing_urls(&urls).await.unwrap();
        assert_eq!(existing.len(), 2);
        assert!(existing.contains("https://a"));
        assert!(!existing.contains("https://c"));
    }

    #[tokio::test]
    async fn test_update_classification_overwrites() {
        let store = MemoryStore::from_records([record("https://a")]);
        let mut c = Classification::fallback("Somewhere");
        store.update_classification("https://a", &c).await.unwrap();

        c.support_level = SupportLevel::Emergency;
        c.people_affected = 40;
        store.update_classification("https://a", &c).await.unwrap();

        let rec = store.get("https://a").await.unwrap().unwrap();
        assert_eq!(rec.support_level, Some(SupportLevel::Emergency));
        assert_eq!(rec.people_affected, Some(40));
        assert_eq!(rec.summary, "summary");
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .update_classification("https://nope", &Classification::fallback("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.len(), 0);
    }
}
