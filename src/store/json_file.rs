//! Article table persisted as a single JSON file.
//!
//! The whole table is held in memory and rewritten after every mutation
//! (write to a sibling temp file, then rename). Good enough for one
//! invocation at a time, which is all the pipeline runs.
//!
//! # Layout
//!
//! ```text
//! {data_dir}/
//! └── {table_name}.json   # { "<url>": { ...record... }, ... }
//! ```

use super::ArticleStore;
use crate::error::StoreError;
use crate::models::{ArticleRecord, Classification};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, ArticleRecord>>,
}

impl JsonFileStore {
    /// Open the table file for `table` under `data_dir`, starting empty if it
    /// does not exist yet.
    #[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display(), table = %table))]
    pub async fn open(data_dir: &Path, table: &str) -> Result<Self, StoreError> {
        let path = data_dir.join(format!("{table}.json"));
        let items = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), records = items.len(), "Opened article table");
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    async fn persist(&self, items: &BTreeMap<String, ArticleRecord>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), records = items.len(), "Persisted article table");
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        let items = self.items.lock().await;
        Ok(urls
            .iter()
            .filter(|u| items.contains_key(u.as_str()))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        if items.contains_key(&record.url) {
            return Err(StoreError::AlreadyExists(record.url.clone()));
        }
        items.insert(record.url.clone(), record.clone());
        if let Err(e) = self.persist(&items).await {
            items.remove(&record.url);
            return Err(e);
        }
        Ok(())
    }

    async fn update_classification(
        &self,
        url: &str,
        classification: &Classification,
    ) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        let record = items
            .get_mut(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        let previous = record.clone();
        record.apply_classification(classification);
        if let Err(e) = self.persist(&items).await {
            items.insert(url.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.items.lock().await.get(url).cloned())
    }
}
