//! The article table.
//!
//! A single table keyed by article URL, with the four operations the
//! pipeline needs:
//!
//! | Operation | Used by | Semantics |
//! |-----------|---------|-----------|
//! | `existing_urls` | ingestion | one batched membership query |
//! | `insert` | ingestion | insert-if-absent, never overwrites |
//! | `update_classification` | classification | sets the five classification fields, last write wins |
//! | `get` | local `run` command, tests | point read |
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`]: process-local map
//! - [`json_file::JsonFileStore`]: the same map persisted to a JSON file

use crate::error::StoreError;
use crate::models::{ArticleRecord, Classification};
use std::collections::HashSet;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Storage for article records keyed by URL.
///
/// Implementors must make `insert` atomic per key: two inserts of the same
/// URL never both succeed.
pub trait ArticleStore {
    /// Which of `urls` already have a record. Issued as a single batched
    /// lookup regardless of how many URLs are passed.
    ///
    /// # Arguments
    ///
    /// * `urls` - Candidate keys, without duplicates
    ///
    /// # Returns
    ///
    /// The subset of `urls` that is already stored.
    async fn existing_urls(&self, urls: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Create `record`.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if its URL is taken; the stored record
    /// is left untouched. I/O errors leave the table as it was.
    async fn insert(&self, record: &ArticleRecord) -> Result<(), StoreError>;

    /// Overwrite the five classification fields of an existing record.
    /// Other fields are never touched.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no record for `url`. I/O errors
    /// leave the record as it was.
    async fn update_classification(
        &self,
        url: &str,
        classification: &Classification,
    ) -> Result<(), StoreError>;

    async fn get(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError>;
}
