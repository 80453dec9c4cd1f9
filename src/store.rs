//! Storage seam for tag mutation.
//!
//! The [`ProductStore`] trait covers the two operations the tag state
//! machine needs against the backing store: re-reading a product's current
//! tag list and persisting a full replacement list. The search-cluster
//! client implements it for production; [`MemoryStore`] backs the tests.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Backing store for product tag lists.
///
/// The tag update is a read-modify-write, not compare-and-swap: callers
/// running concurrently against the same product need external mutual
/// exclusion per AOI to preserve the single-state-tag invariant.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fetch the product's current tag list from the backing store.
    async fn fetch_tags(&self, index: &str, id: &str) -> Result<Vec<String>>;

    /// Persist the full tag list (not a delta) for the product.
    async fn put_tags(&self, index: &str, id: &str, tags: &[String]) -> Result<()>;
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: &str, id: &str, tags: &[String]) {
        self.docs
            .write()
            .unwrap()
            .insert((index.to_string(), id.to_string()), tags.to_vec());
    }

    pub fn tags(&self, index: &str, id: &str) -> Option<Vec<String>> {
        self.docs
            .read()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn fetch_tags(&self, index: &str, id: &str) -> Result<Vec<String>> {
        self.docs
            .read()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no such product: {index}/{id}"))
    }

    async fn put_tags(&self, index: &str, id: &str, tags: &[String]) -> Result<()> {
        self.docs
            .write()
            .unwrap()
            .insert((index.to_string(), id.to_string()), tags.to_vec());
        Ok(())
    }
}
