//! In-process [`VectorIndex`] for tests and embedding in other programs.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{check_dims, rank, IndexSpec, VectorIndex};
use crate::models::{IndexEntry, SearchHit};

/// Non-persistent index. `flush` is a no-op.
pub struct InMemoryIndex {
    spec: IndexSpec,
    entries: RwLock<HashMap<String, IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        check_dims(&self.spec, &entry.vector)?;
        self.entries.write().await.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.metadata.filename != filename);
        Ok(before - entries.len())
    }

    async fn replace_file(&self, filename: &str, entries: Vec<IndexEntry>) -> Result<usize> {
        for entry in &entries {
            check_dims(&self.spec, &entry.vector)?;
        }
        let mut stored = self.entries.write().await;
        let before = stored.len();
        stored.retain(|_, e| e.metadata.filename != filename);
        let removed = before - stored.len();
        for entry in entries {
            stored.insert(entry.id.clone(), entry);
        }
        Ok(removed)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        check_dims(&self.spec, vector)?;
        let entries = self.entries.read().await;
        Ok(rank(entries.values(), vector, k, self.spec.metric))
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn entries(&self, limit: usize) -> Result<Vec<IndexEntry>> {
        let entries = self.entries.read().await;
        let mut all: Vec<IndexEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| {
            a.metadata
                .filename
                .cmp(&b.metadata.filename)
                .then(a.metadata.chunk.cmp(&b.metadata.chunk))
        });
        all.truncate(limit);
        Ok(all)
    }
}
