//! Vector index: persistent storage of embedded chunks plus k-NN search.
//!
//! Two implementations share the [`VectorIndex`] trait:
//! - [`SqliteIndex`]: `index.sqlite` inside `index.dir`, survives restarts.
//! - [`InMemoryIndex`]: a `HashMap` behind a lock, for tests and embedding.
//!
//! Search is brute force: every stored vector is compared against the query
//! with the index's [`Metric`]. Results are ordered nearest first, with ties
//! broken by id so the ranking is deterministic.
//!
//! Every index records the [`IndexSpec`] it was created with. Vectors from
//! different embedding strategies are never mixed in one index.

mod memory;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::embedding::{cosine_similarity, squared_l2};
use crate::models::{IndexEntry, SearchHit};

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;

/// Distance function used for ranking. Lower is nearer for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine_similarity`.
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Metric::L2 => squared_l2(a, b),
            Metric::Cosine => 1.0 - cosine_similarity(a, b) as f64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Cosine => "cosine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "l2" => Some(Metric::L2),
            "cosine" => Some(Metric::Cosine),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub model: String,
    pub dims: usize,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn new(model: impl Into<String>, dims: usize, metric: Metric) -> Self {
        Self {
            model: model.into(),
            dims,
            metric,
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} dims, {})", self.model, self.dims, self.metric)
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn spec(&self) -> &IndexSpec;

    /// Insert or replace the entry with the same id.
    async fn upsert(&self, entry: IndexEntry) -> Result<()>;

    /// Remove every entry whose metadata filename is `filename`. Returns the
    /// number removed.
    async fn delete_by_filename(&self, filename: &str) -> Result<usize>;

    /// Swap every entry of `filename` for `entries` in one step. Either all
    /// of `entries` are stored and the old ones gone, or nothing changes.
    /// Returns the number of entries removed.
    async fn replace_file(&self, filename: &str, entries: Vec<IndexEntry>) -> Result<usize>;

    /// Up to `k` entries, nearest first. An empty index yields an empty list.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Make all prior upserts durable.
    async fn flush(&self) -> Result<()>;

    async fn count(&self) -> Result<usize>;

    /// Stored entries ordered by filename, then chunk index.
    async fn entries(&self, limit: usize) -> Result<Vec<IndexEntry>>;
}

pub(crate) fn check_dims(spec: &IndexSpec, vector: &[f32]) -> Result<()> {
    if vector.len() != spec.dims {
        anyhow::bail!(
            "vector has {} dimensions, index {} expects {}",
            vector.len(),
            spec.model,
            spec.dims
        );
    }
    Ok(())
}

/// Score `entries` against `query` and keep the `k` nearest.
pub(crate) fn rank<'a>(
    entries: impl IntoIterator<Item = &'a IndexEntry>,
    query: &[f32],
    k: usize,
    metric: Metric,
) -> Vec<SearchHit> {
    let mut scored: Vec<(f64, &IndexEntry)> = entries
        .into_iter()
        .map(|e| (metric.distance(query, &e.vector), e))
        .collect();

    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(distance, e)| SearchHit {
            id: e.id.clone(),
            document: e.document.clone(),
            metadata: e.metadata.clone(),
            distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            document: format!("text of {}", id),
            metadata: ChunkMetadata {
                filename: "f.pdf".to_string(),
                chunk: 0,
            },
        }
    }

    #[test]
    fn rank_orders_nearest_first() {
        let entries = vec![
            entry("far", vec![10.0, 10.0]),
            entry("near", vec![1.0, 1.0]),
            entry("exact", vec![0.0, 0.0]),
        ];
        let hits = rank(&entries, &[0.0, 0.0], 2, Metric::L2);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 2.0);
    }

    #[test]
    fn rank_breaks_ties_by_id() {
        let entries = vec![entry("b", vec![1.0]), entry("a", vec![1.0])];
        let hits = rank(&entries, &[0.0], 5, Metric::L2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");
    }

    #[test]
    fn cosine_metric_ignores_magnitude() {
        let entries = vec![entry("scaled", vec![10.0, 0.0]), entry("other", vec![0.0, 1.0])];
        let hits = rank(&entries, &[1.0, 0.0], 1, Metric::Cosine);
        assert_eq!(hits[0].id, "scaled");
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn metric_names_round_trip() {
        for m in [Metric::L2, Metric::Cosine] {
            assert_eq!(Metric::parse(m.as_str()), Some(m));
        }
        assert_eq!(Metric::parse("ip"), None);
    }
}
