//! SQLite-backed [`VectorIndex`].
//!
//! Layout: `{index.dir}/index.sqlite` with an `entries` table (one row per
//! chunk, vector as a little-endian `f32` BLOB) and a single-row
//! `index_meta` table recording the [`IndexSpec`]. Opening an existing
//! index with a different model, dims or metric is an error; rebuild it
//! into a fresh directory instead.
//!
//! [`VectorIndex::replace_file`] runs its delete and inserts in one
//! transaction, so readers see either the old chunks of a file or the new
//! ones.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::{check_dims, rank, IndexSpec, Metric, VectorIndex};
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{ChunkMetadata, IndexEntry, SearchHit};
use crate::{db, migrate};

pub struct SqliteIndex {
    pool: SqlitePool,
    spec: IndexSpec,
}

impl SqliteIndex {
    /// Open or create the index in `dir`.
    pub async fn open(dir: &Path, spec: IndexSpec) -> Result<Self> {
        let pool = db::connect(dir)
            .await
            .with_context(|| format!("Failed to open index at {}", dir.display()))?;
        migrate::run_migrations(&pool).await?;

        let existing = sqlx::query("SELECT model, dims, metric FROM index_meta WHERE id = 1")
            .fetch_optional(&pool)
            .await?;

        match existing {
            Some(row) => {
                let metric: String = row.get("metric");
                let stored = IndexSpec {
                    model: row.get("model"),
                    dims: row.get::<i64, _>("dims") as usize,
                    metric: Metric::parse(&metric)
                        .with_context(|| format!("Unknown metric in index: {}", metric))?,
                };
                if stored != spec {
                    pool.close().await;
                    bail!(
                        "Index at {} was built with {}, but the current configuration uses {}. \
                         Use a different index.dir or delete the existing index.",
                        dir.display(),
                        stored,
                        spec
                    );
                }
            }
            None => {
                sqlx::query(
                    "INSERT INTO index_meta (id, model, dims, metric, created_at) VALUES (1, ?, ?, ?, ?)",
                )
                .bind(&spec.model)
                .bind(spec.dims as i64)
                .bind(spec.metric.as_str())
                .bind(chrono::Utc::now().timestamp())
                .execute(&pool)
                .await?;
                tracing::info!(dir = %dir.display(), spec = %spec, "created new index");
            }
        }

        Ok(Self { pool, spec })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_all(&self) -> Result<Vec<IndexEntry>> {
        let rows = sqlx::query("SELECT id, filename, chunk_index, document, embedding FROM entries")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }
}

const UPSERT_ENTRY: &str = r#"
    INSERT INTO entries (id, filename, chunk_index, document, embedding, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        filename = excluded.filename,
        chunk_index = excluded.chunk_index,
        document = excluded.document,
        embedding = excluded.embedding,
        updated_at = excluded.updated_at
"#;

fn bind_entry<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    entry: &'q IndexEntry,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&entry.id)
        .bind(&entry.metadata.filename)
        .bind(entry.metadata.chunk as i64)
        .bind(&entry.document)
        .bind(vec_to_blob(&entry.vector))
        .bind(chrono::Utc::now().timestamp())
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> IndexEntry {
    let blob: Vec<u8> = row.get("embedding");
    IndexEntry {
        id: row.get("id"),
        vector: blob_to_vec(&blob),
        document: row.get("document"),
        metadata: ChunkMetadata {
            filename: row.get("filename"),
            chunk: row.get::<i64, _>("chunk_index") as usize,
        },
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        check_dims(&self.spec, &entry.vector)?;
        bind_entry(sqlx::query(UPSERT_ENTRY), &entry)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM entries WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn replace_file(&self, filename: &str, entries: Vec<IndexEntry>) -> Result<usize> {
        for entry in &entries {
            check_dims(&self.spec, &entry.vector)?;
        }

        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM entries WHERE filename = ?")
            .bind(filename)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;

        for entry in &entries {
            bind_entry(sqlx::query(UPSERT_ENTRY), entry)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        check_dims(&self.spec, vector)?;
        let entries = self.load_all().await?;
        Ok(rank(&entries, vector, k, self.spec.metric))
    }

    async fn flush(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn entries(&self, limit: usize) -> Result<Vec<IndexEntry>> {
        let rows = sqlx::query(
            "SELECT id, filename, chunk_index, document, embedding FROM entries \
             ORDER BY filename, chunk_index LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> IndexSpec {
        IndexSpec::new("offline-sha256", 2, Metric::L2)
    }

    fn entry(filename: &str, chunk: usize, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: format!("{}_chunk{}", filename, chunk),
            vector,
            document: format!("{} #{}", filename, chunk),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                chunk,
            },
        }
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let index = SqliteIndex::open(dir.path(), spec()).await.unwrap();
        index.upsert(entry("a.pdf", 0, vec![1.0, 2.0])).await.unwrap();
        index.upsert(entry("a.pdf", 1, vec![3.0, 4.0])).await.unwrap();
        index.flush().await.unwrap();
        index.close().await;

        let reopened = SqliteIndex::open(dir.path(), spec()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);

        let hits = reopened.query(&[3.0, 4.0], 1).await.unwrap();
        assert_eq!(hits[0].id, "a.pdf_chunk1");
        assert_eq!(hits[0].metadata.chunk, 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn reopen_with_different_spec_fails() {
        let dir = tempfile::tempdir().unwrap();
        SqliteIndex::open(dir.path(), spec()).await.unwrap().close().await;

        let other = IndexSpec::new("text-embedding-3-small", 1536, Metric::L2);
        let err = SqliteIndex::open(dir.path(), other).await.err().unwrap();
        assert!(err.to_string().contains("was built with"));

        let cosine = IndexSpec::new("offline-sha256", 2, Metric::Cosine);
        assert!(SqliteIndex::open(dir.path(), cosine).await.is_err());
    }

    #[tokio::test]
    async fn upsert_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteIndex::open(dir.path(), spec()).await.unwrap();

        index.upsert(entry("a.pdf", 0, vec![0.0, 0.0])).await.unwrap();
        let mut replaced = entry("a.pdf", 0, vec![5.0, 5.0]);
        replaced.document = "replaced".to_string();
        index.upsert(replaced).await.unwrap();
        index.upsert(entry("b.png", 0, vec![1.0, 1.0])).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
        let listed = index.entries(10).await.unwrap();
        assert_eq!(listed[0].document, "replaced");
        assert_eq!(listed[0].vector, vec![5.0, 5.0]);

        assert_eq!(index.delete_by_filename("a.pdf").await.unwrap(), 1);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_file_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteIndex::open(dir.path(), spec()).await.unwrap();
        index.upsert(entry("a.pdf", 0, vec![0.0, 0.0])).await.unwrap();
        index.upsert(entry("a.pdf", 1, vec![0.0, 1.0])).await.unwrap();
        index.upsert(entry("b.png", 0, vec![1.0, 1.0])).await.unwrap();

        let bad = vec![
            entry("a.pdf", 0, vec![7.0, 7.0]),
            entry("a.pdf", 1, vec![7.0]),
        ];
        assert!(index.replace_file("a.pdf", bad).await.is_err());
        let kept = index.entries(10).await.unwrap();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].vector, vec![0.0, 0.0]);

        let removed = index
            .replace_file("a.pdf", vec![entry("a.pdf", 0, vec![7.0, 7.0])])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let ids: Vec<String> = index
            .entries(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a.pdf_chunk0", "b.png_chunk0"]);
    }

    #[tokio::test]
    async fn empty_index_query_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteIndex::open(dir.path(), spec()).await.unwrap();
        assert!(index.query(&[0.0, 0.0], 3).await.unwrap().is_empty());
        index.flush().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_wrong_dimensionality() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteIndex::open(dir.path(), spec()).await.unwrap();
        assert!(index.upsert(entry("a.pdf", 0, vec![1.0; 3])).await.is_err());
    }
}
