//! Ingestion pipeline orchestration.
//!
//! Scans the source directory (non-recursively, in filename order) and runs
//! each supported file through extract → chunk → embed → store:
//!
//! - Unsupported extensions are counted as `ignored` and never opened.
//! - Extraction errors, blank text and embedding failures count the file as
//!   `skipped`; nothing is written for it and its previous entries stay.
//! - A processed file first loses all its old entries, then gets its fresh
//!   chunks upserted as `{filename}_chunk{n}`. Re-ingesting a file that got
//!   shorter therefore leaves no stale higher-numbered chunks behind.
//! - The index is flushed once after all files.
//!
//! Per-file problems never abort a run; only a source directory that cannot
//! be listed or an index write failure does.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::chunk::build_chunks;
use crate::embedding::EmbeddingProvider;
use crate::extract::TextExtractor;
use crate::index::VectorIndex;
use crate::models::{Document, DocumentKind, IndexEntry, IngestReport, SkippedFile};

enum FileOutcome {
    Written(usize),
    Skipped(String),
}

pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunk_size: usize,
    images: bool,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunk_size: usize,
    ) -> Self {
        Self {
            extractor,
            provider,
            index,
            chunk_size,
            images: true,
        }
    }

    /// Whether image files are ingested (default on). When off they are
    /// counted as ignored, like any unsupported file.
    pub fn images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    fn is_supported(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Pdf => true,
            DocumentKind::Image => self.images,
            DocumentKind::Unsupported => false,
        }
    }

    pub async fn ingest(&self, source_dir: &Path) -> Result<IngestReport> {
        let spec = self.index.spec();
        if spec.model != self.provider.model_name() || spec.dims != self.provider.dims() {
            bail!(
                "Embedding provider {} ({} dims) does not match index {}",
                self.provider.model_name(),
                self.provider.dims(),
                spec
            );
        }

        let documents = list_documents(source_dir)?;
        tracing::info!(
            dir = %source_dir.display(),
            files = documents.len(),
            "ingestion started"
        );

        let mut report = IngestReport::default();

        for doc in &documents {
            if !self.is_supported(doc.kind) {
                tracing::debug!(file = %doc.filename, "ignoring unsupported file");
                report.ignored += 1;
                continue;
            }

            match self.ingest_file(doc).await? {
                FileOutcome::Written(chunks) => {
                    tracing::info!(file = %doc.filename, chunks, "processed");
                    report.processed += 1;
                    report.chunks_written += chunks;
                }
                FileOutcome::Skipped(reason) => {
                    tracing::warn!(file = %doc.filename, reason = %reason, "skipped");
                    report.skipped += 1;
                    report.skipped_files.push(SkippedFile {
                        filename: doc.filename.clone(),
                        reason,
                    });
                }
            }
        }

        self.index.flush().await.context("Failed to flush index")?;

        tracing::info!(
            processed = report.processed,
            skipped = report.skipped,
            ignored = report.ignored,
            chunks = report.chunks_written,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_file(&self, doc: &Document) -> Result<FileOutcome> {
        let text = match self.extractor.extract(doc).await {
            Ok(text) => text,
            Err(e) => return Ok(FileOutcome::Skipped(e.to_string())),
        };
        if text.is_blank() {
            return Ok(FileOutcome::Skipped("no extractable text".to_string()));
        }

        let chunks = build_chunks(&doc.filename, &text.text(), self.chunk_size);

        // Embed everything before touching the index so a failure part way
        // through leaves the file's previous entries intact.
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match self.provider.embed(&chunk.text).await {
                Ok(vector) => entries.push(IndexEntry::from_chunk(chunk, vector)),
                Err(e) => {
                    return Ok(FileOutcome::Skipped(format!(
                        "embedding chunk {} failed: {}",
                        chunk.chunk_index, e
                    )))
                }
            }
        }

        let written = entries.len();
        let removed = self
            .index
            .replace_file(&doc.filename, entries)
            .await
            .with_context(|| format!("Failed to write entries for {}", doc.filename))?;
        if removed > 0 {
            tracing::debug!(file = %doc.filename, removed, "replaced previous entries");
        }

        Ok(FileOutcome::Written(written))
    }
}

/// Regular files directly inside `dir`, sorted by filename.
pub fn list_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        bail!("Source directory does not exist: {}", dir.display());
    }

    let mut documents = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to list source directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        documents.push(Document::from_path(entry.path()));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_only_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.pdf"), b"x").unwrap();

        let docs = list_documents(dir.path()).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.png", "notes.txt"]);
        assert_eq!(docs[2].kind, DocumentKind::Unsupported);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_documents(&dir.path().join("absent")).is_err());
    }
}
