//! Core data models used throughout doc-harness.
//!
//! These types represent the documents, chunks, index entries and results
//! that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a source file is handled, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
    Unsupported,
}

impl DocumentKind {
    /// Classify a filename by its lower-cased extension.
    ///
    /// `.pdf` is a PDF; `.png`, `.jpg` and `.jpeg` are images; everything
    /// else (including files without an extension) is unsupported.
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("png") | Some("jpg") | Some("jpeg") => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// A single file found in the source directory.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub kind: DocumentKind,
    pub path: PathBuf,
}

impl Document {
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            kind: DocumentKind::from_filename(&filename),
            filename,
            path: path.to_path_buf(),
        }
    }
}

/// Plain text extracted from one document, one segment per PDF page
/// (or a single segment for an image).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub segments: Vec<String>,
}

impl ExtractedText {
    pub fn single(text: String) -> Self {
        Self {
            segments: vec![text],
        }
    }

    /// All segments joined with newlines, in order.
    pub fn text(&self) -> String {
        self.segments.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.trim().is_empty())
    }
}

/// A run of at most `chunk_size` words from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `"{filename}_chunk{index}"`.
    pub id: String,
    pub filename: String,
    pub chunk_index: usize,
    pub text: String,
}

/// Metadata stored alongside every index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk: usize,
}

/// The persisted unit of the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            document: chunk.text.clone(),
            metadata: ChunkMetadata {
                filename: chunk.filename.clone(),
                chunk: chunk.chunk_index,
            },
        }
    }
}

/// A ranked query result. Lower `distance` is nearer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

/// A supported file that contributed no chunks, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub skipped: usize,
    /// Files with an unsupported extension; never read.
    pub ignored: usize,
    pub chunks_written: usize,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Retrieved chunks summarized by the language model.
    Summary,
    /// Retrieved chunk texts concatenated in rank order.
    Retrieved,
    NoResults,
    /// The query could not be embedded or the index could not be searched.
    Degraded,
}

impl AnswerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerKind::Summary => "summary",
            AnswerKind::Retrieved => "retrieved",
            AnswerKind::NoResults => "no_results",
            AnswerKind::Degraded => "degraded",
        }
    }
}

/// A retrieval answer plus the hits that back it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
    pub sources: Vec<SearchHit>,
}
