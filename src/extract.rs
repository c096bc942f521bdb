//! Text extraction for PDFs and raster images.
//!
//! PDFs are parsed page by page with `pdf-extract`. A page without an
//! embedded text layer is rasterized and OCR'd when an [`OcrEngine`] is
//! configured; if that fails too, the page contributes empty text. Images
//! are OCR'd whole and never fail: any OCR problem yields empty text.
//!
//! Errors are returned, not raised. The ingestion pipeline turns every
//! [`ExtractError`] into a skipped file.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Document, DocumentKind, ExtractedText};
use crate::ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts one document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, doc: &Document) -> Result<ExtractedText, ExtractError>;
}

/// The stock extractor: `pdf-extract` for PDFs, optional OCR for images and
/// text-less pages.
pub struct DocumentExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    max_file_bytes: u64,
    pdf_page_ocr: bool,
}

impl DocumentExtractor {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, max_file_bytes: u64) -> Self {
        Self {
            ocr,
            max_file_bytes,
            pdf_page_ocr: true,
        }
    }

    /// Whether text-less PDF pages are sent to OCR (default on). Images are
    /// always OCR'd when an engine is present.
    pub fn pdf_page_ocr(mut self, enabled: bool) -> Self {
        self.pdf_page_ocr = enabled;
        self
    }

    async fn extract_pdf(&self, doc: &Document) -> Result<ExtractedText, ExtractError> {
        let bytes = tokio::fs::read(&doc.path).await?;

        // pdf-extract can panic on malformed input; a panic surfaces as a
        // join error and is reported like any other parse failure.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| ExtractError::Pdf(format!("parser aborted: {}", e)))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

        let mut segments = Vec::with_capacity(pages.len());
        for (idx, page_text) in pages.into_iter().enumerate() {
            if !page_text.trim().is_empty() {
                segments.push(page_text);
                continue;
            }
            let page_no = idx + 1;
            let recovered = match self.ocr.as_ref().filter(|_| self.pdf_page_ocr) {
                Some(ocr) => match ocr.ocr_pdf_page(&doc.path, page_no).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(
                            file = %doc.filename,
                            page = page_no,
                            error = %e,
                            "page OCR failed"
                        );
                        String::new()
                    }
                },
                None => String::new(),
            };
            segments.push(recovered);
        }

        Ok(ExtractedText { segments })
    }

    async fn extract_image(&self, doc: &Document) -> ExtractedText {
        let Some(ocr) = &self.ocr else {
            tracing::debug!(file = %doc.filename, "OCR disabled, image has no text");
            return ExtractedText::single(String::new());
        };
        match ocr.ocr_image(&doc.path).await {
            Ok(text) => ExtractedText::single(text),
            Err(e) => {
                tracing::warn!(file = %doc.filename, error = %e, "image OCR failed");
                ExtractedText::single(String::new())
            }
        }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, doc: &Document) -> Result<ExtractedText, ExtractError> {
        if doc.kind == DocumentKind::Unsupported {
            return Err(ExtractError::Unsupported(doc.filename.clone()));
        }

        let size = tokio::fs::metadata(&doc.path).await?.len();
        if size > self.max_file_bytes {
            return Err(ExtractError::TooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }

        match doc.kind {
            DocumentKind::Pdf => self.extract_pdf(doc).await,
            DocumentKind::Image => Ok(self.extract_image(doc).await),
            DocumentKind::Unsupported => Err(ExtractError::Unsupported(doc.filename.clone())),
        }
    }
}
