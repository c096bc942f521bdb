//! Wiring: builds the concrete components named by a [`Config`].

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::extract::{DocumentExtractor, TextExtractor};
use crate::index::{IndexSpec, SqliteIndex, VectorIndex};
use crate::ingest::IngestionPipeline;
use crate::models::{Answer, IngestReport};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::retrieval::{AnswerError, RetrievalService};
use crate::summarize::create_summarizer;

/// One opened index plus everything needed to ingest into and answer from it.
pub struct App {
    pub config: Config,
    pub index: Arc<dyn VectorIndex>,
    pipeline: IngestionPipeline,
    retrieval: RetrievalService,
}

impl App {
    pub async fn open(config: Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        let spec = IndexSpec::new(provider.model_name(), provider.dims(), config.index.metric);
        let index: Arc<dyn VectorIndex> =
            Arc::new(SqliteIndex::open(&config.index.dir, spec).await?);

        let extractor = build_extractor(&config);
        let summarizer = create_summarizer(&config.summarization)?;

        Ok(Self {
            pipeline: IngestionPipeline::new(
                extractor,
                provider.clone(),
                index.clone(),
                config.chunking.chunk_size,
            )
            .images(config.extraction.images),
            retrieval: RetrievalService::new(
                provider,
                index.clone(),
                summarizer,
                config.retrieval.top_k,
            ),
            index,
            config,
        })
    }

    /// Ingest the configured source directory.
    pub async fn ingest(&self) -> Result<IngestReport> {
        self.pipeline.ingest(&self.config.paths.source_dir).await
    }

    pub async fn ingest_dir(&self, dir: &std::path::Path) -> Result<IngestReport> {
        self.pipeline.ingest(dir).await
    }

    pub async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        self.retrieval.answer(query).await
    }

    pub async fn answer_with_k(&self, query: &str, k: usize) -> Result<Answer, AnswerError> {
        self.retrieval.answer_with_k(query, k).await
    }
}

fn build_extractor(config: &Config) -> Arc<dyn TextExtractor> {
    let ocr: Option<Arc<dyn OcrEngine>> = if config.extraction.ocr || config.extraction.images {
        Some(Arc::new(TesseractOcr::new(&config.extraction)))
    } else {
        None
    };
    Arc::new(
        DocumentExtractor::new(ocr, config.extraction.max_file_bytes)
            .pdf_page_ocr(config.extraction.ocr),
    )
}

/// Create the source and index directories and an empty index.
pub async fn init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.paths.source_dir).with_context(|| {
        format!(
            "Failed to create source directory {}",
            config.paths.source_dir.display()
        )
    })?;
    let app = App::open(config.clone()).await?;
    app.index.flush().await?;
    Ok(())
}
