//! Question answering over the vector index.
//!
//! `answer` embeds the query with the index's own provider, fetches the
//! `top_k` nearest chunks and turns them into an [`Answer`]:
//!
//! | Situation | Kind | Text |
//! |-----------|------|------|
//! | query embedding failed | `degraded` | [`EMBEDDING_UNAVAILABLE`] |
//! | index search failed | `degraded` | [`INDEX_UNAVAILABLE`] |
//! | no hits | `no_results` | [`NO_RESULTS`] |
//! | summarizer succeeded | `summary` | model output |
//! | otherwise | `retrieved` | hit texts joined by a blank line |
//!
//! Only an empty query is an error.

use std::sync::Arc;
use thiserror::Error;

use crate::embedding::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::models::{Answer, AnswerKind, SearchHit};
use crate::summarize::{build_prompt, Summarizer, SummaryRequest};

pub const NO_RESULTS: &str = "Sorry, I found no results in the documents.";
pub const INDEX_UNAVAILABLE: &str = "Offline: Unable to search the vector DB.";
pub const EMBEDDING_UNAVAILABLE: &str = "Offline: Unable to embed the question.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("query must not be empty")]
    EmptyQuery,
}

pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    summarizer: Option<Arc<dyn Summarizer>>,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        summarizer: Option<Arc<dyn Summarizer>>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            index,
            summarizer,
            top_k: top_k.max(1),
        }
    }

    pub async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        self.answer_with_k(query, self.top_k).await
    }

    /// Like [`answer`](Self::answer) with a per-call result count.
    pub async fn answer_with_k(&self, query: &str, k: usize) -> Result<Answer, AnswerError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AnswerError::EmptyQuery);
        }

        let vector = match self.provider.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed");
                return Ok(degraded(EMBEDDING_UNAVAILABLE));
            }
        };

        let hits = match self.index.query(&vector, k.max(1)).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "index query failed");
                return Ok(degraded(INDEX_UNAVAILABLE));
            }
        };

        if hits.is_empty() {
            return Ok(Answer {
                text: NO_RESULTS.to_string(),
                kind: AnswerKind::NoResults,
                sources: Vec::new(),
            });
        }

        if let Some(summarizer) = &self.summarizer {
            let request = SummaryRequest {
                model: summarizer.model().to_string(),
                prompt: build_prompt(query, &hits),
            };
            match summarizer.summarize(request).await {
                Ok(text) => {
                    return Ok(Answer {
                        text,
                        kind: AnswerKind::Summary,
                        sources: hits,
                    })
                }
                Err(e) => {
                    tracing::warn!(error = %e, "summarization failed, returning raw excerpts");
                }
            }
        }

        Ok(Answer {
            text: concatenate(&hits),
            kind: AnswerKind::Retrieved,
            sources: hits,
        })
    }
}

fn concatenate(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.document.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn degraded(text: &str) -> Answer {
    Answer {
        text: text.to_string(),
        kind: AnswerKind::Degraded,
        sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbedError, OfflineHashProvider, OFFLINE_DIMS, OFFLINE_MODEL};
    use crate::index::{InMemoryIndex, IndexSpec, Metric};
    use crate::models::{ChunkMetadata, IndexEntry};
    use crate::summarize::SummarizeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            OFFLINE_MODEL
        }
        fn dims(&self) -> usize {
            OFFLINE_DIMS
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbedError::Request("down".into()));
            }
            Ok(crate::embedding::offline_embedding(text))
        }
    }

    struct FixedSummarizer(Option<&'static str>);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        fn model(&self) -> &str {
            "stub"
        }
        async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizeError> {
            assert!(request.prompt.contains("Question:"));
            self.0
                .map(str::to_string)
                .ok_or_else(|| SummarizeError::Unavailable("stub".into()))
        }
    }

    fn spec() -> IndexSpec {
        IndexSpec::new(OFFLINE_MODEL, OFFLINE_DIMS, Metric::L2)
    }

    async fn seeded_index(texts: &[&str]) -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::new(spec()));
        for (i, text) in texts.iter().enumerate() {
            index
                .upsert(IndexEntry {
                    id: format!("doc.pdf_chunk{}", i),
                    vector: crate::embedding::offline_embedding(text),
                    document: text.to_string(),
                    metadata: ChunkMetadata {
                        filename: "doc.pdf".into(),
                        chunk: i,
                    },
                })
                .await
                .unwrap();
        }
        index
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_embedding() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let service = RetrievalService::new(provider.clone(), seeded_index(&[]).await, None, 3);

        assert_eq!(service.answer("").await.unwrap_err(), AnswerError::EmptyQuery);
        assert_eq!(service.answer("  \n\t").await.unwrap_err(), AnswerError::EmptyQuery);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_index_gives_no_results() {
        let service =
            RetrievalService::new(Arc::new(OfflineHashProvider), seeded_index(&[]).await, None, 3);
        let answer = service.answer("anything").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::NoResults);
        assert_eq!(answer.text, NO_RESULTS);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn exact_text_is_the_top_hit() {
        let index = seeded_index(&["alpha beta", "gamma delta", "epsilon"]).await;
        let service = RetrievalService::new(Arc::new(OfflineHashProvider), index, None, 1);
        let answer = service.answer("gamma delta").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Retrieved);
        assert_eq!(answer.text, "gamma delta");
        assert_eq!(answer.sources[0].distance, 0.0);
    }

    #[tokio::test]
    async fn hits_are_joined_in_rank_order() {
        let index = seeded_index(&["one", "two", "three", "four"]).await;
        let service = RetrievalService::new(Arc::new(OfflineHashProvider), index, None, 3);
        let answer = service.answer("two").await.unwrap();
        assert_eq!(answer.sources.len(), 3);
        assert_eq!(answer.sources[0].document, "two");
        let expected: Vec<&str> = answer.sources.iter().map(|h| h.document.as_str()).collect();
        assert_eq!(answer.text, expected.join("\n\n"));
    }

    #[tokio::test]
    async fn embedding_failure_is_degraded() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let service = RetrievalService::new(provider, seeded_index(&["x"]).await, None, 3);
        let answer = service.answer("question").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Degraded);
        assert_eq!(answer.text, EMBEDDING_UNAVAILABLE);
    }

    #[tokio::test]
    async fn index_failure_is_degraded() {
        // Index expects 4 dims, provider yields 16: the query is rejected.
        let index = Arc::new(InMemoryIndex::new(IndexSpec::new("other", 4, Metric::L2)));
        let service = RetrievalService::new(Arc::new(OfflineHashProvider), index, None, 3);
        let answer = service.answer("question").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Degraded);
        assert_eq!(answer.text, INDEX_UNAVAILABLE);
    }

    #[tokio::test]
    async fn summarizer_output_is_used() {
        let index = seeded_index(&["some text"]).await;
        let service = RetrievalService::new(
            Arc::new(OfflineHashProvider),
            index,
            Some(Arc::new(FixedSummarizer(Some("short answer")))),
            3,
        );
        let answer = service.answer("some text").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Summary);
        assert_eq!(answer.text, "short answer");
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn summarizer_failure_falls_back_to_excerpts() {
        let index = seeded_index(&["first", "second"]).await;
        let service = RetrievalService::new(
            Arc::new(OfflineHashProvider),
            index,
            Some(Arc::new(FixedSummarizer(None))),
            2,
        );
        let answer = service.answer("first").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Retrieved);
        assert_eq!(answer.text, "first\n\nsecond");
    }
}
