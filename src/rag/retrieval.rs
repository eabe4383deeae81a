use crate::collection::Collection;
use crate::database::{ScoredPoint, VectorDb};
use crate::llm::EmbeddingClient;
use crate::providers::traits::CompletionProvider;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;

/// A retrieved unit of context with the section title it came from, so the
/// answer can cite it.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub title: String,
    pub text: String,
    pub score: f32,
}

/// Seam between the query engine and the vector store.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(
        &self,
        collection: Collection,
        question: &str,
        topic: &str,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Routes a query to the vector store collection matching its target and
/// assembles the retrieved chunks. For the clinical guidance collection a
/// condition term is extracted first and used as an exact payload filter,
/// falling back to plain semantic search when the filter matches nothing.
pub struct RetrievalRouter {
    db: VectorDb,
    embedder: EmbeddingClient,
    provider: Box<dyn CompletionProvider + Send + Sync>,
    limit: u64,
}

impl RetrievalRouter {
    pub fn new(
        db: VectorDb,
        embedder: EmbeddingClient,
        provider: Box<dyn CompletionProvider + Send + Sync>,
        limit: u64,
    ) -> Self {
        Self {
            db,
            embedder,
            provider,
            limit,
        }
    }

    async fn search_guidance(&self, question: &str, topic: &str) -> Result<Vec<ScoredPoint>> {
        let store = Collection::Middle.store_name();

        let prompt = format!(
            "Extract the disease or condition name from this question, using the exact term \
             as it appears in medical documents, such as '血压偏低' for low blood pressure: {}",
            question
        );
        let condition = match self.provider.complete(&prompt).await {
            Ok(reply) => clean_condition(&reply),
            Err(e) => {
                log::warn!("Condition extraction failed, searching unfiltered: {}", e);
                String::new()
            }
        };

        let topic_vector = self.embedder.embed(topic).await?;

        if condition.is_empty() {
            return Ok(self
                .db
                .search(store, topic_vector, self.limit, None)
                .await?);
        }

        log::info!("Filtering guidance search on condition '{}'", condition);
        let hits = self
            .db
            .search(
                store,
                topic_vector,
                self.limit,
                Some(("title", condition.as_str())),
            )
            .await?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        // Exact title match found nothing; retry as a semantic query
        log::info!(
            "No hits for exact title '{}', trying semantic fallback",
            condition
        );
        let condition_vector = self.embedder.embed(&condition).await?;
        Ok(self.db.search(store, condition_vector, 5, None).await?)
    }
}

#[async_trait]
impl ContextRetriever for RetrievalRouter {
    async fn retrieve(
        &self,
        collection: Collection,
        question: &str,
        topic: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        let mut hits = match collection {
            Collection::Middle => self.search_guidance(question, topic).await?,
            _ => {
                let topic_vector = self.embedder.embed(topic).await?;
                self.db
                    .search(collection.store_name(), topic_vector, self.limit, None)
                    .await?
            }
        };

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(self.limit as usize);

        for (i, hit) in hits.iter().enumerate() {
            log::info!("Doc {} (score: {:.3}, id: {})", i + 1, hit.score, hit.id);
        }

        Ok(hits.into_iter().map(to_chunk).collect())
    }
}

fn to_chunk(point: ScoredPoint) -> RetrievedChunk {
    let title = point
        .payload
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let text = point
        .payload
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    RetrievedChunk {
        title,
        text,
        score: point.score,
    }
}

/// Reduce a model reply to a bare condition term: strip everything that is
/// not a word character, and treat "none" as no condition.
pub fn clean_condition(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return String::new();
    }
    let non_word = Regex::new(r"\W").unwrap();
    non_word.replace_all(trimmed, "").to_string()
}

/// Join chunk texts into a prompt context, prefixing each with its section
/// title so the answer can cite it.
pub fn assemble_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            if chunk.title.is_empty() {
                chunk.text.clone()
            } else {
                format!("[{}] {}", chunk.title, chunk.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
