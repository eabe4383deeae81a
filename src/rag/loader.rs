use crate::collection::Collection;
use crate::database::{VectorDb, VectorPoint};
use crate::document::pipeline::{ProcessedPiece, QuestionnaireDoc, RecordsDoc};
use crate::document::PostBlock;
use crate::llm::EmbeddingClient;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;

/// A retrieval unit before it is embedded: the text to index plus the
/// metadata stored alongside it.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub text: String,
    pub payload: HashMap<String, serde_json::Value>,
}

impl IndexedChunk {
    fn new(text: String, collection: Collection, content_type: &str) -> Self {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), serde_json::json!(text.clone()));
        payload.insert(
            "source".to_string(),
            serde_json::json!(collection.file_stem()),
        );
        payload.insert("content_type".to_string(), serde_json::json!(content_type));
        Self { text, payload }
    }

    fn with(mut self, key: &str, value: serde_json::Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }
}

/// Reads a collection's derived JSON file and rebuilds its vector store
/// collection from scratch: recreate, embed, upsert. Because the collection
/// is dropped first, a reload fully replaces prior indexed content.
pub struct IndexLoader {
    db: VectorDb,
    embedder: EmbeddingClient,
    data_dir: PathBuf,
}

impl IndexLoader {
    pub fn new(db: VectorDb, embedder: EmbeddingClient, data_dir: PathBuf) -> Self {
        Self {
            db,
            embedder,
            data_dir,
        }
    }

    /// Returns the number of chunks indexed. A missing JSON file is not an
    /// error; it means nothing has been uploaded yet.
    pub async fn reload(&self, collection: Collection) -> Result<usize> {
        let path = self
            .data_dir
            .join(collection.file_stem())
            .with_extension("json");

        if !path.exists() {
            log::warn!("JSON file not found: {}, nothing to load", path.display());
            return Ok(0);
        }

        log::info!("Loading JSON data from {}", path.display());
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let chunks = match collection {
            Collection::Pre => {
                let doc: QuestionnaireDoc = serde_json::from_str(&raw)?;
                build_pre_chunks(&doc)
            }
            Collection::Middle => {
                let pieces: Vec<ProcessedPiece> = serde_json::from_str(&raw)?;
                build_middle_chunks(&pieces)
            }
            Collection::Post => {
                let doc: RecordsDoc = serde_json::from_str(&raw)?;
                build_post_chunks(&doc)
            }
        };
        log::info!(
            "Created {} chunks for collection {}",
            chunks.len(),
            collection
        );

        // Embed before touching the store so an embedding failure leaves
        // the old index intact
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        self.db
            .recreate_collection(collection.store_name(), self.embedder.dim())
            .await?;

        let indexed_at = Utc::now().to_rfc3339();
        let points: Vec<VectorPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut payload = chunk.payload;
                payload.insert("indexed_at".to_string(), serde_json::json!(indexed_at));
                VectorPoint { vector, payload }
            })
            .collect();

        let count = self.db.store_points(collection.store_name(), points).await?;
        log::info!(
            "Loaded {} chunks into collection {}",
            count,
            collection.store_name()
        );
        Ok(count)
    }
}

pub fn build_pre_chunks(doc: &QuestionnaireDoc) -> Vec<IndexedChunk> {
    doc.questions
        .iter()
        .map(|q| {
            let options = q
                .options
                .as_ref()
                .map(|o| o.join(", "))
                .unwrap_or_default();
            let text = format!(
                "Question: {}\nType: {}\nOptions: [{}]",
                q.question, q.question_type, options
            );
            IndexedChunk::new(text, Collection::Pre, "question")
                .with("question", serde_json::json!(q.question))
        })
        .collect()
}

pub fn build_middle_chunks(pieces: &[ProcessedPiece]) -> Vec<IndexedChunk> {
    let mut chunks = Vec::new();

    for piece in pieces {
        let record = &piece.record;

        // Document-level summary chunk
        let mut summary_parts = vec![format!("主题: {}", record.title)];
        if !record.description.is_empty() {
            summary_parts.push(record.description.clone());
        }
        if !record.key_points.is_empty() {
            summary_parts.push(format!("要点: {}", record.key_points.join("；")));
        }
        chunks.push(
            IndexedChunk::new(summary_parts.join("\n"), Collection::Middle, "summary")
                .with("piece_id", serde_json::json!(piece.piece_id))
                .with("title", serde_json::json!(record.title))
                .with(
                    "record_type",
                    serde_json::json!(record.record_type.as_str()),
                ),
        );

        // One chunk per section, with presence flags for filtering
        for section in &record.sections {
            let mut parts = vec![format!("章节: {}", section.title)];
            if !section.description.is_empty() {
                parts.push(section.description.clone());
            }
            if !section.symptoms.is_empty() {
                parts.push(format!("症状: {}", section.symptoms.join("、")));
            }
            if !section.key_points.is_empty() {
                parts.push(format!("要点: {}", section.key_points.join("；")));
            }
            if !section.recommendations.is_empty() {
                parts.push(format!("建议: {}", section.recommendations.join("；")));
            }

            chunks.push(
                IndexedChunk::new(parts.join("\n"), Collection::Middle, "section")
                    .with("piece_id", serde_json::json!(piece.piece_id))
                    .with("title", serde_json::json!(section.title))
                    .with(
                        "has_diagnostic_criteria",
                        serde_json::json!(section.has_diagnostic_criteria()),
                    )
                    .with("has_symptoms", serde_json::json!(section.has_symptoms()))
                    .with(
                        "has_measurement",
                        serde_json::json!(section.has_measurement()),
                    ),
            );
        }
    }

    chunks
}

pub fn build_post_chunks(doc: &RecordsDoc) -> Vec<IndexedChunk> {
    let mut chunks = Vec::new();

    for block in &doc.content {
        match block {
            PostBlock::Table(rows) => {
                for row in rows {
                    let text = serde_json::to_string(row).unwrap_or_default();
                    chunks.push(IndexedChunk::new(text, Collection::Post, "table"));
                }
            }
            PostBlock::Text(text) => {
                chunks.push(IndexedChunk::new(text.clone(), Collection::Post, "text"));
            }
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::chunker::Question;
    use crate::extract::{RecordSection, RecordType, StructuredRecord};
    use serde_json::json;

    fn guidance_piece() -> ProcessedPiece {
        ProcessedPiece {
            piece_id: 1,
            title: "血压异常".to_string(),
            structure_type: "section".to_string(),
            record: StructuredRecord {
                record_type: RecordType::MedicalGuide,
                title: "血压管理".to_string(),
                description: "血压异常的处理".to_string(),
                sections: vec![
                    RecordSection {
                        title: "低血压".to_string(),
                        symptoms: vec!["头晕".to_string()],
                        diagnostic_criteria: serde_json::from_value(
                            json!({"threshold": "<90/60mmHg"}),
                        )
                        .unwrap(),
                        ..Default::default()
                    },
                    RecordSection {
                        title: "高血压".to_string(),
                        recommendations: vec!["低盐饮食".to_string()],
                        ..Default::default()
                    },
                ],
                key_points: vec!["诊断需要多次测量".to_string()],
                relationships: vec![],
            },
        }
    }

    #[test]
    fn test_pre_chunks_carry_question_metadata() {
        let doc = QuestionnaireDoc {
            questions: vec![Question {
                question: "您的性别".to_string(),
                question_type: "multiple_choice".to_string(),
                options: Some(vec!["男".to_string(), "女".to_string()]),
            }],
        };
        let chunks = build_pre_chunks(&doc);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Question: 您的性别"));
        assert!(chunks[0].text.contains("男, 女"));
        assert_eq!(chunks[0].payload["source"], "pre");
        assert_eq!(chunks[0].payload["content_type"], "question");
        assert_eq!(chunks[0].payload["question"], "您的性别");
    }

    #[test]
    fn test_middle_chunks_summary_plus_sections() {
        let chunks = build_middle_chunks(&[guidance_piece()]);
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].payload["content_type"], "summary");
        assert_eq!(chunks[0].payload["title"], "血压管理");
        assert!(chunks[0].text.contains("诊断需要多次测量"));

        assert_eq!(chunks[1].payload["content_type"], "section");
        assert_eq!(chunks[1].payload["title"], "低血压");
        assert_eq!(chunks[1].payload["has_diagnostic_criteria"], true);
        assert_eq!(chunks[1].payload["has_symptoms"], true);
        assert_eq!(chunks[1].payload["has_measurement"], false);
        assert!(chunks[1].text.contains("症状: 头晕"));

        assert_eq!(chunks[2].payload["has_diagnostic_criteria"], false);
        assert!(chunks[2].text.contains("建议: 低盐饮食"));
    }

    #[test]
    fn test_post_chunks_from_tables_and_text() {
        let doc = RecordsDoc {
            content: vec![
                PostBlock::Table(vec![serde_json::from_value(json!({"姓名": "张三"})).unwrap()]),
                PostBlock::Text("随访建议。".to_string()),
            ],
        };
        let chunks = build_post_chunks(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].payload["content_type"], "table");
        assert!(chunks[0].text.contains("张三"));
        assert_eq!(chunks[1].payload["content_type"], "text");
    }

    #[test]
    fn test_empty_inputs_yield_no_chunks() {
        assert!(build_pre_chunks(&QuestionnaireDoc { questions: vec![] }).is_empty());
        assert!(build_middle_chunks(&[]).is_empty());
        assert!(build_post_chunks(&RecordsDoc { content: vec![] }).is_empty());
    }
}
