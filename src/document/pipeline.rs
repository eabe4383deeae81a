use crate::collection::Collection;
use crate::document::chunker::{self, MarkdownPiece, PostBlock, Question};
use crate::document::converter::convert_to_markdown;
use crate::extract::{SemanticExtractor, StructuredRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// One processed piece of a clinical guidance document, ready to index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPiece {
    pub piece_id: usize,
    pub title: String,
    pub structure_type: String,
    pub record: StructuredRecord,
}

/// Derived JSON for the questionnaire collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireDoc {
    pub questions: Vec<Question>,
}

/// Derived JSON for the medical records collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsDoc {
    pub content: Vec<PostBlock>,
}

/// Converts an uploaded docx into the collection's JSON file: docx →
/// markdown → per-collection parsing (with LLM extraction for clinical
/// guidance) → `{data_dir}/{collection}.json`. Processing a document twice
/// simply overwrites its JSON; the index loader handles replacement in the
/// vector store.
pub struct DocumentPipeline {
    extractor: SemanticExtractor,
    data_dir: PathBuf,
    converter_bin: String,
}

impl DocumentPipeline {
    pub fn new(extractor: SemanticExtractor, data_dir: PathBuf, converter_bin: String) -> Self {
        Self {
            extractor,
            data_dir,
            converter_bin,
        }
    }

    pub fn json_path(&self, collection: Collection) -> PathBuf {
        self.data_dir
            .join(collection.file_stem())
            .with_extension("json")
    }

    pub fn docx_path(&self, collection: Collection) -> PathBuf {
        self.data_dir
            .join(collection.file_stem())
            .with_extension("docx")
    }

    /// Full processing of a saved upload. Returns the path of the JSON file
    /// written for the collection.
    pub async fn process(&self, collection: Collection) -> Result<PathBuf> {
        let docx_path = self.docx_path(collection);
        let md_path =
            convert_to_markdown(&self.converter_bin, &docx_path, &self.data_dir).await?;

        let markdown = fs::read_to_string(&md_path)
            .await
            .with_context(|| format!("Failed to read {}", md_path.display()))?;

        let json = match collection {
            Collection::Pre => {
                let doc = QuestionnaireDoc {
                    questions: chunker::parse_questions(&markdown),
                };
                log::info!("Parsed {} questionnaire questions", doc.questions.len());
                serde_json::to_string_pretty(&doc)?
            }
            Collection::Middle => {
                let pieces = self.process_guidance(&markdown).await;
                log::info!("Extracted {} semantic pieces", pieces.len());
                serde_json::to_string_pretty(&pieces)?
            }
            Collection::Post => {
                let doc = RecordsDoc {
                    content: chunker::parse_post_content(&markdown),
                };
                log::info!("Parsed {} record blocks", doc.content.len());
                serde_json::to_string_pretty(&doc)?
            }
        };

        let json_path = self.json_path(collection);
        write_file(&json_path, &json).await?;
        log::info!("Wrote {}", json_path.display());

        Ok(json_path)
    }

    /// Clinical guidance: chunk by sections, run semantic extraction per
    /// piece. Extraction never errors, so every piece yields a record.
    async fn process_guidance(&self, markdown: &str) -> Vec<ProcessedPiece> {
        let pieces: Vec<MarkdownPiece> = chunker::chunk_by_sections(markdown);
        log::info!("Chunked document into {} sections", pieces.len());

        let mut results = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.into_iter().enumerate() {
            log::info!("Processing piece {}: {}", i + 1, piece.title);
            let record = self.extractor.extract(&piece.content).await;
            results.push(ProcessedPiece {
                piece_id: i + 1,
                title: piece.title,
                structure_type: piece.structure_type,
                record,
            });
        }
        results
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
