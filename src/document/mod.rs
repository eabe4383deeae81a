pub mod chunker;
pub mod converter;
pub mod pipeline;

pub use chunker::{MarkdownPiece, PostBlock, Question};
pub use pipeline::{DocumentPipeline, ProcessedPiece, QuestionnaireDoc, RecordsDoc};
