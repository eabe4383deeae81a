pub mod cleaner;
pub mod extractor;
pub mod fallback;
pub mod sanitize;
pub mod schema;
pub mod strategies;

pub use cleaner::clean_llm_response;
pub use extractor::SemanticExtractor;
pub use sanitize::sanitize_record;
pub use schema::{RecordSection, RecordType, StructuredRecord};
pub use strategies::ExtractionStrategy;
