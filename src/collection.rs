use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three fixed partitions of document content. Each one has its own
/// vector store collection and its own JSON file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Questionnaire questions
    Pre,
    /// Clinical guidance and treatment
    Middle,
    /// Medical records tables
    Post,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Pre, Collection::Middle, Collection::Post];

    /// Name of the backing vector store collection.
    pub fn store_name(&self) -> &'static str {
        match self {
            Collection::Pre => "pre_docs",
            Collection::Middle => "middle_docs",
            Collection::Post => "post_docs",
        }
    }

    /// File stem used for both the uploaded docx and the derived JSON.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Collection::Pre => "pre",
            Collection::Middle => "middle",
            Collection::Post => "post",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Collection::Pre => "questionnaire questions",
            Collection::Middle => "clinical guidance and treatment",
            Collection::Post => "medical records tables",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Collection::Pre),
            "middle" => Ok(Collection::Middle),
            "post" => Ok(Collection::Post),
            other => Err(format!(
                "Invalid collection '{}'. Supported collections: pre, middle, post",
                other
            )),
        }
    }
}
