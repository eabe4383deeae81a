use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A semantic piece of a markdown document, split at section boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownPiece {
    pub title: String,
    pub content: String,
    pub structure_type: String,
}

/// A single questionnaire entry parsed from bold markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Option<Vec<String>>,
}

/// A block of a medical records document: either a parsed table or free
/// text between tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PostBlock {
    Table(Vec<Map<String, Value>>),
    Text(String),
}

/// Split markdown into pieces at `**bold**` section headers. Content before
/// the first header lands in an "Introduction" piece; a document with no
/// headers at all becomes one "Full Content" piece.
pub fn chunk_by_sections(content: &str) -> Vec<MarkdownPiece> {
    let mut pieces = Vec::new();
    let mut current_title = "Introduction".to_string();
    let mut current_chunk: Vec<&str> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("**") && trimmed.ends_with("**") && trimmed.len() > 4 {
            push_piece(&mut pieces, &current_title, &current_chunk);
            current_title = trimmed.trim_matches('*').to_string();
            current_chunk = vec![line];
        } else {
            current_chunk.push(line);
        }
    }
    push_piece(&mut pieces, &current_title, &current_chunk);

    if pieces.is_empty() {
        pieces.push(MarkdownPiece {
            title: "Full Content".to_string(),
            content: content.to_string(),
            structure_type: "document".to_string(),
        });
    }

    pieces
}

fn push_piece(pieces: &mut Vec<MarkdownPiece>, title: &str, chunk: &[&str]) {
    let content = chunk.join("\n").trim().to_string();
    if !content.is_empty() {
        pieces.push(MarkdownPiece {
            title: title.to_string(),
            content,
            structure_type: "section".to_string(),
        });
    }
}

/// Parse questionnaire markdown: each `**question**` marker is followed on
/// the same line by its answer area; `□`-separated options mean multiple
/// choice, anything else is free text entry.
pub fn parse_questions(content: &str) -> Vec<Question> {
    let mut questions = Vec::new();

    for line in content.lines() {
        if !line.contains("**") {
            continue;
        }

        let parts: Vec<&str> = line.split("**").collect();
        // Bold spans sit at the odd indices of the split
        for (i, part) in parts.iter().enumerate() {
            if i % 2 == 0 {
                continue;
            }
            let question = part.trim();
            if question.is_empty() {
                continue;
            }

            let rest = parts
                .get(i + 1)
                .and_then(|r| r.split('|').next())
                .unwrap_or("")
                .trim();

            if rest.contains('□') {
                let options: Vec<String> = rest
                    .split('□')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();
                questions.push(Question {
                    question: question.to_string(),
                    question_type: "multiple_choice".to_string(),
                    options: Some(options),
                });
            } else {
                questions.push(Question {
                    question: question.to_string(),
                    question_type: "text".to_string(),
                    options: None,
                });
            }
        }
    }

    questions
}

/// Parse a markdown table into header-keyed row records. A first row whose
/// cells are all identical is treated as a repeated title and skipped, with
/// the real header taken from the third line.
pub fn parse_table(table_lines: &[&str]) -> Option<Vec<Map<String, Value>>> {
    if table_lines.len() < 3 {
        return None;
    }

    let first_row_cells = split_cells(table_lines[0]);
    let all_identical = first_row_cells
        .windows(2)
        .all(|pair| pair[0] == pair[1]);

    let (headers, start_row) = if first_row_cells.len() > 1 && all_identical {
        (split_cells(table_lines.get(2)?), 3)
    } else {
        (first_row_cells, 2)
    };

    let mut rows = Vec::new();
    for line in table_lines.iter().skip(start_row) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cells = split_cells(line);
        if cells.len() == headers.len() {
            let row: Map<String, Value> = headers
                .iter()
                .cloned()
                .zip(cells.into_iter().map(Value::String))
                .collect();
            rows.push(row);
        }
    }

    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}

fn split_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 3 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Walk a medical records markdown document, emitting parsed tables and
/// the text between them in order.
pub fn parse_post_content(content: &str) -> Vec<PostBlock> {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().starts_with('|') {
            let mut table_lines = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('|') {
                table_lines.push(lines[i]);
                i += 1;
            }
            match parse_table(&table_lines) {
                Some(rows) => blocks.push(PostBlock::Table(rows)),
                None => blocks.push(PostBlock::Text(table_lines.join("\n"))),
            }
        } else {
            let mut text_lines = Vec::new();
            while i < lines.len() && !lines[i].trim().starts_with('|') {
                text_lines.push(lines[i]);
                i += 1;
            }
            let text = text_lines.join("\n").trim().to_string();
            if !text.is_empty() {
                blocks.push(PostBlock::Text(text));
            }
        }
    }

    blocks
}
