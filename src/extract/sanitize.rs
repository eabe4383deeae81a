use crate::extract::schema::{RecordSection, RecordType, StructuredRecord};
use serde_json::{Map, Value};

/// Repair an arbitrary JSON-like value into a record that satisfies the
/// required-field invariant. Total function: whatever the model produced,
/// the result has a type, a non-empty title, and at least one section.
pub fn sanitize_record(value: Value) -> StructuredRecord {
    match value {
        Value::Object(map) => sanitize_object(map),
        // A bare array is treated as the sections list of an untitled guide
        Value::Array(items) => {
            let sections = sanitize_sections(Value::Array(items));
            finish_record(
                RecordType::MedicalGuide,
                String::new(),
                String::new(),
                sections,
                Vec::new(),
                Vec::new(),
            )
        }
        Value::String(text) => StructuredRecord::from_raw_text(&text),
        other => StructuredRecord::from_raw_text(&other.to_string()),
    }
}

fn sanitize_object(mut map: Map<String, Value>) -> StructuredRecord {
    let record_type = RecordType::from_value(map.get("type"));

    let title = map
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("")
        .to_string();

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let sections = map
        .remove("sections")
        .map(sanitize_sections)
        .unwrap_or_default();

    let key_points = coerce_string_array(map.remove("key_points"));

    let relationships = match map.remove("relationships") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    finish_record(
        record_type,
        title,
        description,
        sections,
        key_points,
        relationships,
    )
}

fn finish_record(
    record_type: RecordType,
    mut title: String,
    description: String,
    mut sections: Vec<RecordSection>,
    key_points: Vec<String>,
    relationships: Vec<Value>,
) -> StructuredRecord {
    if title.is_empty() {
        title = "医疗信息".to_string();
    }
    if sections.is_empty() {
        // Wrap whatever content we have into a single synthetic section
        sections.push(RecordSection {
            title: title.clone(),
            description: description.clone(),
            ..Default::default()
        });
    }
    StructuredRecord {
        record_type,
        title,
        description,
        sections,
        key_points,
        relationships,
    }
}

fn sanitize_sections(value: Value) -> Vec<RecordSection> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(sanitize_section(map)),
                Value::String(text) if !text.trim().is_empty() => Some(RecordSection {
                    title: "未知章节".to_string(),
                    description: text,
                    ..Default::default()
                }),
                _ => None,
            })
            .collect(),
        // A string where the sequence was expected becomes one section
        Value::String(text) if !text.trim().is_empty() => vec![RecordSection {
            title: "未知章节".to_string(),
            description: text,
            ..Default::default()
        }],
        _ => Vec::new(),
    }
}

fn sanitize_section(mut map: Map<String, Value>) -> RecordSection {
    let title = map
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("未知章节")
        .to_string();

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let key_points = coerce_string_array(map.remove("key_points"));
    let recommendations = coerce_string_array(map.remove("recommendations"));
    let symptoms = coerce_string_array(map.remove("symptoms"));
    let diagnostic_criteria = coerce_object(map.remove("diagnostic_criteria"));
    let measurement = coerce_object(map.remove("measurement"));

    let status = map
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let evaluation = map
        .get("evaluation")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    RecordSection {
        title,
        description,
        key_points,
        recommendations,
        symptoms,
        diagnostic_criteria,
        measurement,
        status,
        evaluation,
    }
}

/// Arrays come back from models as strings often enough that a lone string
/// is promoted to a single-element array rather than dropped.
fn coerce_string_array(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    }
}

fn coerce_object(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
