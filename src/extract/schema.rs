use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document category emitted by the extractor. Unknown values coerce to
/// `MedicalGuide` during sanitization instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    MedicalGuide,
    ClinicalProtocol,
    DiagnosticCriteria,
    TreatmentPlan,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::MedicalGuide => "medical_guide",
            RecordType::ClinicalProtocol => "clinical_protocol",
            RecordType::DiagnosticCriteria => "diagnostic_criteria",
            RecordType::TreatmentPlan => "treatment_plan",
        }
    }

    /// Parse a JSON value into a record type, defaulting to the generic
    /// fallback for anything outside the enumerated set.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("medical_guide") => RecordType::MedicalGuide,
            Some("clinical_protocol") => RecordType::ClinicalProtocol,
            Some("diagnostic_criteria") => RecordType::DiagnosticCriteria,
            Some("treatment_plan") => RecordType::TreatmentPlan,
            _ => RecordType::MedicalGuide,
        }
    }
}

impl Default for RecordType {
    fn default() -> Self {
        RecordType::MedicalGuide
    }
}

/// One section of a structured record. All clinical fields are free-form
/// and optional; only the title is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSection {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub diagnostic_criteria: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub measurement: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub evaluation: String,
}

impl RecordSection {
    pub fn has_diagnostic_criteria(&self) -> bool {
        !self.diagnostic_criteria.is_empty()
    }

    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.is_empty()
    }

    pub fn has_measurement(&self) -> bool {
        !self.measurement.is_empty()
    }
}

/// The validated JSON structure produced per document piece. After
/// sanitization `title` is never empty and `sections` holds at least one
/// entry, regardless of what the model returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub sections: Vec<RecordSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Value>,
}

impl StructuredRecord {
    pub fn is_structurally_valid(&self) -> bool {
        !self.title.is_empty()
            && !self.sections.is_empty()
            && self.sections.iter().all(|s| !s.title.is_empty())
    }

    /// Minimal valid skeleton wrapping unparseable model output. Downstream
    /// indexing requires a structurally valid record unconditionally, so
    /// this is the floor the pipeline can always fall back to.
    pub fn from_raw_text(text: &str) -> Self {
        Self {
            record_type: RecordType::MedicalGuide,
            title: "Raw Content".to_string(),
            description: String::new(),
            sections: vec![RecordSection {
                title: "Raw Content".to_string(),
                description: text.to_string(),
                ..Default::default()
            }],
            key_points: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_type_from_value() {
        assert_eq!(
            RecordType::from_value(Some(&json!("treatment_plan"))),
            RecordType::TreatmentPlan
        );
        assert_eq!(
            RecordType::from_value(Some(&json!("something_else"))),
            RecordType::MedicalGuide
        );
        assert_eq!(RecordType::from_value(None), RecordType::MedicalGuide);
        assert_eq!(
            RecordType::from_value(Some(&json!(42))),
            RecordType::MedicalGuide
        );
    }

    #[test]
    fn test_raw_text_skeleton_is_valid() {
        let record = StructuredRecord::from_raw_text("血压... 低血压 <90/60mmHg 头晕");
        assert!(record.is_structurally_valid());
        assert_eq!(record.title, "Raw Content");
        assert_eq!(record.sections.len(), 1);
        assert!(record.sections[0].description.contains("<90/60mmHg"));
    }

    #[test]
    fn test_serde_round_trip_uses_type_field() {
        let record = StructuredRecord::from_raw_text("content");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "medical_guide");
        assert!(value.get("description").is_none());
    }
}
