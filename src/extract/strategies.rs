use std::fmt;

/// Named prompt-construction strategies, tried in a fixed order. Each one
/// asks the model for the same target schema in a different register; the
/// first one whose reply yields parseable JSON wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Exact schema plus one full worked example
    Structured,
    /// Two input/output examples, no schema prose
    FewShot,
    /// Fill-in-the-blanks JSON template
    Template,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::Structured,
        ExtractionStrategy::FewShot,
        ExtractionStrategy::Template,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::Structured => "structured",
            ExtractionStrategy::FewShot => "few_shot",
            ExtractionStrategy::Template => "template",
        }
    }

    pub fn build_prompt(&self, content: &str) -> String {
        match self {
            ExtractionStrategy::Structured => structured_prompt(content),
            ExtractionStrategy::FewShot => few_shot_prompt(content),
            ExtractionStrategy::Template => template_prompt(content),
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const STRUCTURED_EXAMPLE: &str = r#"{
  "type": "medical_guide",
  "title": "血压管理",
  "description": "血压异常的诊断和处理指南",
  "sections": [
    {
      "title": "低血压",
      "description": "血压低于正常范围的情况",
      "diagnostic_criteria": {
        "threshold": "<90/60mmHg",
        "duration": "长期",
        "additional_tests": ["心电图", "血常规"]
      },
      "symptoms": ["头晕", "晕厥"],
      "key_points": ["低血压阈值：<90/60mmHg", "常见症状：头晕、晕厥"],
      "recommendations": ["心内科门诊就诊", "完善相关检查"]
    }
  ],
  "key_points": ["血压正常范围：90/60-140/90mmHg", "诊断需要多次测量"],
  "relationships": [
    {
      "type": "diagnostic_criteria",
      "condition": "低血压",
      "threshold": "<90/60mmHg",
      "symptoms": ["头晕", "晕厥"]
    }
  ]
}"#;

fn structured_prompt(content: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a medical document parser. Convert the following markdown content into a \
         structured JSON representation following this EXACT schema:\n\n\
         REQUIRED JSON STRUCTURE:\n",
    );
    prompt.push_str(STRUCTURED_EXAMPLE);
    prompt.push_str(
        "\n\nRULES:\n\
         1. ALWAYS use the exact field names shown in the example\n\
         2. \"type\" must be one of: \"medical_guide\", \"clinical_protocol\", \
         \"diagnostic_criteria\", \"treatment_plan\"\n\
         3. Each section MUST have at least a \"title\" field\n\
         4. Arrays should contain strings, not nested objects unless specified\n\
         5. Use Chinese for content, English for field names\n\
         6. If a field is not applicable, use empty string \"\" or empty array []\n\
         7. DO NOT add extra fields not shown in the schema\n\
         8. Return ONLY valid JSON, no explanations or markdown\n\n\
         CONTENT TO PROCESS:\n",
    );
    prompt.push_str(content);
    prompt.push_str("\n\nJSON OUTPUT:\n");
    prompt
}

const FEW_SHOT_EXAMPLE_1: &str = r#"{
  "type": "medical_guide",
  "title": "血压偏低",
  "sections": [
    {
      "title": "血压偏低",
      "description": "若血压长期低于90/60mmHg，伴有头晕、晕厥等症状，请到心内科门诊进一步诊治。",
      "diagnostic_criteria": {"threshold": "<90/60mmHg", "duration": "长期"},
      "symptoms": ["头晕", "晕厥"],
      "recommendations": ["心内科门诊就诊"]
    }
  ],
  "key_points": ["低血压阈值：<90/60mmHg", "常见症状：头晕、晕厥"]
}"#;

const FEW_SHOT_EXAMPLE_2: &str = r#"{
  "type": "treatment_plan",
  "title": "高血压病",
  "sections": [
    {
      "title": "高血压病治疗",
      "description": "高血压的综合管理方案",
      "recommendations": ["低盐饮食", "适量运动", "控制体重", "劳逸结合", "继续降压药物治疗", "监测血压"]
    }
  ],
  "key_points": ["生活方式干预", "药物治疗", "定期监测"]
}"#;

fn few_shot_prompt(content: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("Convert medical markdown content to structured JSON. Here are examples:\n\n");
    prompt.push_str("EXAMPLE 1:\nInput: \"血压偏低: 若血压长期低于90/60mmHg，伴有头晕、晕厥等症状，请到心内科门诊进一步诊治。\"\nOutput:\n");
    prompt.push_str(FEW_SHOT_EXAMPLE_1);
    prompt.push_str("\n\nEXAMPLE 2:\nInput: \"高血压病: 低盐饮食，适量运动，控制体重，劳逸结合，继续降压药物治疗，监测血压。\"\nOutput:\n");
    prompt.push_str(FEW_SHOT_EXAMPLE_2);
    prompt.push_str("\n\nNow convert this content following the same pattern:\n");
    prompt.push_str(content);
    prompt.push_str("\n\nReturn ONLY the JSON structure:\n");
    prompt
}

const TEMPLATE_BODY: &str = r#"{
  "type": "medical_guide",
  "title": "[EXTRACT_MAIN_TOPIC]",
  "description": "[OPTIONAL_OVERVIEW]",
  "sections": [
    {
      "title": "[SECTION_NAME]",
      "description": "[SECTION_DESCRIPTION]",
      "diagnostic_criteria": {
        "threshold": "[THRESHOLD_VALUES_IF_ANY]",
        "additional_tests": ["[TESTS_IF_MENTIONED]"]
      },
      "symptoms": ["[LIST_SYMPTOMS]"],
      "key_points": ["[IMPORTANT_POINTS]"],
      "recommendations": ["[TREATMENT_RECOMMENDATIONS]"],
      "status": "[CONDITION_STATUS]",
      "evaluation": "[CLINICAL_EVALUATION]"
    }
  ],
  "key_points": ["[OVERALL_KEY_POINTS]"]
}"#;

fn template_prompt(content: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("Fill in this JSON template with information from the medical content:\n\n");
    prompt.push_str(TEMPLATE_BODY);
    prompt.push_str("\n\nCONTENT:\n");
    prompt.push_str(content);
    prompt.push_str(
        "\n\nINSTRUCTIONS:\n\
         1. Replace ALL [PLACEHOLDER] values with actual extracted information\n\
         2. If information is not available, use empty string \"\" or empty array []\n\
         3. Keep numeric values as numbers, not strings\n\
         4. Ensure all arrays contain only strings unless specified otherwise\n\
         5. Return only the filled JSON, no explanations\n\n\
         FILLED JSON:\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_fixed() {
        assert_eq!(
            ExtractionStrategy::ORDER,
            [
                ExtractionStrategy::Structured,
                ExtractionStrategy::FewShot,
                ExtractionStrategy::Template
            ]
        );
    }

    #[test]
    fn test_prompts_embed_content() {
        for strategy in ExtractionStrategy::ORDER {
            let prompt = strategy.build_prompt("血压偏低的处理");
            assert!(prompt.contains("血压偏低的处理"), "{} prompt missing content", strategy);
        }
    }

    #[test]
    fn test_structured_prompt_carries_schema() {
        let prompt = ExtractionStrategy::Structured.build_prompt("x");
        assert!(prompt.contains("REQUIRED JSON STRUCTURE"));
        assert!(prompt.contains("\"treatment_plan\""));
    }

    #[test]
    fn test_few_shot_prompt_carries_both_examples() {
        let prompt = ExtractionStrategy::FewShot.build_prompt("x");
        assert!(prompt.contains("EXAMPLE 1"));
        assert!(prompt.contains("EXAMPLE 2"));
        assert!(prompt.contains("高血压病"));
    }

    #[test]
    fn test_template_prompt_carries_placeholders() {
        let prompt = ExtractionStrategy::Template.build_prompt("x");
        assert!(prompt.contains("[EXTRACT_MAIN_TOPIC]"));
        assert!(prompt.contains("FILLED JSON"));
    }

    #[test]
    fn test_example_payloads_are_valid_json() {
        for example in [STRUCTURED_EXAMPLE, FEW_SHOT_EXAMPLE_1, FEW_SHOT_EXAMPLE_2] {
            serde_json::from_str::<serde_json::Value>(example).unwrap();
        }
    }
}
