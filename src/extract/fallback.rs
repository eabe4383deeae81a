use crate::extract::schema::{RecordSection, RecordType, StructuredRecord};
use regex::Regex;

/// Build a structured record from the markdown alone, without the model.
/// Used when every extraction strategy has failed; the result still holds
/// the required-field invariant.
pub fn fallback_record(content: &str) -> StructuredRecord {
    let title = extract_title(content);
    let sections = extract_sections(content);

    StructuredRecord {
        record_type: RecordType::MedicalGuide,
        title,
        description: "自动提取的医疗信息".to_string(),
        sections,
        key_points: extract_key_points(content, 10),
        relationships: Vec::new(),
    }
}

pub fn extract_title(content: &str) -> String {
    let header = Regex::new(r"(?m)^#{1,3}\s*(.+)$").unwrap();
    if let Some(caps) = header.captures(content) {
        return caps[1].trim().to_string();
    }

    let bold = Regex::new(r"^\*\*(.+?)\*\*").unwrap();
    if let Some(caps) = bold.captures(content) {
        return caps[1].trim().to_string();
    }

    for line in content.lines() {
        let line = line.trim();
        if !line.is_empty() {
            return truncate_chars(line, 50);
        }
    }

    "医疗信息".to_string()
}

fn extract_sections(content: &str) -> Vec<RecordSection> {
    let section_pattern = Regex::new(r"(?m)^(?:#{1,3}\s*(.+)$|\*\*(.+?)\*\*)").unwrap();
    let matches: Vec<_> = section_pattern.captures_iter(content).collect();

    let mut sections = Vec::new();
    for (i, caps) in matches.iter().enumerate() {
        let title = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let start = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let body = content[start..end].trim();

        sections.push(RecordSection {
            title,
            description: truncate_chars(body, 200),
            key_points: extract_key_points(body, 5),
            recommendations: extract_recommendations(body),
            ..Default::default()
        });
    }

    if sections.is_empty() {
        sections.push(RecordSection {
            title: "主要内容".to_string(),
            description: truncate_chars(content.trim(), 300),
            key_points: extract_key_points(content, 10),
            ..Default::default()
        });
    }

    sections
}

pub fn extract_key_points(content: &str, limit: usize) -> Vec<String> {
    let mut key_points = Vec::new();

    let numbered = Regex::new(r"(?m)^\d+\.\s*(.+)$").unwrap();
    for caps in numbered.captures_iter(content) {
        key_points.push(caps[1].trim().to_string());
    }

    // Whitespace after the marker keeps **bold** section headers out
    let bullets = Regex::new(r"(?m)^[-*]\s+(.+)$").unwrap();
    for caps in bullets.captures_iter(content) {
        key_points.push(caps[1].trim().to_string());
    }

    // Clinical thresholds like <90/60mmHg or ≥140/90mmHg
    let thresholds = Regex::new(r"([<>≥≤]\s*\d+[./]\d*\s*\w+)").unwrap();
    for caps in thresholds.captures_iter(content) {
        key_points.push(format!("阈值：{}", caps[1].trim()));
    }

    key_points.truncate(limit);
    key_points
}

pub fn extract_recommendations(content: &str) -> Vec<String> {
    const KEYWORDS: [&str; 10] = [
        "建议", "推荐", "应该", "需要", "门诊", "就诊", "治疗", "监测", "随访", "复查",
    ];

    let mut recommendations = Vec::new();
    for sentence in content.split(['。', '！', '？', '；']) {
        let sentence = sentence.trim();
        if sentence.chars().count() > 5 && KEYWORDS.iter().any(|k| sentence.contains(k)) {
            recommendations.push(sentence.to_string());
        }
        if recommendations.len() == 5 {
            break;
        }
    }
    recommendations
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# 血压异常管理\n\n\
        **血压偏低**\n若血压长期低于90/60mmHg，伴有头晕、晕厥等症状，请到心内科门诊进一步诊治。\n\n\
        **血压升高**\n低盐饮食，随访血压，若不同日3次测量血压均≥140/90mmHg可诊断为高血压病。\n\
        - 高血压诊断标准：≥140/90mmHg\n\
        - 需要多次测量确认\n";

    #[test]
    fn test_title_prefers_header() {
        assert_eq!(extract_title(SAMPLE), "血压异常管理");
    }

    #[test]
    fn test_title_falls_back_to_bold_then_first_line() {
        assert_eq!(extract_title("**低血压** 处理"), "低血压");
        assert_eq!(extract_title("\n第一行内容\n第二行"), "第一行内容");
        assert_eq!(extract_title("   "), "医疗信息");
    }

    #[test]
    fn test_fallback_record_is_valid_and_sectioned() {
        let record = fallback_record(SAMPLE);
        assert!(record.is_structurally_valid());
        assert_eq!(record.record_type, RecordType::MedicalGuide);
        // Header plus the two bold section markers
        assert_eq!(record.sections.len(), 3);
        assert_eq!(record.sections[1].title, "血压偏低");
        assert!(record.sections[1].description.contains("90/60mmHg"));
    }

    #[test]
    fn test_key_points_capture_bullets_and_thresholds() {
        let points = extract_key_points(SAMPLE, 10);
        assert!(points.iter().any(|p| p.contains("多次测量确认")));
        assert!(points.iter().any(|p| p.starts_with("阈值：")));
    }

    #[test]
    fn test_recommendations_by_keyword() {
        let recs = extract_recommendations("若血压长期偏低，请到心内科门诊进一步诊治。保持心情愉快。");
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("门诊"));
    }

    #[test]
    fn test_plain_text_gets_single_section() {
        let record = fallback_record("没有任何标记的自由文本内容，需要保留。");
        assert_eq!(record.sections.len(), 1);
        assert_eq!(record.sections[0].title, "主要内容");
        assert!(record.sections[0].description.contains("自由文本"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long: String = "血".repeat(400);
        let record = fallback_record(&long);
        assert!(record.sections[0].description.chars().count() <= 303);
    }
}
