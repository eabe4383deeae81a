/// Strip an LLM reply down to a single JSON payload before parsing.
///
/// Tolerates surrounding prose, code-fence markers, a leading `json`
/// language tag, and trailing commentary. The object span from the first
/// `{` to the last `}` is the primary candidate: the extraction prompts ask
/// for an object whose fields contain arrays, so slicing on brackets would
/// cut an unbalanced span out of every well-formed reply. An array span is
/// used only when the reply itself is an array or holds no object at all.
/// Returns the best-effort candidate; the caller decides what to do when
/// parsing it still fails.
pub fn clean_llm_response(response_text: &str) -> String {
    let mut text = response_text.trim();

    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_prefix("json") {
        text = stripped;
    }

    let text = text.trim();

    // A reply that opens with '[' is itself an array
    if text.starts_with('[') {
        if let Some(end) = text.rfind(']') {
            if end > 0 {
                return text[..=end].to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_code_fence_and_language_tag() {
        let response = "```json\n{\"type\":\"medical_guide\",\"title\":\"血压管理\"}\n```";
        let cleaned = clean_llm_response(response);
        assert_eq!(cleaned, "{\"type\":\"medical_guide\",\"title\":\"血压管理\"}");
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["type"], "medical_guide");
    }

    #[test]
    fn test_extracts_object_from_surrounding_prose() {
        let response = "Here is the JSON you asked for:\n{\"title\": \"x\"}\nLet me know!";
        assert_eq!(clean_llm_response(response), "{\"title\": \"x\"}");
    }

    #[test]
    fn test_record_with_array_fields_keeps_full_object() {
        let response = "```json\n{\"type\":\"medical_guide\",\"title\":\"血压管理\",\
            \"sections\":[{\"title\":\"低血压\"}],\"key_points\":[\"多次测量\"]}\n```";
        let cleaned = clean_llm_response(response);
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["type"], "medical_guide");
        assert_eq!(parsed["title"], "血压管理");
        assert_eq!(parsed["sections"][0]["title"], "低血压");
        assert_eq!(parsed["key_points"][0], "多次测量");
    }

    #[test]
    fn test_object_span_wins_over_inner_arrays() {
        let response = "Here you go: {\"title\": \"x\", \"sections\": [1, 2]} hope that helps";
        assert_eq!(
            clean_llm_response(response),
            "{\"title\": \"x\", \"sections\": [1, 2]}"
        );
    }

    #[test]
    fn test_bare_array_reply_keeps_array_span() {
        let response = "```json\n[{\"section\": \"血压异常\"}]\n```";
        assert_eq!(clean_llm_response(response), "[{\"section\": \"血压异常\"}]");
    }

    #[test]
    fn test_nested_braces_use_outermost_span() {
        let response = "x {\"a\": {\"b\": 1}} y";
        assert_eq!(clean_llm_response(response), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_no_json_returns_trimmed_text() {
        let response = "  血压... 低血压 <90/60mmHg 头晕  ";
        let cleaned = clean_llm_response(response);
        assert_eq!(cleaned, "血压... 低血压 <90/60mmHg 头晕");
        assert!(serde_json::from_str::<serde_json::Value>(&cleaned).is_err());
    }

    #[test]
    fn test_reversed_brackets_fall_through() {
        // '}' before '{': no valid span, return as-is
        let response = "} not json {";
        assert_eq!(clean_llm_response(response), "} not json {");
    }
}
