use crate::extract::cleaner::clean_llm_response;
use crate::extract::fallback::fallback_record;
use crate::extract::sanitize::sanitize_record;
use crate::extract::schema::StructuredRecord;
use crate::extract::strategies::ExtractionStrategy;
use crate::providers::traits::CompletionProvider;
use anyhow::{anyhow, Result};

/// Turns one markdown piece into a structured record by prompting the
/// model, cleaning and repairing its reply. Strategies are tried in fixed
/// order; a strategy fails only when the model call fails or no JSON span
/// can be parsed from its reply. When all strategies fail the record is
/// built offline from the markdown, so extraction as a whole never errors
/// on malformed model output.
pub struct SemanticExtractor {
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

impl SemanticExtractor {
    pub fn new(provider: Box<dyn CompletionProvider + Send + Sync>) -> Self {
        Self { provider }
    }

    pub async fn extract(&self, content: &str) -> StructuredRecord {
        for strategy in ExtractionStrategy::ORDER {
            match self.try_strategy(strategy, content).await {
                Ok(record) => {
                    log::info!("Extraction succeeded with {} strategy", strategy);
                    return record;
                }
                Err(e) => {
                    log::warn!("Extraction strategy {} failed: {}", strategy, e);
                }
            }
        }

        log::warn!("All extraction strategies failed, building record from markdown directly");
        fallback_record(content)
    }

    async fn try_strategy(
        &self,
        strategy: ExtractionStrategy,
        content: &str,
    ) -> Result<StructuredRecord> {
        let prompt = strategy.build_prompt(content);
        let response = self.provider.complete(&prompt).await?;

        let cleaned = clean_llm_response(&response);
        if cleaned.is_empty() {
            return Err(anyhow!("model returned an empty response"));
        }

        let value: serde_json::Value = serde_json::from_str(&cleaned)
            .map_err(|e| anyhow!("no parseable JSON span in response: {}", e))?;

        let record = sanitize_record(value);
        debug_assert!(record.is_structurally_valid());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::schema::RecordType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted provider: returns canned replies in sequence.
    #[derive(Clone)]
    struct ScriptedProvider {
        replies: Vec<Result<String, String>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(i) {
                Some(Ok(reply)) => Ok(reply.clone()),
                Some(Err(msg)) => Err(anyhow!(msg.clone())),
                None => Err(anyhow!("no scripted reply left")),
            }
        }

        async fn get_model_info(&self) -> Result<String> {
            Ok("scripted".to_string())
        }

        fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn test_first_strategy_success_is_accepted() {
        let provider = ScriptedProvider::new(vec![Ok(
            "```json\n{\"type\":\"treatment_plan\",\"title\":\"高血压病\",\"sections\":[{\"title\":\"治疗\"}]}\n```".to_string(),
        )]);
        let calls = provider.calls.clone();
        let extractor = SemanticExtractor::new(Box::new(provider));

        let record = extractor.extract("content").await;
        assert_eq!(record.record_type, RecordType::TreatmentPlan);
        assert_eq!(record.title, "高血压病");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_record_with_array_fields_keeps_type_and_title() {
        // The usual compliant reply: an object whose fields hold arrays
        let reply = "```json\n{\"type\":\"medical_guide\",\"title\":\"血压管理\",\
            \"description\":\"血压异常的处理\",\
            \"sections\":[{\"title\":\"低血压\",\"symptoms\":[\"头晕\"]}],\
            \"key_points\":[\"诊断需要多次测量\"]}\n```";
        let provider = ScriptedProvider::new(vec![Ok(reply.to_string())]);
        let calls = provider.calls.clone();
        let extractor = SemanticExtractor::new(Box::new(provider));

        let record = extractor.extract("content").await;
        assert_eq!(record.record_type, RecordType::MedicalGuide);
        assert_eq!(record.title, "血压管理");
        assert_eq!(record.sections.len(), 1);
        assert_eq!(record.sections[0].symptoms, vec!["头晕"]);
        assert_eq!(record.key_points, vec!["诊断需要多次测量"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_through_to_next_strategy() {
        let provider = ScriptedProvider::new(vec![
            Ok("I cannot produce JSON for this".to_string()),
            Ok("{\"title\":\"低血压\",\"sections\":[{\"title\":\"处理\"}]}".to_string()),
        ]);
        let calls = provider.calls.clone();
        let extractor = SemanticExtractor::new(Box::new(provider));

        let record = extractor.extract("content").await;
        assert_eq!(record.title, "低血压");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_incomplete_json_is_repaired_not_rejected() {
        // Parseable but missing every required field: the sanitizer fills them
        let provider = ScriptedProvider::new(vec![Ok("{\"description\":\"x\"}".to_string())]);
        let extractor = SemanticExtractor::new(Box::new(provider));

        let record = extractor.extract("content").await;
        assert!(record.is_structurally_valid());
        assert_eq!(record.title, "医疗信息");
    }

    #[tokio::test]
    async fn test_all_strategies_fail_builds_offline_record() {
        let provider = ScriptedProvider::new(vec![
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
        ]);
        let extractor = SemanticExtractor::new(Box::new(provider));

        let record = extractor
            .extract("**血压偏低**\n请到心内科门诊进一步诊治。")
            .await;
        assert!(record.is_structurally_valid());
        assert_eq!(record.title, "血压偏低");
    }
}
