use crate::collection::Collection;
use crate::providers::traits::CompletionProvider;
use crate::rag::retrieval::{assemble_context, ContextRetriever, RetrievedChunk};
use anyhow::Result;

/// Outcome of a query: the answer text plus the context it was grounded
/// in. `no_context` marks the explicit empty-retrieval path; the answer is
/// then the canned refusal, never a model fabrication.
#[derive(Debug)]
pub struct QueryResult {
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
    pub topic: String,
    pub no_context: bool,
}

pub struct RagEngine {
    retriever: Box<dyn ContextRetriever>,
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

impl RagEngine {
    pub fn new(
        retriever: Box<dyn ContextRetriever>,
        provider: Box<dyn CompletionProvider + Send + Sync>,
    ) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    pub async fn answer(&self, collection: Collection, question: &str) -> Result<QueryResult> {
        let topic = self.extract_topic(question).await?;
        log::info!("Query topic: {}", topic);

        let chunks = self
            .retriever
            .retrieve(collection, question, &topic)
            .await?;

        if chunks.is_empty() {
            log::info!("No relevant context found for topic '{}'", topic);
            return Ok(QueryResult {
                answer: refusal(&topic),
                context: Vec::new(),
                topic,
                no_context: true,
            });
        }

        let context = assemble_context(&chunks);
        let prompt = answer_prompt(&topic, &context, question);
        let answer = self.provider.complete(&prompt).await?;

        Ok(QueryResult {
            answer,
            context: chunks,
            topic,
            no_context: false,
        })
    }

    async fn extract_topic(&self, question: &str) -> Result<String> {
        let prompt = format!("Extract the main topic from this question: {}", question);
        let reply = self.provider.complete(&prompt).await?;
        let topic = clean_topic(&reply);
        if topic.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(topic)
        }
    }
}

/// Strip markdown emphasis and label prefixes the model tends to add
/// around the topic.
pub fn clean_topic(reply: &str) -> String {
    reply
        .replace("**", "")
        .replace('*', "")
        .replace("主要话题：", "")
        .replace("主題：", "")
        .replace("主题：", "")
        .replace("Main topic:", "")
        .trim()
        .to_string()
}

pub fn refusal(topic: &str) -> String {
    format!(
        "无法回答该问题，因为给定的上下文中没有包含关于{}的任何信息。",
        topic
    )
}

fn answer_prompt(topic: &str, context: &str, question: &str) -> String {
    format!(
        "Provide the exact relevant information from the context that answers the question, \
         quoting it directly if possible. For treatment questions, also include the recommended \
         actions if available in the context. Do not use any external knowledge or assumptions. \
         If the context does not contain relevant information about {topic}, reply exactly with \
         \"{refusal}\"\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:",
        topic = topic,
        refusal = refusal(topic),
        context = context,
        question = question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[test]
    fn test_clean_topic_strips_markup_and_labels() {
        assert_eq!(clean_topic("**血压**"), "血压");
        assert_eq!(clean_topic("主要话题：高血压病"), "高血压病");
        assert_eq!(clean_topic("Main topic: blood pressure"), "blood pressure");
    }

    #[test]
    fn test_answer_prompt_embeds_refusal_sentence() {
        let prompt = answer_prompt("血压", "[低血压] 头晕", "血压低怎么办？");
        assert!(prompt.contains("无法回答该问题，因为给定的上下文中没有包含关于血压的任何信息。"));
        assert!(prompt.contains("[低血压] 头晕"));
        assert!(prompt.contains("Question: 血压低怎么办？"));
    }

    struct EmptyRetriever;

    #[async_trait]
    impl ContextRetriever for EmptyRetriever {
        async fn retrieve(
            &self,
            _collection: Collection,
            _question: &str,
            _topic: &str,
        ) -> Result<Vec<RetrievedChunk>> {
            Ok(Vec::new())
        }
    }

    #[derive(Clone)]
    struct TopicOnlyProvider;

    #[async_trait]
    impl CompletionProvider for TopicOnlyProvider {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if prompt.starts_with("Extract the main topic") {
                Ok("**血压**".to_string())
            } else {
                // The refusal path must not reach the model
                Err(anyhow!("unexpected completion call"))
            }
        }

        async fn get_model_info(&self) -> Result<String> {
            Ok("stub".to_string())
        }

        fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn test_empty_retrieval_returns_refusal_without_llm_call() {
        let engine = RagEngine::new(Box::new(EmptyRetriever), Box::new(TopicOnlyProvider));
        let result = engine.answer(Collection::Middle, "血压低怎么办？").await.unwrap();
        assert!(result.no_context);
        assert!(result.context.is_empty());
        assert_eq!(result.topic, "血压");
        assert_eq!(
            result.answer,
            "无法回答该问题，因为给定的上下文中没有包含关于血压的任何信息。"
        );
    }
}
