use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use neighborly_types::models::{AiAnswer, CommunityPost};

use crate::error::AiError;
use crate::gemini::TextGenerator;
use crate::prompt::build_prompt;
use crate::reply::parse_model_reply;
use crate::retriever::{MAX_RETRIEVED, ScoredPost};
use crate::similarity::similarity;
use crate::store::{InteractionLog, blocking};

/// Posts at or below this score are not returned to the caller.
pub const RELEVANCE_THRESHOLD: f64 = 0.1;

pub struct ResponseGenerator {
    model: Arc<dyn TextGenerator>,
    log: Arc<dyn InteractionLog>,
}

impl ResponseGenerator {
    pub fn new(model: Arc<dyn TextGenerator>, log: Arc<dyn InteractionLog>) -> Self {
        Self { model, log }
    }

    /// Ask the model about `query` using `candidates` as context, log the
    /// exchange, and return the answer with the posts that backed it.
    pub async fn generate(
        &self,
        user_id: Uuid,
        query: &str,
        candidates: Vec<CommunityPost>,
    ) -> Result<AiAnswer, AiError> {
        if query.trim().is_empty() {
            return Err(AiError::InvalidQuery);
        }

        let mut scored: Vec<ScoredPost> = candidates
            .into_iter()
            .filter(|p| !p.title.trim().is_empty() && !p.content.trim().is_empty())
            .map(|post| ScoredPost {
                score: similarity(query, &format!("{} {}", post.title, post.content)),
                post,
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let prompt = build_prompt(query, &scored);
        let raw = self.model.generate(&prompt).await.inspect_err(|e| {
            error!("Error in generate: {}", e);
        })?;
        debug!("User query: {}", query);
        debug!("Model reply: {}", raw);

        let reply = parse_model_reply(&raw).inspect_err(|e| {
            error!("Error parsing AI response ({:?}); raw reply: {}", e, raw);
        })?;

        self.record(user_id, query, &reply.response).await;

        let retrieved_posts = scored
            .into_iter()
            .filter(|s| s.score > RELEVANCE_THRESHOLD)
            .take(MAX_RETRIEVED)
            .map(|s| s.post)
            .collect();

        Ok(AiAnswer {
            text: reply.response,
            suggested_questions: reply.follow_up_questions,
            retrieved_posts,
        })
    }

    /// Failures are logged and never reach the caller.
    async fn record(&self, user_id: Uuid, query: &str, response: &str) {
        let log = self.log.clone();
        let query = query.to_string();
        let response = response.to_string();
        if let Err(e) = blocking(move || log.record(user_id, &query, &response)).await {
            error!("Error storing AI interaction: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryLog, ScriptedModel, post};
    use neighborly_types::models::PostCategory;

    const REPLY: &str = r#"```json
{"response": "The community garden opens next month.", "followUpQuestions": ["How do I get a plot?", "Who organizes it?"]}
```"#;

    #[tokio::test]
    async fn answers_with_relevant_posts_first() {
        let model = Arc::new(ScriptedModel::replying(REPLY));
        let log = Arc::new(MemoryLog::default());
        let generator = ResponseGenerator::new(model.clone(), log.clone());
        let user = Uuid::new_v4();

        let candidates = vec![
            post("Road Closures", "Main street repaving", PostCategory::News),
            post("Community Garden Opening Next Month", "Plots available", PostCategory::News),
        ];
        let answer = generator.generate(user, "garden", candidates).await.unwrap();

        assert_eq!(answer.text, "The community garden opens next month.");
        assert_eq!(answer.suggested_questions.len(), 2);
        // the road post shares no words with the query and is dropped
        assert_eq!(answer.retrieved_posts.len(), 1);
        assert_eq!(answer.retrieved_posts[0].title, "Community Garden Opening Next Month");

        let prompt = model.last_prompt().unwrap();
        let garden = prompt.find("Community Garden Opening").unwrap();
        let road = prompt.find("Road Closures").unwrap();
        assert!(garden < road);

        let records = log.records();
        assert_eq!(records, vec![(user, "garden".to_string(), answer.text.clone())]);
    }

    #[tokio::test]
    async fn no_candidates_still_answers() {
        let model = Arc::new(ScriptedModel::replying(REPLY));
        let generator = ResponseGenerator::new(model, Arc::new(MemoryLog::default()));

        let answer = generator.generate(Uuid::new_v4(), "garden", vec![]).await.unwrap();
        assert!(answer.retrieved_posts.is_empty());
        assert!(!answer.text.is_empty());
    }

    #[tokio::test]
    async fn skips_posts_without_title_or_content() {
        let model = Arc::new(ScriptedModel::replying(REPLY));
        let generator = ResponseGenerator::new(model.clone(), Arc::new(MemoryLog::default()));

        let candidates = vec![
            post("", "garden garden", PostCategory::News),
            post("garden", "   ", PostCategory::Discussion),
        ];
        let answer = generator.generate(Uuid::new_v4(), "garden", candidates).await.unwrap();
        assert!(answer.retrieved_posts.is_empty());
        assert!(!model.last_prompt().unwrap().contains("Title:"));
    }

    #[tokio::test]
    async fn malformed_reply_fails_and_logs_nothing() {
        let model = Arc::new(ScriptedModel::replying("I think the garden opens soon."));
        let log = Arc::new(MemoryLog::default());
        let generator = ResponseGenerator::new(model, log.clone());

        let err = generator.generate(Uuid::new_v4(), "garden", vec![]).await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
        assert_eq!(
            err.public_message(),
            "Failed to generate AI response: Failed to parse AI response"
        );
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn log_failure_does_not_block_answer() {
        let model = Arc::new(ScriptedModel::replying(REPLY));
        let generator = ResponseGenerator::new(model, Arc::new(MemoryLog::failing()));

        let answer = generator.generate(Uuid::new_v4(), "garden", vec![]).await.unwrap();
        assert_eq!(answer.text, "The community garden opens next month.");
    }

    #[tokio::test]
    async fn model_errors_surface() {
        let model = Arc::new(ScriptedModel::failing(AiError::Configuration("API key not valid".into())));
        let generator = ResponseGenerator::new(model, Arc::new(MemoryLog::default()));

        let err = generator.generate(Uuid::new_v4(), "garden", vec![]).await.unwrap_err();
        assert_eq!(err.public_message(), "AI service configuration error");
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_model_call() {
        let model = Arc::new(ScriptedModel::replying(REPLY));
        let generator = ResponseGenerator::new(model.clone(), Arc::new(MemoryLog::default()));

        let err = generator.generate(Uuid::new_v4(), "", vec![]).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidQuery));
        assert_eq!(model.calls(), 0);
    }
}
