use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use neighborly_db::Database;
use neighborly_types::models::{AiAnswer, AiInteraction};

use crate::error::AiError;
use crate::gemini::TextGenerator;
use crate::generator::ResponseGenerator;
use crate::retriever::PostRetriever;
use crate::store::{InteractionLog, PostStore, blocking};

/// How many interactions `recent_interactions` returns.
pub const RECENT_INTERACTIONS: u32 = 10;

/// Entry point used by the API layer: retrieval, generation and the
/// interaction log behind one handle.
pub struct AiService {
    retriever: PostRetriever,
    generator: ResponseGenerator,
    log: Arc<dyn InteractionLog>,
}

impl AiService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        log: Arc<dyn InteractionLog>,
        model: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            retriever: PostRetriever::new(posts),
            generator: ResponseGenerator::new(model, log.clone()),
            log,
        }
    }

    /// Wire the service to the portal database for both posts and the log.
    pub fn from_database(db: Arc<Database>, model: Arc<dyn TextGenerator>) -> Self {
        Self::new(db.clone(), db, model)
    }

    pub async fn community_query(&self, user_id: Uuid, input: &str) -> Result<AiAnswer, AiError> {
        info!("Community AI query from {}", user_id);
        let candidates = self.retriever.retrieve_relevant(input).await?;
        self.generator.generate(user_id, input, candidates).await
    }

    pub async fn recent_interactions(&self, user_id: Uuid) -> Result<Vec<AiInteraction>> {
        let log = self.log.clone();
        blocking(move || log.recent(user_id, RECENT_INTERACTIONS)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryLog, ScriptedModel};
    use neighborly_db::NewPost;
    use neighborly_types::models::{PostCategory, Role};

    const REPLY: &str =
        r#"{"response": "Plots open next month.", "followUpQuestions": ["Is there a waitlist?"]}"#;

    #[tokio::test]
    async fn end_to_end_against_database() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let author = db
            .create_user(&neighborly_db::NewUser {
                id: Uuid::new_v4(),
                username: "organizer",
                email: "organizer@example.com",
                password_hash: "x",
                role: Role::CommunityOrganizer,
            })
            .unwrap();
        for (title, content) in [
            ("Community Garden Opening Next Month", "Plots available"),
            ("Road Closures", "Main street repaving"),
        ] {
            db.insert_post(&NewPost {
                id: Uuid::new_v4(),
                author_id: author.id,
                title: title.into(),
                content: content.into(),
                category: PostCategory::News,
                linked_discussion_id: None,
            })
            .unwrap();
        }

        let service = AiService::from_database(db.clone(), Arc::new(ScriptedModel::replying(REPLY)));
        let user = Uuid::new_v4();
        let answer = service.community_query(user, "garden").await.unwrap();

        assert_eq!(answer.retrieved_posts.len(), 1);
        assert_eq!(answer.retrieved_posts[0].title, "Community Garden Opening Next Month");
        assert_eq!(answer.retrieved_posts[0].author.username, "organizer");

        let logged = service.recent_interactions(user).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].query, "garden");
        assert_eq!(logged[0].response, "Plots open next month.");
    }

    #[tokio::test]
    async fn recent_interactions_capped_at_ten() {
        let log = Arc::new(MemoryLog::default());
        let user = Uuid::new_v4();
        for i in 0..15 {
            log.record(user, &format!("q{i}"), "r").unwrap();
        }
        let service = AiService::new(
            Arc::new(crate::testing::StaticPosts(vec![])),
            log,
            Arc::new(ScriptedModel::replying(REPLY)),
        );

        let recent = service.recent_interactions(user).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].query, "q14");
    }
}
