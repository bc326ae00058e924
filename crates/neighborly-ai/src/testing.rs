//! Fakes shared by this crate's tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use neighborly_types::models::{AiInteraction, CommunityPost, PostCategory, Role, User};

use crate::error::AiError;
use crate::gemini::TextGenerator;
use crate::store::{InteractionLog, PostStore};

pub(crate) fn post(title: &str, content: &str, category: PostCategory) -> CommunityPost {
    CommunityPost {
        id: Uuid::new_v4(),
        author: User {
            id: Uuid::new_v4(),
            username: "tester".into(),
            email: "tester@example.com".into(),
            role: Role::Resident,
            created_at: Utc::now(),
        },
        title: title.into(),
        content: content.into(),
        category,
        linked_discussion_id: None,
        ai_summary: None,
        participants: vec![],
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub(crate) struct StaticPosts(pub Vec<CommunityPost>);

impl PostStore for StaticPosts {
    fn all_posts(&self) -> Result<Vec<CommunityPost>> {
        Ok(self.0.clone())
    }
}

pub(crate) struct FailingStore;

impl PostStore for FailingStore {
    fn all_posts(&self) -> Result<Vec<CommunityPost>> {
        Err(anyhow!("disk I/O error"))
    }
}

pub(crate) struct ScriptedModel {
    reply: Result<String, AiError>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(text.to_string()))
    }

    pub fn failing(err: AiError) -> Self {
        Self::with(Err(err))
    }

    fn with(reply: Result<String, AiError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone()
    }
}

#[derive(Default)]
pub(crate) struct MemoryLog {
    records: Mutex<Vec<(Uuid, String, String)>>,
    fail: bool,
}

impl MemoryLog {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<(Uuid, String, String)> {
        self.records.lock().unwrap().clone()
    }
}

impl InteractionLog for MemoryLog {
    fn record(&self, user_id: Uuid, query: &str, response: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("database is locked"));
        }
        self.records
            .lock()
            .unwrap()
            .push((user_id, query.to_string(), response.to_string()));
        Ok(())
    }

    fn recent(&self, user_id: Uuid, limit: u32) -> Result<Vec<AiInteraction>> {
        Ok(self
            .records()
            .into_iter()
            .rev()
            .filter(|(uid, _, _)| *uid == user_id)
            .take(limit as usize)
            .map(|(user_id, query, response)| AiInteraction {
                id: Uuid::new_v4(),
                user_id,
                query,
                response,
                created_at: Utc::now(),
            })
            .collect())
    }
}
