use anyhow::{Result, anyhow};
use uuid::Uuid;

use neighborly_db::{Database, PostFilter};
use neighborly_types::models::{AiInteraction, CommunityPost};

/// Source of candidate posts for retrieval.
pub trait PostStore: Send + Sync + 'static {
    /// Every stored post, newest first.
    fn all_posts(&self) -> Result<Vec<CommunityPost>>;
}

/// Append-only record of assistant exchanges.
pub trait InteractionLog: Send + Sync + 'static {
    fn record(&self, user_id: Uuid, query: &str, response: &str) -> Result<()>;

    /// The `limit` most recent exchanges of one user, newest first.
    fn recent(&self, user_id: Uuid, limit: u32) -> Result<Vec<AiInteraction>>;
}

impl PostStore for Database {
    fn all_posts(&self) -> Result<Vec<CommunityPost>> {
        self.list_posts(PostFilter::default())
    }
}

impl InteractionLog for Database {
    fn record(&self, user_id: Uuid, query: &str, response: &str) -> Result<()> {
        self.insert_interaction(user_id, query, response).map(|_| ())
    }

    fn recent(&self, user_id: Uuid, limit: u32) -> Result<Vec<AiInteraction>> {
        self.recent_interactions(user_id, limit)
    }
}

/// Run a synchronous store call off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}
