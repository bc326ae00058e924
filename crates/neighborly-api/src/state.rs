use std::sync::Arc;

use tracing::error;

use neighborly_ai::AiService;
use neighborly_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub ai: AiService,
}

impl AppStateInner {
    /// Run a blocking DB call off the async runtime. Failures are logged
    /// and reported to the client as an opaque internal error.
    pub async fn run_db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(|e| {
                error!("Database error: {:#}", e);
                ApiError::Internal
            })
    }
}
