use std::sync::Arc;

use tracing::{debug, error};

use neighborly_types::models::CommunityPost;

use crate::error::AiError;
use crate::similarity::similarity;
use crate::store::{PostStore, blocking};

/// Upper bound on posts handed to the generator and returned to clients.
pub const MAX_RETRIEVED: usize = 5;

/// A post together with its similarity to the current query.
#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub post: CommunityPost,
    pub score: f64,
}

pub struct PostRetriever {
    store: Arc<dyn PostStore>,
}

impl PostRetriever {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Scores every stored post against `title content category` and returns
    /// the best [`MAX_RETRIEVED`], highest score first. Equal scores keep the
    /// store's order.
    pub async fn retrieve_relevant(&self, query: &str) -> Result<Vec<CommunityPost>, AiError> {
        if query.trim().is_empty() {
            return Err(AiError::InvalidQuery);
        }

        let store = self.store.clone();
        let posts = blocking(move || store.all_posts()).await.map_err(|e| {
            error!("Error fetching posts for retrieval: {:#}", e);
            AiError::Retrieval(e.to_string())
        })?;

        let total = posts.len();
        let ranked = rank(query, posts);
        debug!("Retrieved {} of {} posts for query", ranked.len(), total);

        Ok(ranked.into_iter().map(|s| s.post).collect())
    }
}

fn rank(query: &str, posts: Vec<CommunityPost>) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = posts
        .into_iter()
        .map(|post| {
            let text = format!("{} {} {}", post.title, post.content, post.category);
            ScoredPost {
                score: similarity(query, &text),
                post,
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(MAX_RETRIEVED);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, StaticPosts, post};
    use neighborly_types::models::PostCategory;

    #[tokio::test]
    async fn returns_at_most_five_sorted_by_score() {
        let posts = vec![
            post("Bake sale", "Cookies and cake", PostCategory::News),
            post("Garden tools", "Garden shed open", PostCategory::Discussion),
            post("Library hours", "Open late", PostCategory::News),
            post("Garden", "garden", PostCategory::News),
            post("Parking", "New rules", PostCategory::News),
            post("Noise", "Quiet hours", PostCategory::Discussion),
            post("Potluck", "Bring a dish", PostCategory::News),
        ];
        let retriever = PostRetriever::new(Arc::new(StaticPosts(posts)));

        let found = retriever.retrieve_relevant("garden").await.unwrap();
        assert_eq!(found.len(), MAX_RETRIEVED);
        assert_eq!(found[0].title, "Garden");
        assert_eq!(found[1].title, "Garden tools");

        let scores: Vec<f64> = found
            .iter()
            .map(|p| similarity("garden", &format!("{} {} {}", p.title, p.content, p.category)))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn ties_keep_store_order() {
        let posts = vec![
            post("Alpha", "one", PostCategory::News),
            post("Beta", "two", PostCategory::News),
            post("Gamma", "three", PostCategory::News),
        ];
        let retriever = PostRetriever::new(Arc::new(StaticPosts(posts)));

        let titles: Vec<String> = retriever
            .retrieve_relevant("unrelated")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn rejects_blank_query() {
        let retriever = PostRetriever::new(Arc::new(StaticPosts(vec![])));
        assert!(matches!(
            retriever.retrieve_relevant("  ").await,
            Err(AiError::InvalidQuery)
        ));
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let retriever = PostRetriever::new(Arc::new(FailingStore));
        let err = retriever.retrieve_relevant("garden").await.unwrap_err();
        assert!(matches!(err, AiError::Retrieval(_)));
        assert!(err.public_message().starts_with("Failed to retrieve relevant posts"));
    }
}
