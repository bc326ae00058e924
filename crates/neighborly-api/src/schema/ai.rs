use async_graphql::{Context, ID, Object, Result};
use tracing::error;

use super::objects::{AiInteractionObject, AiResponseObject};
use super::{app, parse_id, require_user};
use crate::error::ApiError;

#[derive(Default)]
pub struct AiQuery;

#[Object]
impl AiQuery {
    /// Ask the community assistant. Requires authentication.
    #[graphql(name = "communityAIQuery")]
    async fn community_ai_query(&self, ctx: &Context<'_>, input: String) -> Result<AiResponseObject> {
        let user = require_user(ctx)?;

        let answer = app(ctx).ai.community_query(user.id, &input).await.map_err(|e| {
            error!("Error in communityAIQuery: {}", e);
            ApiError::from(e)
        })?;
        Ok(answer.into())
    }

    /// The ten most recent assistant exchanges of a user, newest first.
    async fn ai_interactions(&self, ctx: &Context<'_>, user_id: ID) -> Result<Vec<AiInteractionObject>> {
        require_user(ctx)?;
        let user_id = parse_id(&user_id)?;

        let interactions = app(ctx).ai.recent_interactions(user_id).await.map_err(|e| {
            error!("Error loading AI interactions: {:#}", e);
            ApiError::Internal
        })?;
        Ok(interactions.into_iter().map(Into::into).collect())
    }
}
