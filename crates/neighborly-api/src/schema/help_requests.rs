use async_graphql::{Context, ID, MaybeUndefined, Object, Result};
use tracing::info;
use uuid::Uuid;

use neighborly_db::{HelpRequestChanges, NewHelpRequest};
use neighborly_types::models::HelpRequest;

use super::objects::HelpRequestObject;
use super::{app, parse_id, parse_opt_id, require_user};
use crate::error::ApiError;
use crate::state::AppStateInner;

#[derive(Default)]
pub struct HelpRequestQuery;

#[Object]
impl HelpRequestQuery {
    async fn help_requests(&self, ctx: &Context<'_>, user_id: Option<ID>) -> Result<Vec<HelpRequestObject>> {
        let author_id = parse_opt_id(user_id.as_ref())?;
        let requests = app(ctx).run_db(move |db| db.list_help_requests(author_id)).await?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    async fn help_request(&self, ctx: &Context<'_>, id: ID) -> Result<Option<HelpRequestObject>> {
        let id = parse_id(&id)?;
        let request = app(ctx).run_db(move |db| db.get_help_request(id)).await?;
        Ok(request.map(Into::into))
    }
}

#[derive(Default)]
pub struct HelpRequestMutation;

#[Object]
impl HelpRequestMutation {
    async fn create_help_request(
        &self,
        ctx: &Context<'_>,
        description: String,
        location: Option<String>,
    ) -> Result<HelpRequestObject> {
        let user = require_user(ctx)?;
        if description.trim().is_empty() {
            return Err(ApiError::bad_request("Description is required").into());
        }

        let new_request = NewHelpRequest {
            id: Uuid::new_v4(),
            author_id: user.id,
            description,
            location: clean_location(location),
        };
        let id = new_request.id;
        let request = app(ctx)
            .run_db(move |db| {
                db.insert_help_request(&new_request)?;
                db.get_help_request(id)
            })
            .await?
            .ok_or(ApiError::Internal)?;

        info!("User {} created help request {}", user.id, id);
        Ok(request.into())
    }

    async fn update_help_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        description: Option<String>,
        location: MaybeUndefined<String>,
    ) -> Result<HelpRequestObject> {
        let user = require_user(ctx)?;
        let state = app(ctx);
        let id = parse_id(&id)?;

        let request = load_help_request(state, id).await?;
        if !request.is_authored_by(user.id) {
            return Err(ApiError::NotAuthorized.into());
        }
        if description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(ApiError::bad_request("Description is required").into());
        }

        let changes = HelpRequestChanges {
            description,
            location: match location {
                MaybeUndefined::Undefined => None,
                MaybeUndefined::Null => Some(None),
                MaybeUndefined::Value(l) => Some(clean_location(Some(l))),
            },
        };
        let request = state
            .run_db(move |db| {
                db.update_help_request(id, &changes)?;
                db.get_help_request(id)
            })
            .await?
            .ok_or(ApiError::NotFound("Help request"))?;
        Ok(request.into())
    }

    async fn delete_help_request(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let user = require_user(ctx)?;
        let state = app(ctx);
        let id = parse_id(&id)?;

        let request = load_help_request(state, id).await?;
        if !request.is_authored_by(user.id) {
            return Err(ApiError::NotAuthorized.into());
        }

        state.run_db(move |db| db.delete_help_request(id)).await?;
        info!("User {} deleted help request {}", user.id, id);
        Ok(true)
    }
}

/// Blank locations are stored as absent.
fn clean_location(location: Option<String>) -> Option<String> {
    location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

async fn load_help_request(state: &AppStateInner, id: Uuid) -> Result<HelpRequest, ApiError> {
    state
        .run_db(move |db| db.get_help_request(id))
        .await?
        .ok_or(ApiError::NotFound("Help request"))
}
