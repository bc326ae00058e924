use async_graphql::{Context, ID, MaybeUndefined, Object, Result};
use tracing::info;
use uuid::Uuid;

use neighborly_db::{NewPost, PostChanges, PostFilter};
use neighborly_types::models::{CommunityPost, PostCategory};

use super::objects::PostObject;
use super::{app, parse_id, parse_opt_id, require_user};
use crate::error::ApiError;
use crate::state::AppStateInner;

#[derive(Default)]
pub struct PostQuery;

#[Object]
impl PostQuery {
    /// Posts filtered by category and/or author, newest first.
    async fn community_posts(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
        user_id: Option<ID>,
    ) -> Result<Vec<PostObject>> {
        let filter = PostFilter {
            category: category.as_deref().map(parse_category).transpose()?,
            author_id: parse_opt_id(user_id.as_ref())?,
        };
        let posts = app(ctx).run_db(move |db| db.list_posts(filter)).await?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    async fn community_post(&self, ctx: &Context<'_>, id: ID) -> Result<Option<PostObject>> {
        let id = parse_id(&id)?;
        let post = app(ctx).run_db(move |db| db.get_post(id)).await?;
        Ok(post.map(Into::into))
    }
}

#[derive(Default)]
pub struct PostMutation;

#[Object]
impl PostMutation {
    async fn create_community_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
        category: String,
        linked_discussion_id: Option<ID>,
    ) -> Result<PostObject> {
        let user = require_user(ctx)?;
        let state = app(ctx);

        let title = required_text("Title", &title)?.to_string();
        if content.trim().is_empty() {
            return Err(ApiError::bad_request("Content is required").into());
        }
        let category = parse_category(&category)?;
        let linked = parse_opt_id(linked_discussion_id.as_ref())?;
        if let Some(linked) = linked {
            ensure_discussion_exists(state, linked).await?;
        }

        let new_post = NewPost {
            id: Uuid::new_v4(),
            author_id: user.id,
            title,
            content,
            category,
            linked_discussion_id: linked,
        };
        let id = new_post.id;
        let post = state
            .run_db(move |db| {
                db.insert_post(&new_post)?;
                db.get_post(id)
            })
            .await?
            .ok_or(ApiError::Internal)?;

        info!("User {} created {} post {}", user.id, post.category, post.id);
        Ok(post.into())
    }

    async fn update_community_post(
        &self,
        ctx: &Context<'_>,
        id: ID,
        title: Option<String>,
        content: Option<String>,
        category: Option<String>,
        linked_discussion_id: MaybeUndefined<ID>,
    ) -> Result<PostObject> {
        let user = require_user(ctx)?;
        let state = app(ctx);
        let id = parse_id(&id)?;

        let post = load_post(state, id).await?;
        if !post.is_authored_by(user.id) {
            return Err(ApiError::NotAuthorized.into());
        }

        let changes = PostChanges {
            title: title
                .as_deref()
                .map(|t| required_text("Title", t).map(str::to_string))
                .transpose()?,
            content: match content {
                Some(c) if c.trim().is_empty() => {
                    return Err(ApiError::bad_request("Content is required").into());
                }
                other => other,
            },
            category: category.as_deref().map(parse_category).transpose()?,
            linked_discussion_id: match linked_discussion_id {
                MaybeUndefined::Undefined => None,
                MaybeUndefined::Null => Some(None),
                MaybeUndefined::Value(linked) => Some(Some(parse_id(&linked)?)),
            },
        };
        if let Some(Some(linked)) = changes.linked_discussion_id {
            if linked == id {
                return Err(ApiError::bad_request("A post cannot link to itself").into());
            }
            ensure_discussion_exists(state, linked).await?;
        }

        let post = state
            .run_db(move |db| {
                db.update_post(id, &changes)?;
                db.get_post(id)
            })
            .await?
            .ok_or(ApiError::NotFound("Post"))?;
        Ok(post.into())
    }

    async fn delete_community_post(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let user = require_user(ctx)?;
        let state = app(ctx);
        let id = parse_id(&id)?;

        let post = load_post(state, id).await?;
        if !post.is_authored_by(user.id) {
            return Err(ApiError::NotAuthorized.into());
        }

        state.run_db(move |db| db.delete_post(id)).await?;
        info!("User {} deleted post {}", user.id, id);
        Ok(true)
    }

    /// Adds the caller to a discussion. Joining twice is a no-op.
    async fn join_discussion(&self, ctx: &Context<'_>, post_id: ID) -> Result<PostObject> {
        let user_id = require_user(ctx)?.id;
        let state = app(ctx);
        let post_id = parse_id(&post_id)?;

        ensure_discussion(&load_post(state, post_id).await?)?;
        let post = state
            .run_db(move |db| {
                db.add_participant(post_id, user_id)?;
                db.get_post(post_id)
            })
            .await?
            .ok_or(ApiError::NotFound("Post"))?;
        Ok(post.into())
    }

    /// Removes the caller from a discussion. Leaving twice is a no-op.
    async fn leave_discussion(&self, ctx: &Context<'_>, post_id: ID) -> Result<PostObject> {
        let user_id = require_user(ctx)?.id;
        let state = app(ctx);
        let post_id = parse_id(&post_id)?;

        ensure_discussion(&load_post(state, post_id).await?)?;
        let post = state
            .run_db(move |db| {
                db.remove_participant(post_id, user_id)?;
                db.get_post(post_id)
            })
            .await?
            .ok_or(ApiError::NotFound("Post"))?;
        Ok(post.into())
    }
}

fn parse_category(raw: &str) -> Result<PostCategory, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Category must be 'news' or 'discussion'"))
}

fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(trimmed)
}

async fn load_post(state: &AppStateInner, id: Uuid) -> Result<CommunityPost, ApiError> {
    state
        .run_db(move |db| db.get_post(id))
        .await?
        .ok_or(ApiError::NotFound("Post"))
}

fn ensure_discussion(post: &CommunityPost) -> Result<(), ApiError> {
    if post.category != PostCategory::Discussion {
        return Err(ApiError::bad_request("This post is not a discussion"));
    }
    Ok(())
}

async fn ensure_discussion_exists(state: &AppStateInner, id: Uuid) -> Result<(), ApiError> {
    match state.run_db(move |db| db.get_post(id)).await? {
        Some(post) if post.category == PostCategory::Discussion => Ok(()),
        _ => Err(ApiError::bad_request("Linked discussion not found")),
    }
}
