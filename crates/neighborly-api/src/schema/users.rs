use async_graphql::{Context, ID, Object, Result};
use tracing::info;
use uuid::Uuid;

use neighborly_db::NewUser;
use neighborly_types::models::Role;

use super::objects::{AuthPayload, UserObject};
use super::{app, caller, parse_id};
use crate::auth::{create_token, hash_password, validate_registration, verify_password};
use crate::error::ApiError;

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// The authenticated caller, or null.
    async fn me(&self, ctx: &Context<'_>) -> Option<UserObject> {
        caller(ctx).cloned().map(Into::into)
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<UserObject>> {
        let users = app(ctx).run_db(|db| db.list_users()).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<UserObject>> {
        let id = parse_id(&id)?;
        let user = app(ctx).run_db(move |db| db.get_user(id)).await?;
        Ok(user.map(Into::into))
    }
}

#[derive(Default)]
pub struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn register(
        &self,
        ctx: &Context<'_>,
        username: String,
        email: String,
        password: String,
        role: String,
    ) -> Result<AuthPayload> {
        let state = app(ctx);
        let username = username.trim().to_string();
        let email = email.trim().to_lowercase();
        validate_registration(&username, &email, &password)?;
        let role: Role = role.parse().map_err(|_| ApiError::bad_request("Invalid role"))?;

        let password_hash = hash_password(&password).map_err(|e| {
            tracing::error!("{:#}", e);
            ApiError::Internal
        })?;

        let user = state
            .run_db(move |db| {
                if db.get_user_by_username(&username)?.is_some() {
                    return Ok(Err(ApiError::Conflict("Username is already taken".into())));
                }
                if db.get_user_by_email(&email)?.is_some() {
                    return Ok(Err(ApiError::Conflict("Email is already registered".into())));
                }
                let created = db.create_user(&NewUser {
                    id: Uuid::new_v4(),
                    username: &username,
                    email: &email,
                    password_hash: &password_hash,
                    role,
                });
                match created {
                    Ok(user) => Ok(Ok(user)),
                    // Lost a race with a concurrent registration.
                    Err(e) if neighborly_db::is_constraint_violation(&e) => Ok(Err(
                        ApiError::Conflict("Username or email is already registered".into()),
                    )),
                    Err(e) => Err(e),
                }
            })
            .await??;

        info!("Registered user {} ({})", user.username, user.id);
        let token = issue_token(&state.jwt_secret, user.id, &user.username)?;
        Ok(AuthPayload {
            token,
            user: user.into(),
        })
    }

    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthPayload> {
        let state = app(ctx);
        let email = email.trim().to_lowercase();

        let row = state
            .run_db(move |db| db.get_user_by_email(&email))
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !verify_password(&password, &row.password) {
            return Err(ApiError::InvalidCredentials.into());
        }

        let user = row.into_user().map_err(|e| {
            tracing::error!("Corrupt user row: {:#}", e);
            ApiError::Internal
        })?;
        let token = issue_token(&state.jwt_secret, user.id, &user.username)?;
        Ok(AuthPayload {
            token,
            user: user.into(),
        })
    }

    /// Tokens are stateless; clients discard theirs.
    async fn logout(&self) -> bool {
        true
    }
}

fn issue_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    create_token(secret, user_id, username).map_err(|e| {
        tracing::error!("Token creation failed: {:#}", e);
        ApiError::Internal
    })
}
