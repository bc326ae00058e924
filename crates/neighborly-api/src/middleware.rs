use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use neighborly_types::models::User;

use crate::auth::decode_token;
use crate::error::ApiError;
use crate::state::AppState;

/// The caller of the current request, if a valid bearer token named an
/// existing user.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn require(&self) -> Result<&User, ApiError> {
        self.0.as_ref().ok_or(ApiError::NotAuthenticated)
    }
}

/// Resolve the bearer token, if any, into a [`CurrentUser`] extension.
///
/// Never rejects a request: a missing, malformed or expired token, or one
/// whose user no longer exists, leaves the request unauthenticated and each
/// resolver decides what that means.
pub async fn attach_user(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = match bearer_token(req.headers()) {
        Some(token) => resolve_user(&state, token).await,
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

async fn resolve_user(state: &AppState, token: String) -> Option<User> {
    let claims = match decode_token(&state.jwt_secret, &token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Ignoring bearer token: {}", e);
            return None;
        }
    };

    let user_id = claims.sub;
    match state.run_db(move |db| db.get_user(user_id)).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            debug!("Token subject {} has no user", user_id);
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Extension, Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;
    use uuid::Uuid;

    use neighborly_ai::{AiService, GeminiClient, GeminiConfig};
    use neighborly_db::{Database, NewUser};
    use neighborly_types::models::Role;

    use super::*;
    use crate::auth::create_token;
    use crate::state::AppStateInner;

    const SECRET: &str = "test-secret";

    fn state() -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let model = Arc::new(GeminiClient::new(GeminiConfig::default()).unwrap());
        Arc::new(AppStateInner {
            ai: AiService::from_database(db.clone(), model),
            db,
            jwt_secret: SECRET.to_string(),
        })
    }

    async fn whoami(Extension(user): Extension<CurrentUser>) -> String {
        user.0.map(|u| u.username).unwrap_or_else(|| "anonymous".into())
    }

    async fn call(state: &AppState, auth: Option<String>) -> (StatusCode, String) {
        let app = Router::new()
            .route("/", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), attach_user));

        let mut req = axum::http::Request::builder().uri("/");
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_attaches_user() {
        let state = state();
        let user = state
            .db
            .create_user(&NewUser {
                id: Uuid::new_v4(),
                username: "amara",
                email: "amara@example.com",
                password_hash: "x",
                role: Role::Resident,
            })
            .unwrap();
        let token = create_token(SECRET, user.id, &user.username).unwrap();

        let (status, body) = call(&state, Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "amara");
    }

    #[tokio::test]
    async fn bad_or_missing_tokens_downgrade_silently() {
        let state = state();
        let orphan = create_token(SECRET, Uuid::new_v4(), "ghost").unwrap();
        let foreign = create_token("other-secret", Uuid::new_v4(), "eve").unwrap();

        for auth in [
            None,
            Some("Bearer not-a-jwt".to_string()),
            Some(format!("Bearer {orphan}")),
            Some(format!("Bearer {foreign}")),
            Some(format!("Token {orphan}")),
        ] {
            let (status, body) = call(&state, auth).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "anonymous");
        }
    }
}
