use thiserror::Error;

use neighborly_ai::AiError;

/// Errors returned by resolvers. `Display` is exactly what the client sees,
/// so internal causes are logged where they occur and never formatted here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("{}", .0.public_message())]
    Ai(#[from] AiError),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}
