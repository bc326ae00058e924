use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AiError {
    #[error("Invalid query provided")]
    InvalidQuery,

    #[error("{0}")]
    Retrieval(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Failed to parse AI response")]
    Parse(String),
}

impl AiError {
    /// Message safe to hand to API clients. Configuration problems are
    /// reported without detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidQuery => self.to_string(),
            Self::Retrieval(msg) => format!("Failed to retrieve relevant posts: {}", msg),
            Self::Configuration(_) => "AI service configuration error".to_string(),
            Self::Upstream(_) | Self::Parse(_) => format!("Failed to generate AI response: {}", self),
        }
    }
}
