//! Community assistant: ranks stored posts against a question with a
//! bag-of-words overlap score, asks a hosted text model to answer from them,
//! and keeps an append-only log of every exchange.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod reply;
pub mod retriever;
pub mod service;
pub mod similarity;
pub mod store;

pub use error::AiError;
pub use gemini::{GeminiClient, GeminiConfig, TextGenerator};
pub use generator::ResponseGenerator;
pub use retriever::PostRetriever;
pub use service::AiService;
pub use similarity::similarity;
pub use store::{InteractionLog, PostStore};

#[cfg(test)]
mod testing;
