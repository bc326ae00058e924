use serde::Deserialize;

use crate::error::AiError;

/// Structured answer the model is instructed to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
    pub response: String,
    pub follow_up_questions: Vec<String>,
}

/// Parse the model's raw text, tolerating one surrounding Markdown code fence.
pub fn parse_model_reply(raw: &str) -> Result<ModelReply, AiError> {
    let body = strip_code_fence(raw);

    let reply: ModelReply =
        serde_json::from_str(body).map_err(|e| AiError::Parse(e.to_string()))?;

    if reply.response.trim().is_empty() {
        return Err(AiError::Parse("empty response field".into()));
    }

    Ok(reply)
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the rest of the opening fence line (the optional language tag).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
