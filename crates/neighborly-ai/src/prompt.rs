//! Prompt rendering for the community assistant.

use std::fmt::Write;

use neighborly_types::models::CommunityPost;

use crate::retriever::ScoredPost;

/// Render one post as a context block. `score` adds a relevance percentage.
pub fn format_post_for_context(post: &CommunityPost, score: Option<f64>) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Title: {}", post.title);
    let _ = writeln!(out, "Author: {}", post.author.username);
    let _ = writeln!(out, "Category: {}", post.category);
    let _ = writeln!(out, "Content: {}", post.content);
    if let Some(score) = score {
        let _ = writeln!(out, "Relevance: {:.1}%", score * 100.0);
    }
    out.push_str("---");
    out
}

/// Build the assistant prompt from the query and the posts ranked against it.
pub fn build_prompt(query: &str, posts: &[ScoredPost]) -> String {
    let context = if posts.is_empty() {
        "(no community posts are available)".to_string()
    } else {
        posts
            .iter()
            .map(|s| format_post_for_context(&s.post, Some(s.score)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are the assistant of a neighborhood community portal. You help residents by drawing on what their neighbors have posted and by keeping the conversation going.

Community posts, most relevant to the question first:
{context}

User question: "{query}"

Instructions:
1. Lean on the posts with the highest relevance percentages
2. Answer the question directly and specifically
3. Mention specific posts and their authors where they help
4. If nothing posted is relevant, say so and give general guidance instead
5. Suggest follow-up questions grounded in the question and the posts

Keep the answer specific to this question; avoid generic replies.

Reply with a single JSON object and nothing else (no Markdown), shaped like this:
{{
  "response": "your answer",
  "followUpQuestions": [
    "a follow-up question about your answer",
    "a question exploring a related topic",
    "a question that narrows or widens the discussion"
  ]
}}"#
    )
}
