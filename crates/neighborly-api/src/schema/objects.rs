//! GraphQL output types and their conversions from domain models.

use async_graphql::{ID, SimpleObject};
use chrono::{DateTime, SecondsFormat, Utc};

use neighborly_types::models::{AiAnswer, AiInteraction, CommunityPost, HelpRequest, User};

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: ID,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserObject {
    fn from(user: User) -> Self {
        Self {
            id: ID(user.id.to_string()),
            role: user.role.to_string(),
            created_at: timestamp(user.created_at),
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "CommunityPost")]
pub struct PostObject {
    pub id: ID,
    pub author: UserObject,
    pub title: String,
    pub content: String,
    pub category: String,
    pub linked_discussion_id: Option<ID>,
    pub ai_summary: Option<String>,
    pub participants: Vec<UserObject>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<CommunityPost> for PostObject {
    fn from(post: CommunityPost) -> Self {
        Self {
            id: ID(post.id.to_string()),
            author: post.author.into(),
            title: post.title,
            content: post.content,
            category: post.category.to_string(),
            linked_discussion_id: post.linked_discussion_id.map(|id| ID(id.to_string())),
            ai_summary: post.ai_summary,
            participants: post.participants.into_iter().map(Into::into).collect(),
            created_at: timestamp(post.created_at),
            updated_at: post.updated_at.map(timestamp),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "HelpRequest")]
pub struct HelpRequestObject {
    pub id: ID,
    pub author: UserObject,
    pub description: String,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<HelpRequest> for HelpRequestObject {
    fn from(req: HelpRequest) -> Self {
        Self {
            id: ID(req.id.to_string()),
            author: req.author.into(),
            description: req.description,
            location: req.location,
            created_at: timestamp(req.created_at),
            updated_at: req.updated_at.map(timestamp),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "AIResponse")]
pub struct AiResponseObject {
    pub text: String,
    pub suggested_questions: Vec<String>,
    pub retrieved_posts: Vec<PostObject>,
}

impl From<AiAnswer> for AiResponseObject {
    fn from(answer: AiAnswer) -> Self {
        Self {
            text: answer.text,
            suggested_questions: answer.suggested_questions,
            retrieved_posts: answer.retrieved_posts.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "AIInteraction")]
pub struct AiInteractionObject {
    pub id: ID,
    pub user_id: ID,
    pub query: String,
    pub response: String,
    pub created_at: String,
}

impl From<AiInteraction> for AiInteractionObject {
    fn from(i: AiInteraction) -> Self {
        Self {
            id: ID(i.id.to_string()),
            user_id: ID(i.user_id.to_string()),
            query: i.query,
            response: i.response,
            created_at: timestamp(i.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserObject,
}
