use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Enumerations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Resident,
    BusinessOwner,
    CommunityOrganizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::BusinessOwner => "business_owner",
            Self::CommunityOrganizer => "community_organizer",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resident" => Ok(Self::Resident),
            "business_owner" => Ok(Self::BusinessOwner),
            "community_organizer" => Ok(Self::CommunityOrganizer),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    News,
    Discussion,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Discussion => "discussion",
        }
    }
}

impl FromStr for PostCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news" => Ok(Self::News),
            "discussion" => Ok(Self::Discussion),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

// -- Entities --

/// Public view of a registered user. The password hash never leaves the db crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: Uuid,
    pub author: User,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    /// Ties a news post to the discussion it announces.
    pub linked_discussion_id: Option<Uuid>,
    pub ai_summary: Option<String>,
    /// Users who joined the discussion. Always empty for news posts.
    pub participants: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CommunityPost {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author.id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: Uuid,
    pub author: User,
    pub description: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl HelpRequest {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author.id == user_id
    }
}

/// One logged query/response exchange with the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiInteraction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Answer returned by the community assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnswer {
    pub text: String,
    pub suggested_questions: Vec<String>,
    pub retrieved_posts: Vec<CommunityPost>,
}
