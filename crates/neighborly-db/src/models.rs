//! Database row types and write payloads. Rows map directly to SQLite
//! columns and are converted into `neighborly-types` models at the edge of
//! this crate.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use neighborly_types::models::{PostCategory, Role, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            role: self
                .role
                .parse::<Role>()
                .with_context(|| format!("corrupt role on user '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            email: self.email,
        })
    }
}

pub(crate) struct PostRow {
    pub id: String,
    pub author: UserRow,
    pub title: String,
    pub content: String,
    pub category: String,
    pub linked_discussion_id: Option<String>,
    pub ai_summary: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub(crate) struct ParticipantRow {
    pub post_id: String,
    pub user: UserRow,
}

pub(crate) struct HelpRequestRow {
    pub id: String,
    pub author: UserRow,
    pub description: String,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub(crate) struct InteractionRow {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub created_at: String,
}

// -- Write payloads --

pub struct NewUser<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

pub struct NewPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub linked_discussion_id: Option<Uuid>,
}

/// Partial update; `None` leaves the column untouched. For nullable columns
/// `Some(None)` clears the value.
#[derive(Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<PostCategory>,
    pub linked_discussion_id: Option<Option<Uuid>>,
}

#[derive(Default, Clone, Copy)]
pub struct PostFilter {
    pub category: Option<PostCategory>,
    pub author_id: Option<Uuid>,
}

pub struct NewHelpRequest {
    pub id: Uuid,
    pub author_id: Uuid,
    pub description: String,
    pub location: Option<String>,
}

#[derive(Default)]
pub struct HelpRequestChanges {
    pub description: Option<String>,
    pub location: Option<Option<String>>,
}

// -- Column helpers --

/// Timestamps are written by the application, not SQLite, so that lexical
/// order matches time order down to the millisecond.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>()
        .with_context(|| format!("corrupt id '{}'", raw))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite3 shell use datetime('now').
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}
