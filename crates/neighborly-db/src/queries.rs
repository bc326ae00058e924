use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

use neighborly_types::models::{AiInteraction, CommunityPost, HelpRequest, PostCategory, User};

use crate::Database;
use crate::models::{
    HelpRequestChanges, HelpRequestRow, InteractionRow, NewHelpRequest, NewPost, NewUser,
    ParticipantRow, PostChanges, PostFilter, PostRow, UserRow, now_timestamp, parse_id,
    parse_timestamp,
};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password, u.role, u.created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<User> {
        let created_at = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    created_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(User {
            id: user.id,
            username: user.username.to_string(),
            email: user.email.to_string(),
            role: user.role,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_where(conn, "u.id = ?1", &id.to_string()))?
            .map(UserRow::into_user)
            .transpose()
    }

    /// Returns the raw row, password hash included, for credential checks.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_where(conn, "u.email = ?1", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_where(conn, "u.username = ?1", username))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u ORDER BY u.created_at, u.rowid"
            ))?;
            let rows = stmt
                .query_map([], |row| user_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    // -- Community posts --

    /// Inserts a post. A discussion starts with its author as the only participant.
    pub fn insert_post(&self, post: &NewPost) -> Result<()> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO community_posts
                    (id, author_id, title, content, category, linked_discussion_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    post.id.to_string(),
                    post.author_id.to_string(),
                    post.title,
                    post.content,
                    post.category.as_str(),
                    post.linked_discussion_id.map(|id| id.to_string()),
                    now,
                ],
            )?;
            if post.category == PostCategory::Discussion {
                tx.execute(
                    "INSERT INTO post_participants (post_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![post.id.to_string(), post.author_id.to_string(), now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<CommunityPost>> {
        let (rows, participants) = self.with_conn(|conn| {
            let rows = query_posts(conn, Some("p.id = ?1"), vec![Box::new(id.to_string())])?;
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let participants = query_participants(conn, &ids)?;
            Ok((rows, participants))
        })?;

        Ok(assemble_posts(rows, participants)?.into_iter().next())
    }

    /// All posts matching `filter`, newest first.
    pub fn list_posts(&self, filter: PostFilter) -> Result<Vec<CommunityPost>> {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(category) = filter.category {
            params.push(Box::new(category.as_str()));
            clauses.push(format!("p.category = ?{}", params.len()));
        }
        if let Some(author_id) = filter.author_id {
            params.push(Box::new(author_id.to_string()));
            clauses.push(format!("p.author_id = ?{}", params.len()));
        }
        let where_clause = (!clauses.is_empty()).then(|| clauses.join(" AND "));

        let (rows, participants) = self.with_conn(|conn| {
            let rows = query_posts(conn, where_clause.as_deref(), params)?;
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let participants = query_participants(conn, &ids)?;
            Ok((rows, participants))
        })?;

        assemble_posts(rows, participants)
    }

    /// Applies the provided fields and bumps `updated_at`. Switching a post to
    /// news drops its participants.
    pub fn update_post(&self, id: Uuid, changes: &PostChanges) -> Result<()> {
        let now = now_timestamp();
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE community_posts SET
                    title = COALESCE(?2, title),
                    content = COALESCE(?3, content),
                    category = COALESCE(?4, category),
                    linked_discussion_id = CASE WHEN ?5 THEN ?6 ELSE linked_discussion_id END,
                    updated_at = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.title,
                    changes.content,
                    changes.category.map(|c| c.as_str()),
                    changes.linked_discussion_id.is_some(),
                    changes.linked_discussion_id.flatten().map(|l| l.to_string()),
                    now,
                ],
            )?;
            if changes.category == Some(PostCategory::News) {
                tx.execute("DELETE FROM post_participants WHERE post_id = ?1", [&id])?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Returns false when no such post existed.
    pub fn delete_post(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM community_posts WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    /// Adds a participant; already-present members are left as they are.
    /// Returns whether a row was inserted.
    pub fn add_participant(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO post_participants (post_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id.to_string(), user_id.to_string(), now],
            )?;
            if inserted > 0 {
                touch_post(conn, post_id, &now)?;
            }
            Ok(inserted > 0)
        })
    }

    /// Removes a participant. Returns whether a row was deleted.
    pub fn remove_participant(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM post_participants WHERE post_id = ?1 AND user_id = ?2",
                rusqlite::params![post_id.to_string(), user_id.to_string()],
            )?;
            if removed > 0 {
                touch_post(conn, post_id, &now)?;
            }
            Ok(removed > 0)
        })
    }

    // -- Help requests --

    pub fn insert_help_request(&self, req: &NewHelpRequest) -> Result<()> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO help_requests (id, author_id, description, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    req.id.to_string(),
                    req.author_id.to_string(),
                    req.description,
                    req.location,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_help_request(&self, id: Uuid) -> Result<Option<HelpRequest>> {
        let rows = self.with_conn(|conn| {
            query_help_requests(conn, Some("h.id = ?1"), vec![Box::new(id.to_string())])
        })?;

        rows.into_iter().next().map(help_request_from_row).transpose()
    }

    /// All help requests, optionally limited to one author, newest first.
    pub fn list_help_requests(&self, author_id: Option<Uuid>) -> Result<Vec<HelpRequest>> {
        let rows = self.with_conn(|conn| match author_id {
            Some(author_id) => query_help_requests(
                conn,
                Some("h.author_id = ?1"),
                vec![Box::new(author_id.to_string())],
            ),
            None => query_help_requests(conn, None, Vec::new()),
        })?;

        rows.into_iter().map(help_request_from_row).collect()
    }

    pub fn update_help_request(&self, id: Uuid, changes: &HelpRequestChanges) -> Result<()> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE help_requests SET
                    description = COALESCE(?2, description),
                    location = CASE WHEN ?3 THEN ?4 ELSE location END,
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    changes.description,
                    changes.location.is_some(),
                    changes.location.as_ref().and_then(|l| l.as_deref()),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_help_request(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM help_requests WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    // -- AI interactions --

    /// Appends one exchange to the interaction log. The log is never updated.
    pub fn insert_interaction(&self, user_id: Uuid, query: &str, response: &str) -> Result<AiInteraction> {
        let id = Uuid::new_v4();
        let created_at = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO ai_interactions (id, user_id, query, response, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id.to_string(), user_id.to_string(), query, response, created_at],
            )?;
            Ok(())
        })?;

        Ok(AiInteraction {
            id,
            user_id,
            query: query.to_string(),
            response: response.to_string(),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    /// The `limit` most recent interactions of one user, newest first.
    pub fn recent_interactions(&self, user_id: Uuid, limit: u32) -> Result<Vec<AiInteraction>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, query, response, created_at
                 FROM ai_interactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string(), limit], |row| {
                    Ok(InteractionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        query: row.get(2)?,
                        response: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(AiInteraction {
                    id: parse_id(&row.id)?,
                    user_id: parse_id(&row.user_id)?,
                    query: row.query,
                    response: row.response,
                    created_at: parse_timestamp(&row.created_at)?,
                })
            })
            .collect()
    }
}

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        username: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        password: row.get(offset + 3)?,
        role: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
    })
}

fn query_user_where(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u WHERE {predicate}"))?;

    let row = stmt.query_row([value], |row| user_from_row(row, 0)).optional()?;

    Ok(row)
}

fn touch_post(conn: &Connection, post_id: Uuid, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE community_posts SET updated_at = ?2 WHERE id = ?1",
        rusqlite::params![post_id.to_string(), now],
    )?;
    Ok(())
}

fn query_posts(
    conn: &Connection,
    where_clause: Option<&str>,
    params: Vec<Box<dyn ToSql>>,
) -> Result<Vec<PostRow>> {
    // JOIN users to fetch the author in a single query
    let sql = format!(
        "SELECT p.id, p.title, p.content, p.category, p.linked_discussion_id, p.ai_summary,
                p.created_at, p.updated_at, {USER_COLUMNS}
         FROM community_posts p
         JOIN users u ON p.author_id = u.id
         {}
         ORDER BY p.created_at DESC, p.rowid DESC",
        where_clause.map(|w| format!("WHERE {w}")).unwrap_or_default()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(PostRow {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                category: row.get(3)?,
                linked_discussion_id: row.get(4)?,
                ai_summary: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
                author: user_from_row(row, 8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Batch-fetch participants for a set of post IDs, in join order.
fn query_participants(conn: &Connection, post_ids: &[String]) -> Result<Vec<ParticipantRow>> {
    if post_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT pp.post_id, {USER_COLUMNS}
         FROM post_participants pp
         JOIN users u ON pp.user_id = u.id
         WHERE pp.post_id IN ({})
         ORDER BY pp.joined_at, pp.rowid",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(post_ids.iter()), |row| {
            Ok(ParticipantRow {
                post_id: row.get(0)?,
                user: user_from_row(row, 1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn assemble_posts(rows: Vec<PostRow>, participants: Vec<ParticipantRow>) -> Result<Vec<CommunityPost>> {
    let mut by_post: HashMap<String, Vec<User>> = HashMap::new();
    for p in participants {
        by_post.entry(p.post_id).or_default().push(p.user.into_user()?);
    }

    rows.into_iter()
        .map(|row| {
            Ok(CommunityPost {
                id: parse_id(&row.id)?,
                participants: by_post.remove(&row.id).unwrap_or_default(),
                author: row.author.into_user()?,
                title: row.title,
                content: row.content,
                category: row.category.parse::<PostCategory>()?,
                linked_discussion_id: row.linked_discussion_id.as_deref().map(parse_id).transpose()?,
                ai_summary: row.ai_summary,
                created_at: parse_timestamp(&row.created_at)?,
                updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
            })
        })
        .collect()
}

fn query_help_requests(
    conn: &Connection,
    where_clause: Option<&str>,
    params: Vec<Box<dyn ToSql>>,
) -> Result<Vec<HelpRequestRow>> {
    let sql = format!(
        "SELECT h.id, h.description, h.location, h.created_at, h.updated_at, {USER_COLUMNS}
         FROM help_requests h
         JOIN users u ON h.author_id = u.id
         {}
         ORDER BY h.created_at DESC, h.rowid DESC",
        where_clause.map(|w| format!("WHERE {w}")).unwrap_or_default()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(HelpRequestRow {
                id: row.get(0)?,
                description: row.get(1)?,
                location: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                author: user_from_row(row, 5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn help_request_from_row(row: HelpRequestRow) -> Result<HelpRequest> {
    Ok(HelpRequest {
        id: parse_id(&row.id)?,
        author: row.author.into_user()?,
        description: row.description,
        location: row.location,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
    })
}
