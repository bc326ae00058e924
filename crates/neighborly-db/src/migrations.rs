use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE community_posts (
                id                    TEXT PRIMARY KEY,
                author_id             TEXT NOT NULL REFERENCES users(id),
                title                 TEXT NOT NULL,
                content               TEXT NOT NULL,
                category              TEXT NOT NULL CHECK (category IN ('news', 'discussion')),
                linked_discussion_id  TEXT REFERENCES community_posts(id) ON DELETE SET NULL,
                ai_summary            TEXT,
                created_at            TEXT NOT NULL,
                updated_at            TEXT
            );

            CREATE INDEX idx_posts_created
                ON community_posts(created_at);

            CREATE TABLE post_participants (
                post_id     TEXT NOT NULL REFERENCES community_posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                joined_at   TEXT NOT NULL,
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE help_requests (
                id           TEXT PRIMARY KEY,
                author_id    TEXT NOT NULL REFERENCES users(id),
                description  TEXT NOT NULL,
                location     TEXT,
                created_at   TEXT NOT NULL,
                updated_at   TEXT
            );

            CREATE TABLE ai_interactions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                query       TEXT NOT NULL,
                response    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_ai_interactions_user
                ON ai_interactions(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
