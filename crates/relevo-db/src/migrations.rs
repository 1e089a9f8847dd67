use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                role            TEXT NOT NULL CHECK (role IN ('admin', 'employee')),
                created_at      TEXT NOT NULL
            );

            -- One conversation per user; the UNIQUE constraint is what makes
            -- concurrent first-contact creation collapse to a single row.
            CREATE TABLE conversations (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                last_message_at TEXT,
                unread_admin    INTEGER NOT NULL DEFAULT 0,
                unread_user     INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL,
                sender_party    TEXT NOT NULL CHECK (sender_party IN ('admin', 'employee')),
                body            TEXT,
                kind            TEXT NOT NULL CHECK (kind IN ('text', 'image', 'video')),
                reply_to_id     INTEGER REFERENCES messages(id) ON DELETE SET NULL,
                task_id         INTEGER,
                media_url       TEXT,
                media_filename  TEXT,
                media_size      INTEGER,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at, id);
            CREATE INDEX idx_messages_created
                ON messages(created_at);

            CREATE TABLE tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                period          TEXT,
                deadline        TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE time_records (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date            TEXT NOT NULL,
                morning_time    TEXT,
                afternoon_time  TEXT,
                UNIQUE (user_id, date)
            );

            CREATE TABLE task_completions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                task_id         INTEGER NOT NULL,
                date            TEXT NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 1,
                UNIQUE (user_id, task_id, date)
            );

            CREATE TABLE task_evidence (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                task_id         INTEGER NOT NULL,
                image_url       TEXT NOT NULL,
                observation     TEXT,
                created_at      TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
