use crate::Database;
use crate::models::{
    ConversationRow, LastMessageRow, MessageRow, MessageViewRow, NewMessage, TaskRow, UserRow,
};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        username: &str,
        password_hash: &str,
        role: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, name, username, password_hash, role, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.prepare(
                "SELECT id, name, username, password_hash, role, created_at
                 FROM users WHERE username = ?1",
            )?
            .query_row([username], map_user)
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.prepare(
                "SELECT id, name, username, password_hash, role, created_at
                 FROM users WHERE id = ?1",
            )?
            .query_row([id], map_user)
            .optional()
            .map_err(Into::into)
        })
    }

    /// Removes a user; the owning conversation and its messages go with it
    /// (ON DELETE CASCADE). Returns false when no such user existed.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_writer(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn list_employees(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, username, password_hash, role, created_at
                 FROM users WHERE role = 'employee' ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn has_admin(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')",
                [],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Conversations --

    /// Returns the conversation for `user_id`, inserting one first if absent.
    /// Two racing first contacts both land here; the UNIQUE(user_id)
    /// constraint makes the second insert a no-op and the follow-up select
    /// hands both callers the same row.
    pub fn resolve_or_create_conversation(
        &self,
        candidate_id: &str,
        user_id: &str,
        now: &str,
    ) -> Result<ConversationRow> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO NOTHING",
                params![candidate_id, user_id, now],
            )?;
            query_conversation(conn, "user_id", user_id)?
                .ok_or_else(|| anyhow!("conversation vanished after upsert for user {}", user_id))
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, "id", id))
    }

    pub fn list_conversations(&self) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, last_message_at, unread_admin, unread_user, created_at
                 FROM conversations",
            )?;
            let rows = stmt
                .query_map([], map_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recent message of a conversation: latest `created_at`, ties
    /// broken by highest id.
    pub fn last_message(&self, conversation_id: &str) -> Result<Option<LastMessageRow>> {
        self.with_conn(|conn| {
            conn.prepare(
                "SELECT m.id, m.body, m.sender_party, u.name, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON u.id = m.sender_id
                 WHERE m.conversation_id = ?1
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT 1",
            )?
            .query_row([conversation_id], |row| {
                Ok(LastMessageRow {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    sender_party: row.get(2)?,
                    sender_name: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()
            .map_err(Into::into)
        })
    }

    // -- Messages --

    /// Conversation a message belongs to, for reply-reference validation.
    pub fn message_conversation(&self, message_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT conversation_id FROM messages WHERE id = ?1",
                [message_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Inserts a message and, in the same transaction, advances the owning
    /// conversation's `last_message_at` and bumps the unread counter of the
    /// party opposite the sender. The increment is relative; concurrent
    /// appends cannot lose updates.
    ///
    /// `created_at` is clamped to never precede the conversation's current
    /// `last_message_at`, keeping history order aligned with id order even
    /// if the clock steps backwards.
    pub fn insert_message(&self, msg: &NewMessage<'_>, now: &str) -> Result<MessageRow> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;

            let last: Option<String> = tx
                .query_row(
                    "SELECT last_message_at FROM conversations WHERE id = ?1",
                    [msg.conversation_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| anyhow!("conversation {} not found", msg.conversation_id))?;

            let created_at = match last {
                Some(prev) if prev.as_str() > now => prev,
                _ => now.to_string(),
            };

            let (media_url, media_filename, media_size) = match &msg.media {
                Some(m) => (Some(m.url), Some(m.filename), Some(m.size)),
                None => (None, None, None),
            };

            tx.execute(
                "INSERT INTO messages
                    (conversation_id, sender_id, sender_party, body, kind,
                     reply_to_id, task_id, media_url, media_filename, media_size,
                     is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
                params![
                    msg.conversation_id,
                    msg.sender_id,
                    msg.sender_party,
                    msg.body,
                    msg.kind,
                    msg.reply_to_id,
                    msg.task_id,
                    media_url,
                    media_filename,
                    media_size,
                    created_at,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let bump_sql = if msg.sender_party == "admin" {
                "UPDATE conversations SET last_message_at = ?1, unread_user = unread_user + 1
                 WHERE id = ?2"
            } else {
                "UPDATE conversations SET last_message_at = ?1, unread_admin = unread_admin + 1
                 WHERE id = ?2"
            };
            tx.execute(bump_sql, params![created_at, msg.conversation_id])?;

            tx.commit()?;

            Ok(MessageRow {
                id,
                conversation_id: msg.conversation_id.to_string(),
                sender_id: msg.sender_id.to_string(),
                sender_party: msg.sender_party.to_string(),
                body: msg.body.map(str::to_string),
                kind: msg.kind.to_string(),
                reply_to_id: msg.reply_to_id,
                task_id: msg.task_id,
                media_url: media_url.map(str::to_string),
                media_filename: media_filename.map(str::to_string),
                media_size,
                is_read: false,
                created_at,
            })
        })
    }

    /// Message history in creation order, joined with sender names, reply
    /// targets and referenced tasks in a single query (no N+1).
    pub fn history(
        &self,
        conversation_id: &str,
        limit: u32,
        ascending: bool,
    ) -> Result<Vec<MessageViewRow>> {
        let sql = if ascending {
            "SELECT m.id, m.conversation_id, m.sender_id, m.sender_party, m.body, m.kind,
                    m.reply_to_id, m.task_id, m.media_url, m.media_filename, m.media_size,
                    m.is_read, m.created_at,
                    su.name,
                    r.id, r.body, r.sender_party, ru.name, r.created_at,
                    t.name
             FROM messages m
             LEFT JOIN users su ON su.id = m.sender_id
             LEFT JOIN messages r ON r.id = m.reply_to_id
             LEFT JOIN users ru ON ru.id = r.sender_id
             LEFT JOIN tasks t ON t.id = m.task_id
             WHERE m.conversation_id = ?1
             ORDER BY m.created_at ASC, m.id ASC
             LIMIT ?2"
        } else {
            "SELECT m.id, m.conversation_id, m.sender_id, m.sender_party, m.body, m.kind,
                    m.reply_to_id, m.task_id, m.media_url, m.media_filename, m.media_size,
                    m.is_read, m.created_at,
                    su.name,
                    r.id, r.body, r.sender_party, ru.name, r.created_at,
                    t.name
             FROM messages m
             LEFT JOIN users su ON su.id = m.sender_id
             LEFT JOIN messages r ON r.id = m.reply_to_id
             LEFT JOIN users ru ON ru.id = r.sender_id
             LEFT JOIN tasks t ON t.id = m.task_id
             WHERE m.conversation_id = ?1
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?2"
        };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![conversation_id, limit], |row| {
                    Ok(MessageViewRow {
                        message: MessageRow {
                            id: row.get(0)?,
                            conversation_id: row.get(1)?,
                            sender_id: row.get(2)?,
                            sender_party: row.get(3)?,
                            body: row.get(4)?,
                            kind: row.get(5)?,
                            reply_to_id: row.get(6)?,
                            task_id: row.get(7)?,
                            media_url: row.get(8)?,
                            media_filename: row.get(9)?,
                            media_size: row.get(10)?,
                            is_read: row.get(11)?,
                            created_at: row.get(12)?,
                        },
                        sender_name: row.get(13)?,
                        reply_id: row.get(14)?,
                        reply_body: row.get(15)?,
                        reply_party: row.get(16)?,
                        reply_sender_name: row.get(17)?,
                        reply_created_at: row.get(18)?,
                        task_name: row.get(19)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Read state --

    /// Flags every unread message from the opposite party as read and zeroes
    /// the reader's unread counter, atomically. Returns false when the
    /// conversation does not exist.
    pub fn mark_read(&self, conversation_id: &str, reader_party: &str) -> Result<bool> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                [conversation_id],
                |r| r.get(0),
            )?;
            if !exists {
                return Ok(false);
            }

            let (flag_sql, reset_sql) = if reader_party == "admin" {
                (
                    "UPDATE messages SET is_read = 1
                     WHERE conversation_id = ?1 AND sender_party = 'employee' AND is_read = 0",
                    "UPDATE conversations SET unread_admin = 0 WHERE id = ?1",
                )
            } else {
                (
                    "UPDATE messages SET is_read = 1
                     WHERE conversation_id = ?1 AND sender_party = 'admin' AND is_read = 0",
                    "UPDATE conversations SET unread_user = 0 WHERE id = ?1",
                )
            };
            tx.execute(flag_sql, [conversation_id])?;
            tx.execute(reset_sql, [conversation_id])?;

            tx.commit()?;
            Ok(true)
        })
    }

    // -- Retention --

    /// Media URLs of messages strictly older than the cutoff, for the blob
    /// phase of the sweep.
    pub fn media_urls_before(&self, cutoff: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT media_url FROM messages
                 WHERE created_at < ?1 AND media_url IS NOT NULL",
            )?;
            let urls = stmt
                .query_map([cutoff], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(urls)
        })
    }

    pub fn delete_messages_before(&self, cutoff: &str) -> Result<usize> {
        self.with_writer(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE created_at < ?1", [cutoff])?;
            Ok(n)
        })
    }

    pub fn delete_time_records_before(&self, cutoff_date: &str) -> Result<usize> {
        self.with_writer(|conn| {
            let n = conn.execute("DELETE FROM time_records WHERE date < ?1", [cutoff_date])?;
            Ok(n)
        })
    }

    pub fn delete_task_completions_before(&self, cutoff_date: &str) -> Result<usize> {
        self.with_writer(|conn| {
            let n = conn.execute("DELETE FROM task_completions WHERE date < ?1", [cutoff_date])?;
            Ok(n)
        })
    }

    // -- Attendance --

    pub fn upsert_time_record(
        &self,
        user_id: &str,
        date: &str,
        period: &str,
        time: &str,
    ) -> Result<()> {
        let sql = match period {
            "morning" => {
                "INSERT INTO time_records (user_id, date, morning_time) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, date) DO UPDATE SET morning_time = excluded.morning_time"
            }
            "afternoon" => {
                "INSERT INTO time_records (user_id, date, afternoon_time) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, date) DO UPDATE SET afternoon_time = excluded.afternoon_time"
            }
            other => return Err(anyhow!("unknown day period: {}", other)),
        };
        self.with_writer(|conn| {
            conn.execute(sql, params![user_id, date, time])?;
            Ok(())
        })
    }

    pub fn upsert_task_completion(
        &self,
        user_id: &str,
        task_id: i64,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO task_completions (user_id, task_id, date, completed)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, task_id, date) DO UPDATE SET completed = excluded.completed",
                params![user_id, task_id, date, completed],
            )?;
            Ok(())
        })
    }

    // -- Tasks --

    pub fn create_task(
        &self,
        name: &str,
        period: Option<&str>,
        deadline: Option<&str>,
        now: &str,
    ) -> Result<TaskRow> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO tasks (name, period, deadline, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![name, period, deadline, now],
            )?;
            Ok(TaskRow {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                period: period.map(str::to_string),
                deadline: deadline.map(str::to_string),
                created_at: now.to_string(),
            })
        })
    }

    pub fn update_task(
        &self,
        id: i64,
        name: Option<&str>,
        period: Option<&str>,
        deadline: Option<&str>,
    ) -> Result<bool> {
        self.with_writer(|conn| {
            let n = conn.execute(
                "UPDATE tasks SET
                    name = COALESCE(?2, name),
                    period = COALESCE(?3, period),
                    deadline = COALESCE(?4, deadline)
                 WHERE id = ?1",
                params![id, name, period, deadline],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_task(&self, id: i64) -> Result<bool> {
        self.with_writer(|conn| {
            let n = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        self.with_conn(|conn| {
            conn.prepare("SELECT id, name, period, deadline, created_at FROM tasks WHERE id = ?1")?
                .query_row([id], |row| {
                    Ok(TaskRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        period: row.get(2)?,
                        deadline: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .optional()
                .map_err(Into::into)
        })
    }

    pub fn insert_task_evidence(
        &self,
        user_id: &str,
        task_id: i64,
        image_url: &str,
        observation: Option<&str>,
        now: &str,
    ) -> Result<i64> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO task_evidence (user_id, task_id, image_url, observation, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, task_id, image_url, observation, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}

fn query_conversation(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<ConversationRow>> {
    // `column` is always a literal from this module, never caller input.
    let sql = format!(
        "SELECT id, user_id, last_message_at, unread_admin, unread_user, created_at
         FROM conversations WHERE {} = ?1",
        column
    );
    conn.prepare(&sql)?
        .query_row([value], map_conversation)
        .optional()
        .map_err(Into::into)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        last_message_at: row.get(2)?,
        unread_admin: row.get(3)?,
        unread_user: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmt_ts;
    use crate::models::NewMessage;
    use chrono::{TimeZone, Utc};

    fn ts(h: u32, m: u32, s: u32) -> String {
        fmt_ts(Utc.with_ymd_and_hms(2025, 5, 10, h, m, s).unwrap())
    }

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u-admin", "Dana", "dana", "x", "admin", &ts(8, 0, 0))
            .unwrap();
        db.create_user("u-ana", "Ana", "ana", "x", "employee", &ts(8, 0, 0))
            .unwrap();
        db.create_user("u-beto", "Beto", "beto", "x", "employee", &ts(8, 0, 0))
            .unwrap();
        db
    }

    fn text_message<'a>(conversation_id: &'a str, sender: &'a str, party: &'a str) -> NewMessage<'a> {
        NewMessage {
            conversation_id,
            sender_id: sender,
            sender_party: party,
            body: Some("hola"),
            kind: "text",
            reply_to_id: None,
            task_id: None,
            media: None,
        }
    }

    #[test]
    fn resolve_or_create_is_idempotent() {
        let db = db_with_users();
        let a = db
            .resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        let b = db
            .resolve_or_create_conversation("c-other", "u-ana", &ts(9, 5, 0))
            .unwrap();
        assert_eq!(a.id, "c-1");
        assert_eq!(b.id, "c-1");
        assert_eq!(db.list_conversations().unwrap().len(), 1);
    }

    #[test]
    fn insert_bumps_opposite_counter_and_last_message_at() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();

        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();
        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 2, 0))
            .unwrap();
        db.insert_message(&text_message("c-1", "u-admin", "admin"), &ts(9, 3, 0))
            .unwrap();

        let conv = db.get_conversation("c-1").unwrap().unwrap();
        assert_eq!(conv.unread_admin, 2);
        assert_eq!(conv.unread_user, 1);
        assert_eq!(conv.last_message_at.as_deref(), Some(ts(9, 3, 0).as_str()));
    }

    #[test]
    fn created_at_never_regresses_within_a_conversation() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();

        let first = db
            .insert_message(&text_message("c-1", "u-ana", "employee"), &ts(10, 0, 0))
            .unwrap();
        // Clock stepped backwards between appends.
        let second = db
            .insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 30, 0))
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(second.created_at, first.created_at);

        let rows = db.history("c-1", 10, true).unwrap();
        let times: Vec<_> = rows.iter().map(|r| r.message.created_at.clone()).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn mark_read_flags_opposite_messages_and_resets_counter() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();
        db.insert_message(&text_message("c-1", "u-admin", "admin"), &ts(9, 2, 0))
            .unwrap();

        assert!(db.mark_read("c-1", "admin").unwrap());

        let conv = db.get_conversation("c-1").unwrap().unwrap();
        assert_eq!(conv.unread_admin, 0);
        assert_eq!(conv.unread_user, 1);

        let rows = db.history("c-1", 10, true).unwrap();
        let employee_msg = rows.iter().find(|r| r.message.sender_party == "employee").unwrap();
        let admin_msg = rows.iter().find(|r| r.message.sender_party == "admin").unwrap();
        assert!(employee_msg.message.is_read);
        assert!(!admin_msg.message.is_read);

        assert!(!db.mark_read("c-missing", "admin").unwrap());
    }

    #[test]
    fn history_resolves_reply_and_task_references() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        let task = db
            .create_task("Inventario", Some("daily"), None, &ts(8, 0, 0))
            .unwrap();

        let first = db
            .insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();
        db.insert_message(
            &NewMessage {
                conversation_id: "c-1",
                sender_id: "u-admin",
                sender_party: "admin",
                body: Some("visto"),
                kind: "text",
                reply_to_id: Some(first.id),
                task_id: Some(task.id),
                media: None,
            },
            &ts(9, 2, 0),
        )
        .unwrap();

        let rows = db.history("c-1", 10, true).unwrap();
        assert_eq!(rows.len(), 2);
        let reply = &rows[1];
        assert_eq!(reply.reply_id, Some(first.id));
        assert_eq!(reply.reply_body.as_deref(), Some("hola"));
        assert_eq!(reply.reply_party.as_deref(), Some("employee"));
        assert_eq!(reply.reply_sender_name.as_deref(), Some("Ana"));
        assert_eq!(reply.task_name.as_deref(), Some("Inventario"));
    }

    #[test]
    fn deleted_reply_target_degrades_to_null_preview() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        let first = db
            .insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();
        db.insert_message(
            &NewMessage {
                reply_to_id: Some(first.id),
                ..text_message("c-1", "u-admin", "admin")
            },
            &ts(11, 0, 0),
        )
        .unwrap();

        // Retention removes the target; the reply row survives with a NULL
        // reference instead of a dangling one.
        let deleted = db.delete_messages_before(&ts(10, 0, 0)).unwrap();
        assert_eq!(deleted, 1);

        let rows = db.history("c-1", 10, true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message.reply_to_id, None);
        assert!(rows[0].reply_id.is_none());
        assert!(rows[0].reply_body.is_none());
    }

    #[test]
    fn last_message_breaks_timestamp_ties_by_id() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        // Same clock reading for both appends.
        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();
        let second = db
            .insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();

        let last = db.last_message("c-1").unwrap().unwrap();
        assert_eq!(last.id, second.id);
        assert_eq!(last.sender_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn retention_queries_select_and_delete_by_cutoff() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        db.insert_message(
            &NewMessage {
                media: Some(crate::models::NewMedia {
                    url: "https://files.test/chat-uploads/chat-media/c-1/a.jpg",
                    filename: "a.jpg",
                    size: 10,
                }),
                kind: "image",
                ..text_message("c-1", "u-ana", "employee")
            },
            &ts(9, 1, 0),
        )
        .unwrap();
        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(12, 0, 0))
            .unwrap();

        let cutoff = ts(10, 0, 0);
        let urls = db.media_urls_before(&cutoff).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(db.delete_messages_before(&cutoff).unwrap(), 1);
        assert_eq!(db.delete_messages_before(&cutoff).unwrap(), 0);
        assert!(db.media_urls_before(&cutoff).unwrap().is_empty());
    }

    #[test]
    fn attendance_upserts_are_keyed() {
        let db = db_with_users();
        db.upsert_time_record("u-ana", "2025-05-10", "morning", "08:05")
            .unwrap();
        db.upsert_time_record("u-ana", "2025-05-10", "morning", "08:10")
            .unwrap();
        db.upsert_time_record("u-ana", "2025-05-10", "afternoon", "14:00")
            .unwrap();

        let (morning, afternoon): (Option<String>, Option<String>) = db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT morning_time, afternoon_time FROM time_records
                     WHERE user_id = 'u-ana' AND date = '2025-05-10'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(morning.as_deref(), Some("08:10"));
        assert_eq!(afternoon.as_deref(), Some("14:00"));

        db.upsert_task_completion("u-ana", 7, "2025-05-10", true).unwrap();
        db.upsert_task_completion("u-ana", 7, "2025-05-10", false).unwrap();
        assert_eq!(db.delete_task_completions_before("2025-05-11").unwrap(), 1);
        assert_eq!(db.delete_time_records_before("2025-05-11").unwrap(), 1);
    }

    #[test]
    fn deleting_a_user_cascades_conversation_and_messages() {
        let db = db_with_users();
        db.resolve_or_create_conversation("c-1", "u-ana", &ts(9, 0, 0))
            .unwrap();
        db.insert_message(&text_message("c-1", "u-ana", "employee"), &ts(9, 1, 0))
            .unwrap();

        assert!(db.delete_user("u-ana").unwrap());
        assert!(db.get_conversation("c-1").unwrap().is_none());
        assert!(db.history("c-1", 10, true).unwrap().is_empty());
        assert!(!db.delete_user("u-ana").unwrap());
    }
}
