//! Database row types — these map directly to SQLite rows. Timestamps stay
//! as stored strings here; parsing to chrono types happens at the service
//! layer so corrupt rows degrade with a warning instead of failing a query.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

pub struct ConversationRow {
    pub id: String,
    pub user_id: String,
    pub last_message_at: Option<String>,
    pub unread_admin: i64,
    pub unread_user: i64,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_party: String,
    pub body: Option<String>,
    pub kind: String,
    pub reply_to_id: Option<i64>,
    pub task_id: Option<i64>,
    pub media_url: Option<String>,
    pub media_filename: Option<String>,
    pub media_size: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
}

/// History row: the message joined with its sender name, reply target and
/// referenced task. Reply fields are all-or-nothing; a target deleted by
/// retention leaves them NULL.
pub struct MessageViewRow {
    pub message: MessageRow,
    pub sender_name: Option<String>,
    pub reply_id: Option<i64>,
    pub reply_body: Option<String>,
    pub reply_party: Option<String>,
    pub reply_sender_name: Option<String>,
    pub reply_created_at: Option<String>,
    pub task_name: Option<String>,
}

/// Most recent message of a conversation, for the admin listing.
pub struct LastMessageRow {
    pub id: i64,
    pub body: Option<String>,
    pub sender_party: String,
    pub sender_name: Option<String>,
    pub created_at: String,
}

pub struct TaskRow {
    pub id: i64,
    pub name: String,
    pub period: Option<String>,
    pub deadline: Option<String>,
    pub created_at: String,
}

/// Input for a message insert. Media fields are present together or not at
/// all.
pub struct NewMessage<'a> {
    pub conversation_id: &'a str,
    pub sender_id: &'a str,
    pub sender_party: &'a str,
    pub body: Option<&'a str>,
    pub kind: &'a str,
    pub reply_to_id: Option<i64>,
    pub task_id: Option<i64>,
    pub media: Option<NewMedia<'a>>,
}

pub struct NewMedia<'a> {
    pub url: &'a str,
    pub filename: &'a str,
    pub size: i64,
}
