//! Row-to-domain conversions. Stored data is trusted but not blindly:
//! a corrupt value degrades to a default with a warning instead of
//! failing the whole query.

use relevo_db::models::{ConversationRow, LastMessageRow, MessageRow, MessageViewRow, TaskRow};
use relevo_db::parse_ts;
use relevo_types::models::{
    Conversation, MediaDescriptor, Message, MessageKind, MessagePreview, MessageView, Party, Task,
    TaskSummary,
};
use tracing::warn;
use uuid::Uuid;

/// Longest reply-preview body shown in history entries.
const SNIPPET_MAX_CHARS: usize = 120;

pub(crate) fn parse_uuid(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}': {}", raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_party(raw: &str) -> Party {
    Party::from_str(raw).unwrap_or_else(|| {
        warn!("Corrupt party '{}'", raw);
        Party::Employee
    })
}

fn parse_kind(raw: &str) -> MessageKind {
    MessageKind::from_str(raw).unwrap_or_else(|| {
        warn!("Corrupt message kind '{}'", raw);
        MessageKind::Text
    })
}

pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_MAX_CHARS).collect()
}

pub(crate) fn conversation_from_row(row: ConversationRow) -> Conversation {
    Conversation {
        id: parse_uuid(&row.id),
        user_id: parse_uuid(&row.user_id),
        last_message_at: row.last_message_at.as_deref().map(parse_ts),
        unread_for_admin: row.unread_admin,
        unread_for_user: row.unread_user,
        created_at: parse_ts(&row.created_at),
    }
}

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    let media = match (row.media_url, row.media_filename, row.media_size) {
        (Some(url), Some(filename), Some(size)) => Some(MediaDescriptor {
            url,
            filename,
            size: size.max(0) as u64,
        }),
        _ => None,
    };
    Message {
        id: row.id,
        conversation_id: parse_uuid(&row.conversation_id),
        sender_id: parse_uuid(&row.sender_id),
        sender_party: parse_party(&row.sender_party),
        body: row.body,
        kind: parse_kind(&row.kind),
        reply_to_id: row.reply_to_id,
        task_id: row.task_id,
        media,
        is_read: row.is_read,
        created_at: parse_ts(&row.created_at),
    }
}

pub(crate) fn message_view_from_row(row: MessageViewRow) -> MessageView {
    let reply_to = match (row.reply_id, row.reply_party, row.reply_created_at) {
        (Some(id), Some(party), Some(created_at)) => Some(MessagePreview {
            id,
            snippet: row.reply_body.as_deref().map(snippet),
            sender_party: parse_party(&party),
            sender_name: row.reply_sender_name,
            created_at: parse_ts(&created_at),
        }),
        _ => None,
    };
    let task = match (row.message.task_id, row.task_name) {
        // A deleted task degrades the same way a deleted reply target does.
        (Some(id), Some(name)) => Some(TaskSummary { id, name }),
        _ => None,
    };
    MessageView {
        message: message_from_row(row.message),
        sender_name: row.sender_name,
        reply_to,
        task,
    }
}

pub(crate) fn last_message_preview(row: LastMessageRow) -> MessagePreview {
    MessagePreview {
        id: row.id,
        snippet: row.body.as_deref().map(snippet),
        sender_party: parse_party(&row.sender_party),
        sender_name: row.sender_name,
        created_at: parse_ts(&row.created_at),
    }
}

pub(crate) fn task_from_row(row: TaskRow) -> Task {
    Task {
        id: row.id,
        name: row.name,
        period: row.period,
        deadline: row.deadline,
        created_at: parse_ts(&row.created_at),
    }
}
