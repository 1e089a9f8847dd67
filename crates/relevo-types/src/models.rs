use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One side of a conversation. Doubles as the user role: the single
/// administrator account talks to employee accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Admin,
    Employee,
}

impl Party {
    pub fn as_str(self) -> &'static str {
        match self {
            Party::Admin => "admin",
            Party::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Party::Admin),
            "employee" => Some(Party::Employee),
            _ => None,
        }
    }

    /// The other side of the conversation.
    pub fn opposite(self) -> Self {
        match self {
            Party::Admin => Party::Employee,
            Party::Employee => Party::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            "video" => Some(MessageKind::Video),
            _ => None,
        }
    }

    /// Content type implied when a media file carries no explicit one.
    pub fn default_content_type(self) -> Option<&'static str> {
        match self {
            MessageKind::Text => None,
            MessageKind::Image => Some("image/jpeg"),
            MessageKind::Video => Some("video/mp4"),
        }
    }
}

/// Half-day slot of a time record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

impl DayPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            DayPeriod::Morning => "morning",
            DayPeriod::Afternoon => "afternoon",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: Party,
    pub created_at: DateTime<Utc>,
}

/// The slice of a user embedded in conversation listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_for_admin: i64,
    pub unread_for_user: i64,
    pub created_at: DateTime<Utc>,
}

/// Remote file attached to an image or video message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub url: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_party: Party,
    pub body: Option<String>,
    pub kind: MessageKind,
    pub reply_to_id: Option<i64>,
    pub task_id: Option<i64>,
    pub media: Option<MediaDescriptor>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Short form of a message shown in reply previews and conversation lists.
/// The referenced message may since have been deleted by retention, in which
/// case the whole preview is absent rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub id: i64,
    pub snippet: Option<String>,
    pub sender_party: Party,
    pub sender_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
}

/// A history entry: the message plus its resolved references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: Option<String>,
    pub reply_to: Option<MessagePreview>,
    pub task: Option<TaskSummary>,
}

/// One entry of the administrator conversation list. Employees who have
/// never exchanged a message get a `Placeholder` with no persisted row, so
/// callers cannot mistake one for a real conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AdminConversation {
    Active {
        conversation: Conversation,
        user: UserSummary,
        last_message: Option<MessagePreview>,
    },
    Placeholder {
        user: UserSummary,
    },
}

impl AdminConversation {
    pub fn user(&self) -> &UserSummary {
        match self {
            AdminConversation::Active { user, .. } => user,
            AdminConversation::Placeholder { user } => user,
        }
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AdminConversation::Active { conversation, .. } => conversation.last_message_at,
            AdminConversation::Placeholder { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub period: Option<String>,
    pub deadline: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_opposite_flips() {
        assert_eq!(Party::Admin.opposite(), Party::Employee);
        assert_eq!(Party::Employee.opposite(), Party::Admin);
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for p in [Party::Admin, Party::Employee] {
            assert_eq!(Party::from_str(p.as_str()), Some(p));
        }
        for k in [MessageKind::Text, MessageKind::Image, MessageKind::Video] {
            assert_eq!(MessageKind::from_str(k.as_str()), Some(k));
        }
        assert_eq!(Party::from_str("moderator"), None);
        assert_eq!(MessageKind::from_str("audio"), None);
    }
}
