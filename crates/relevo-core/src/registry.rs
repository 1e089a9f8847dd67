use std::cmp::Ordering;
use std::collections::HashMap;

use relevo_db::fmt_ts;
use relevo_db::models::ConversationRow;
use relevo_types::models::{AdminConversation, Conversation, UserSummary};
use uuid::Uuid;

use crate::convert::{conversation_from_row, last_message_preview, parse_uuid};
use crate::{Core, Error, Result};

impl Core {
    /// Returns the user's conversation, creating it on first contact.
    /// Idempotent under races: the UNIQUE(user_id) constraint collapses
    /// concurrent creations onto one row and both callers read it back.
    pub fn resolve_or_create(&self, user_id: Uuid) -> Result<Conversation> {
        let uid = user_id.to_string();
        self.db
            .get_user_by_id(&uid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("user"))?;

        let candidate = Uuid::new_v4().to_string();
        let now = fmt_ts(self.clock.now());
        let row = self
            .db
            .resolve_or_create_conversation(&candidate, &uid, &now)
            .map_err(Error::Db)?;
        Ok(conversation_from_row(row))
    }

    /// Admin inbox: one entry per employee, merging persisted conversations
    /// with placeholders for employees who have never messaged. Recently
    /// active conversations come first (newest on top); everyone without a
    /// message yet follows, alphabetically by display name.
    pub fn list_for_admin(&self) -> Result<Vec<AdminConversation>> {
        let employees = self.db.list_employees().map_err(Error::Db)?;
        let mut by_user: HashMap<String, ConversationRow> = self
            .db
            .list_conversations()
            .map_err(Error::Db)?
            .into_iter()
            .map(|c| (c.user_id.clone(), c))
            .collect();

        let mut entries = Vec::with_capacity(employees.len());
        for user in employees {
            let summary = UserSummary {
                id: parse_uuid(&user.id),
                name: user.name,
                username: user.username,
            };
            match by_user.remove(&summary.id.to_string()) {
                Some(conv) => {
                    let last_message = self
                        .db
                        .last_message(&conv.id)
                        .map_err(Error::Db)?
                        .map(last_message_preview);
                    entries.push(AdminConversation::Active {
                        conversation: conversation_from_row(conv),
                        user: summary,
                        last_message,
                    });
                }
                None => entries.push(AdminConversation::Placeholder { user: summary }),
            }
        }

        entries.sort_by(|a, b| match (a.last_message_at(), b.last_message_at()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.user().name.cmp(&b.user().name),
        });
        Ok(entries)
    }
}
