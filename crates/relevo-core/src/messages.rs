use chrono::{DateTime, Utc};
use relevo_db::fmt_ts;
use relevo_db::models::{NewMedia, NewMessage};
use relevo_store::{StoredBlob, UploadCategory, policy};
use relevo_types::models::{Message, MessageKind, MessageView, Party};
use tracing::warn;
use uuid::Uuid;

use crate::convert::{message_from_row, message_view_from_row};
use crate::{CHAT_BUCKET, Core, Error, Result};

/// A file arriving with a message, before it reaches the blob store.
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
}

pub struct AppendMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_party: Party,
    pub body: Option<String>,
    pub kind: MessageKind,
    pub reply_to_id: Option<i64>,
    pub task_id: Option<i64>,
    pub media: Option<MediaUpload>,
}

impl Core {
    /// Appends a message to a conversation.
    ///
    /// The attachment (if any) is uploaded before the row exists, so a
    /// rejected or failed upload never leaves a message pointing at nothing;
    /// conversely a failed insert removes the fresh blob again. The row
    /// insert, the `last_message_at` update and the opposite-party unread
    /// increment commit atomically.
    pub fn append(&self, req: AppendMessage) -> Result<Message> {
        if req.kind == MessageKind::Text && req.media.is_some() {
            return Err(Error::InvalidArgument(
                "a text message cannot carry a media file".into(),
            ));
        }
        if let Some(media) = &req.media {
            let want_image = req.kind == MessageKind::Image;
            if policy::is_image_type(&media.content_type) != want_image {
                return Err(Error::InvalidArgument(format!(
                    "content type '{}' does not match a {} message",
                    media.content_type,
                    req.kind.as_str()
                )));
            }
        }

        let cid = req.conversation_id.to_string();
        self.db
            .get_conversation(&cid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("conversation"))?;

        if let Some(reply_id) = req.reply_to_id {
            match self.db.message_conversation(reply_id).map_err(Error::Db)? {
                Some(owner) if owner == cid => {}
                Some(_) => {
                    return Err(Error::InvalidArgument(
                        "reply target belongs to a different conversation".into(),
                    ));
                }
                None => {
                    return Err(Error::InvalidArgument("reply target does not exist".into()));
                }
            }
        }

        let now = self.clock.now();
        let uploaded: Option<(StoredBlob, String, i64)> = match &req.media {
            Some(media) => {
                self.policy
                    .check(UploadCategory::ChatMedia, &media.content_type, media.bytes.len())?;
                let filename = sanitize_filename(
                    media
                        .filename
                        .as_deref()
                        .unwrap_or(&default_media_name(req.kind, now)),
                );
                let path = format!("chat-media/{}/{}-{}", cid, now.timestamp_millis(), filename);
                let blob = self
                    .store
                    .upload(CHAT_BUCKET, &path, &media.bytes)
                    .map_err(Error::Storage)?;
                Some((blob, filename, media.bytes.len() as i64))
            }
            None => None,
        };

        let sender_id = req.sender_id.to_string();
        let new = NewMessage {
            conversation_id: &cid,
            sender_id: &sender_id,
            sender_party: req.sender_party.as_str(),
            body: req.body.as_deref(),
            kind: req.kind.as_str(),
            reply_to_id: req.reply_to_id,
            task_id: req.task_id,
            media: uploaded
                .as_ref()
                .map(|(blob, filename, size)| NewMedia {
                    url: &blob.url,
                    filename,
                    size: *size,
                }),
        };

        let row = match self.db.insert_message(&new, &fmt_ts(now)) {
            Ok(row) => row,
            Err(e) => {
                if let Some((blob, _, _)) = &uploaded {
                    warn!(
                        "Message insert failed after upload; removing blob {}",
                        blob.path
                    );
                    let _ = self
                        .store
                        .delete(CHAT_BUCKET, std::slice::from_ref(&blob.path));
                }
                return Err(Error::Db(e));
            }
        };
        Ok(message_from_row(row))
    }

    /// Message history in creation order (oldest first by default), with
    /// reply previews and task summaries resolved where the targets still
    /// exist.
    pub fn history(
        &self,
        conversation_id: Uuid,
        limit: u32,
        ascending: bool,
    ) -> Result<Vec<MessageView>> {
        let cid = conversation_id.to_string();
        self.db
            .get_conversation(&cid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("conversation"))?;

        let rows = self.db.history(&cid, limit, ascending).map_err(Error::Db)?;
        Ok(rows.into_iter().map(message_view_from_row).collect())
    }
}

/// Mirrors what the mobile client uploads: anything outside
/// `[a-zA-Z0-9.-]` collapses to an underscore.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_media_name(kind: MessageKind, now: DateTime<Utc>) -> String {
    let ext = match kind {
        MessageKind::Video => "mp4",
        _ => "jpg",
    };
    format!("{}_{}.{}", kind.as_str(), now.timestamp_millis(), ext)
}
