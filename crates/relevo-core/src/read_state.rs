use relevo_types::models::Party;
use uuid::Uuid;

use crate::{Core, Error, Result};

impl Core {
    /// Marks every unread message from the opposite party as read and zeroes
    /// the reader's unread counter. Runs as one transaction, so a
    /// concurrently appended message either lands after the mark (and stays
    /// unread, counted) or before it (and is read, uncounted) — nothing in
    /// between.
    pub fn mark_read(&self, conversation_id: Uuid, reader_party: Party) -> Result<()> {
        let updated = self
            .db
            .mark_read(&conversation_id.to_string(), reader_party.as_str())
            .map_err(Error::Db)?;
        if !updated {
            return Err(Error::NotFound("conversation"));
        }
        Ok(())
    }
}
