use relevo_store::UploadCategory;
use relevo_types::models::Task;
use tracing::warn;
use uuid::Uuid;

use crate::convert::task_from_row;
use crate::messages::MediaUpload;
use crate::{Core, EVIDENCE_BUCKET, Error, Result};

impl Core {
    pub fn create_task(
        &self,
        name: &str,
        period: Option<&str>,
        deadline: Option<&str>,
    ) -> Result<Task> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("task name cannot be empty".into()));
        }
        let now = relevo_db::fmt_ts(self.clock.now());
        let row = self
            .db
            .create_task(name, period, deadline, &now)
            .map_err(Error::Db)?;
        Ok(task_from_row(row))
    }

    pub fn update_task(
        &self,
        id: i64,
        name: Option<&str>,
        period: Option<&str>,
        deadline: Option<&str>,
    ) -> Result<()> {
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(Error::InvalidArgument("task name cannot be empty".into()));
            }
        }
        let found = self
            .db
            .update_task(id, name, period, deadline)
            .map_err(Error::Db)?;
        if !found {
            return Err(Error::NotFound("task"));
        }
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        let found = self.db.delete_task(id).map_err(Error::Db)?;
        if !found {
            return Err(Error::NotFound("task"));
        }
        Ok(())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        Ok(self
            .db
            .get_task(id)
            .map_err(Error::Db)?
            .map(task_from_row))
    }

    /// Stores a photo proving a task was done and records it against
    /// (user, task). The photo is uploaded first; if the row insert then
    /// fails, the fresh blob is removed again so the store never accumulates
    /// unreferenced evidence.
    pub fn upload_evidence(
        &self,
        user_id: Uuid,
        task_id: i64,
        observation: Option<&str>,
        media: MediaUpload,
    ) -> Result<(i64, String)> {
        let uid = user_id.to_string();
        self.db
            .get_user_by_id(&uid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("user"))?;
        self.db
            .get_task(task_id)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("task"))?;

        self.policy
            .check(UploadCategory::TaskEvidence, &media.content_type, media.bytes.len())?;

        let now = self.clock.now();
        let ext = evidence_extension(&media);
        let nonce = Uuid::new_v4().simple().to_string();
        let path = format!(
            "{}/{}/evidence_{}_{}.{}",
            uid,
            task_id,
            now.timestamp_millis(),
            &nonce[..12],
            ext
        );
        let blob = self
            .store
            .upload(EVIDENCE_BUCKET, &path, &media.bytes)
            .map_err(Error::Storage)?;

        let id = match self.db.insert_task_evidence(
            &uid,
            task_id,
            &blob.url,
            observation,
            &relevo_db::fmt_ts(now),
        ) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Evidence insert failed after upload; removing blob {}",
                    blob.path
                );
                let _ = self
                    .store
                    .delete(EVIDENCE_BUCKET, std::slice::from_ref(&blob.path));
                return Err(Error::Db(e));
            }
        };
        Ok((id, blob.url))
    }
}

fn evidence_extension(media: &MediaUpload) -> String {
    if let Some(name) = &media.filename {
        if let Some((_, ext)) = name.rsplit_once('.') {
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return ext.to_ascii_lowercase();
            }
        }
    }
    match media.content_type.to_ascii_lowercase().as_str() {
        "image/png" => "png".to_string(),
        "image/webp" => "webp".to_string(),
        _ => "jpg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ana_id, harness};
    use relevo_store::BlobStore;

    fn photo() -> MediaUpload {
        MediaUpload {
            bytes: vec![7; 128],
            filename: Some("caja.PNG".to_string()),
            content_type: "image/png".to_string(),
        }
    }

    #[test]
    fn task_crud_round_trip() {
        let h = harness();
        let task = h
            .core
            .create_task("Reponer stock", Some("daily"), None)
            .unwrap();
        h.core
            .update_task(task.id, None, None, Some("2025-05-20"))
            .unwrap();
        let fetched = h.core.get_task(task.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Reponer stock");
        assert_eq!(fetched.deadline.as_deref(), Some("2025-05-20"));

        h.core.delete_task(task.id).unwrap();
        assert!(h.core.get_task(task.id).unwrap().is_none());
        assert!(matches!(
            h.core.delete_task(task.id),
            Err(Error::NotFound("task"))
        ));

        assert!(matches!(
            h.core.create_task("  ", None, None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn evidence_upload_stores_blob_and_row() {
        let h = harness();
        let task = h.core.create_task("Limpieza", None, None).unwrap();
        let (id, url) = h
            .core
            .upload_evidence(ana_id(), task.id, Some("todo en orden"), photo())
            .unwrap();
        assert!(id > 0);

        let path = BlobStore::path_from_url(&url, EVIDENCE_BUCKET).unwrap();
        assert!(path.ends_with(".png"));
        assert!(h.store.exists(EVIDENCE_BUCKET, &path));
    }

    #[test]
    fn evidence_rejects_video_and_oversize() {
        let h = harness();
        let task = h.core.create_task("Limpieza", None, None).unwrap();

        let err = h
            .core
            .upload_evidence(
                ana_id(),
                task.id,
                None,
                MediaUpload {
                    bytes: vec![0; 64],
                    filename: Some("clip.mp4".to_string()),
                    content_type: "video/mp4".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));

        let err = h
            .core
            .upload_evidence(
                ana_id(),
                task.id,
                None,
                MediaUpload {
                    bytes: vec![0; 6 * 1024 * 1024],
                    filename: Some("big.jpg".to_string()),
                    content_type: "image/jpeg".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { .. }));
    }
}
