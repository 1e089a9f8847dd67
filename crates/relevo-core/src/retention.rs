use chrono::{DateTime, Duration, Utc};
use relevo_db::fmt_ts;
use relevo_store::BlobStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::{CHAT_BUCKET, Core, Error, Result};

/// What one sweep run removed. `orphaned_blob_paths` lists blobs (or, when
/// the path could not even be derived, raw URLs) that phase 2 failed to
/// delete; their rows are gone, so they need manual reconciliation.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub deleted_messages: usize,
    pub deleted_blobs: usize,
    pub orphaned_blob_paths: Vec<String>,
    pub deleted_time_records: usize,
    pub deleted_task_completions: usize,
}

impl Core {
    /// Age-based cleanup over both stores, using the configured windows.
    pub fn run_retention_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        self.sweep_with_windows(
            now,
            self.config.attendance_retention_days,
            self.config.chat_retention_days,
        )
    }

    /// Admin-triggered cleanup: same sweep, with an optional override of the
    /// operational-records window. The chat window is never widened from
    /// here.
    pub fn run_manual_cleanup(&self, days_to_keep: Option<i64>) -> Result<SweepReport> {
        let attendance_days = days_to_keep.unwrap_or(self.config.attendance_retention_days);
        if attendance_days < 1 {
            return Err(Error::InvalidArgument(format!(
                "days_to_keep must be at least 1, got {}",
                attendance_days
            )));
        }
        self.sweep_with_windows(
            self.clock.now(),
            attendance_days,
            self.config.chat_retention_days,
        )
    }

    /// The sweep proper, with explicit windows so the manual admin trigger
    /// can override the operational one.
    ///
    /// Chat cleanup is a three-phase, best-effort-compensating sequence:
    /// find candidate media, delete blobs (tolerating partial failure), then
    /// delete all candidate rows regardless — a stale row is worse than an
    /// orphaned blob. Re-running after a partial failure is safe: absent
    /// blobs delete as no-ops and already-deleted rows simply do not match.
    pub fn sweep_with_windows(
        &self,
        now: DateTime<Utc>,
        attendance_days: i64,
        chat_days: i64,
    ) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        // Operational records are keyed by business date.
        let record_cutoff = (now - Duration::days(attendance_days))
            .date_naive()
            .to_string();
        report.deleted_time_records = self
            .db
            .delete_time_records_before(&record_cutoff)
            .map_err(Error::Db)?;
        report.deleted_task_completions = self
            .db
            .delete_task_completions_before(&record_cutoff)
            .map_err(Error::Db)?;

        // Phase 1: find chat messages past the window that carry media.
        let chat_cutoff = fmt_ts(now - Duration::days(chat_days));
        let urls = self.db.media_urls_before(&chat_cutoff).map_err(Error::Db)?;

        let mut paths = Vec::with_capacity(urls.len());
        for url in urls {
            match BlobStore::path_from_url(&url, CHAT_BUCKET) {
                Some(path) => paths.push(path),
                None => {
                    warn!("Cannot derive storage path from media url {}", url);
                    report.orphaned_blob_paths.push(url);
                }
            }
        }

        // Phase 2: blobs go first, so a crash here re-runs cleanly.
        if !paths.is_empty() {
            let outcome = self.store.delete(CHAT_BUCKET, &paths);
            report.deleted_blobs = outcome.deleted;
            for path in outcome.failed {
                warn!("Blob {} survived the sweep; flagging as orphan", path);
                report.orphaned_blob_paths.push(path);
            }
        }

        // Phase 3: rows go regardless of phase 2.
        report.deleted_messages = self
            .db
            .delete_messages_before(&chat_cutoff)
            .map_err(Error::Db)?;

        if report.orphaned_blob_paths.is_empty() {
            info!(
                "Retention sweep: {} messages, {} blobs, {} time records, {} completions removed",
                report.deleted_messages,
                report.deleted_blobs,
                report.deleted_time_records,
                report.deleted_task_completions,
            );
        } else {
            warn!(
                "Retention sweep finished with {} orphaned blobs: {:?}",
                report.orphaned_blob_paths.len(),
                report.orphaned_blob_paths,
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{AppendMessage, MediaUpload};
    use crate::testutil::{ana_id, harness, t0};
    use relevo_types::models::{MessageKind, Party};

    #[test]
    fn sweep_deletes_old_blobs_then_rows_and_reruns_as_noop() {
        let h = harness();
        let conv = h.core.resolve_or_create(ana_id()).unwrap();

        // One media message at T, one fresh text message a day later.
        let msg = h
            .core
            .append(AppendMessage {
                conversation_id: conv.id,
                sender_id: ana_id(),
                sender_party: Party::Employee,
                body: None,
                kind: MessageKind::Image,
                reply_to_id: None,
                task_id: None,
                media: Some(MediaUpload {
                    bytes: vec![1; 64],
                    filename: Some("pic.jpg".to_string()),
                    content_type: "image/jpeg".to_string(),
                }),
            })
            .unwrap();
        h.clock.set(t0() + Duration::days(1));
        h.core
            .append(AppendMessage {
                conversation_id: conv.id,
                sender_id: ana_id(),
                sender_party: Party::Employee,
                body: Some("nuevo".to_string()),
                kind: MessageKind::Text,
                reply_to_id: None,
                task_id: None,
                media: None,
            })
            .unwrap();

        let blob_path =
            BlobStore::path_from_url(&msg.media.as_ref().unwrap().url, CHAT_BUCKET).unwrap();
        assert!(h.store.exists(CHAT_BUCKET, &blob_path));

        // Three days past T: the media message is out of the 2-day window,
        // the day-old text message is not.
        let report = h.core.run_retention_sweep(t0() + Duration::days(3)).unwrap();
        assert_eq!(report.deleted_messages, 1);
        assert_eq!(report.deleted_blobs, 1);
        assert!(report.orphaned_blob_paths.is_empty());
        assert!(!h.store.exists(CHAT_BUCKET, &blob_path));

        let remaining = h.core.history(conv.id, 50, true).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message.body.as_deref(), Some("nuevo"));

        // Immediate rerun: nothing left to do, nothing fails.
        let rerun = h.core.run_retention_sweep(t0() + Duration::days(3)).unwrap();
        assert_eq!(rerun.deleted_messages, 0);
        assert_eq!(rerun.deleted_blobs, 0);
        assert!(rerun.orphaned_blob_paths.is_empty());
    }

    #[test]
    fn sweep_tolerates_missing_blobs_and_foreign_urls() {
        let h = harness();
        let conv = h.core.resolve_or_create(ana_id()).unwrap();
        let msg = h
            .core
            .append(AppendMessage {
                conversation_id: conv.id,
                sender_id: ana_id(),
                sender_party: Party::Employee,
                body: None,
                kind: MessageKind::Image,
                reply_to_id: None,
                task_id: None,
                media: Some(MediaUpload {
                    bytes: vec![1; 8],
                    filename: Some("gone.jpg".to_string()),
                    content_type: "image/jpeg".to_string(),
                }),
            })
            .unwrap();

        // Blob already removed out-of-band: delete-on-absent is a no-op.
        let path = BlobStore::path_from_url(&msg.media.unwrap().url, CHAT_BUCKET).unwrap();
        h.store.delete(CHAT_BUCKET, &[path]);

        let report = h.core.run_retention_sweep(t0() + Duration::days(3)).unwrap();
        assert_eq!(report.deleted_messages, 1);
        assert_eq!(report.deleted_blobs, 0);
        assert!(report.orphaned_blob_paths.is_empty());
    }

    #[test]
    fn sweep_clears_old_attendance_rows() {
        let h = harness();
        let uid = ana_id().to_string();
        h.db.upsert_time_record(&uid, "2025-05-01", "morning", "08:00")
            .unwrap();
        h.db.upsert_time_record(&uid, "2025-05-09", "morning", "08:00")
            .unwrap();
        h.db.upsert_task_completion(&uid, 1, "2025-05-01", true).unwrap();

        // Window of 7 days from May 10: May 1 goes, May 9 stays.
        let report = h.core.run_retention_sweep(t0()).unwrap();
        assert_eq!(report.deleted_time_records, 1);
        assert_eq!(report.deleted_task_completions, 1);

        let rerun = h.core.run_retention_sweep(t0()).unwrap();
        assert_eq!(rerun.deleted_time_records, 0);
        assert_eq!(rerun.deleted_task_completions, 0);
    }
}
