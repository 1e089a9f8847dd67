pub mod attendance;
pub mod clock;
mod convert;
pub mod error;
pub mod messages;
pub mod read_state;
pub mod registry;
pub mod retention;
pub mod tasks;

use std::sync::Arc;

use relevo_db::Database;
use relevo_store::{BlobStore, MediaPolicy};

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};

/// Bucket holding chat message attachments.
pub const CHAT_BUCKET: &str = "chat-uploads";
/// Bucket holding task evidence photos.
pub const EVIDENCE_BUCKET: &str = "task-evidence";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Age after which chat messages (and their attachments) are swept.
    pub chat_retention_days: i64,
    /// Age after which time records and task completions are swept.
    pub attendance_retention_days: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chat_retention_days: 2,
            attendance_retention_days: 7,
        }
    }
}

/// The chat and attendance service. All collaborators are injected, so tests
/// run against an in-memory database, a temp-dir blob store and a fixed
/// clock.
pub struct Core {
    db: Arc<Database>,
    store: Arc<BlobStore>,
    policy: MediaPolicy,
    config: CoreConfig,
    clock: Arc<dyn Clock>,
}

impl Core {
    pub fn new(
        db: Arc<Database>,
        store: Arc<BlobStore>,
        policy: MediaPolicy,
        config: CoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            store,
            policy,
            config,
            clock,
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;
    use tempfile::TempDir;

    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        pub fn set(&self, t: DateTime<Utc>) {
            *self.0.lock().unwrap() = t;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
    }

    pub struct TestHarness {
        pub core: Core,
        pub db: Arc<Database>,
        pub clock: Arc<FixedClock>,
        pub store: Arc<BlobStore>,
        _dir: TempDir,
    }

    /// Core over an in-memory database, temp-dir store and fixed clock,
    /// seeded with one admin and two employees.
    pub fn harness() -> TestHarness {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store =
            Arc::new(BlobStore::new(dir.path().join("blobs"), "https://files.test").unwrap());
        let clock = FixedClock::at(t0());

        let seeded = relevo_db::fmt_ts(t0());
        db.create_user("11111111-1111-1111-1111-111111111111", "Dana", "dana", "x", "admin", &seeded)
            .unwrap();
        db.create_user("22222222-2222-2222-2222-222222222222", "Ana", "ana", "x", "employee", &seeded)
            .unwrap();
        db.create_user("33333333-3333-3333-3333-333333333333", "Beto", "beto", "x", "employee", &seeded)
            .unwrap();

        let core = Core::new(
            db.clone(),
            store.clone(),
            MediaPolicy::default(),
            CoreConfig::default(),
            clock.clone(),
        );
        TestHarness {
            core,
            db,
            clock,
            store,
            _dir: dir,
        }
    }

    pub fn admin_id() -> uuid::Uuid {
        "11111111-1111-1111-1111-111111111111".parse().unwrap()
    }

    pub fn ana_id() -> uuid::Uuid {
        "22222222-2222-2222-2222-222222222222".parse().unwrap()
    }

    pub fn beto_id() -> uuid::Uuid {
        "33333333-3333-3333-3333-333333333333".parse().unwrap()
    }
}
