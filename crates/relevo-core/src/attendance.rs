use chrono::{NaiveDate, NaiveTime};
use relevo_types::models::DayPeriod;
use uuid::Uuid;

use crate::{Core, Error, Result};

impl Core {
    /// Upserts the clock-in/out time for one half-day slot of (user, date).
    pub fn record_time(
        &self,
        user_id: Uuid,
        date: &str,
        period: DayPeriod,
        time: &str,
    ) -> Result<()> {
        validate_date(date)?;
        if NaiveTime::parse_from_str(time, "%H:%M").is_err()
            && NaiveTime::parse_from_str(time, "%H:%M:%S").is_err()
        {
            return Err(Error::InvalidArgument(format!("invalid time '{}'", time)));
        }

        let uid = user_id.to_string();
        self.db
            .get_user_by_id(&uid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("user"))?;

        self.db
            .upsert_time_record(&uid, date, period.as_str(), time)
            .map_err(Error::Db)
    }

    /// Upserts a task completion mark for (user, task, date).
    pub fn record_completion(
        &self,
        user_id: Uuid,
        task_id: i64,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        validate_date(date)?;

        let uid = user_id.to_string();
        self.db
            .get_user_by_id(&uid)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("user"))?;
        self.db
            .get_task(task_id)
            .map_err(Error::Db)?
            .ok_or(Error::NotFound("task"))?;

        self.db
            .upsert_task_completion(&uid, task_id, date, completed)
            .map_err(Error::Db)
    }
}

/// Business dates travel as `YYYY-MM-DD`; anything else would corrupt the
/// lexicographic cutoff used by the retention sweep.
fn validate_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| Error::InvalidArgument(format!("invalid date '{}'", date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ana_id, harness};

    #[test]
    fn record_time_validates_and_upserts() {
        let h = harness();
        h.core
            .record_time(ana_id(), "2025-05-10", DayPeriod::Morning, "08:05")
            .unwrap();
        h.core
            .record_time(ana_id(), "2025-05-10", DayPeriod::Morning, "08:10")
            .unwrap();

        let err = h
            .core
            .record_time(ana_id(), "10/05/2025", DayPeriod::Morning, "08:05")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = h
            .core
            .record_time(ana_id(), "2025-05-10", DayPeriod::Morning, "8am")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = h
            .core
            .record_time(Uuid::new_v4(), "2025-05-10", DayPeriod::Morning, "08:05")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("user")));
    }

    #[test]
    fn record_completion_requires_an_existing_task() {
        let h = harness();
        let err = h
            .core
            .record_completion(ana_id(), 42, "2025-05-10", true)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("task")));

        let task = h.core.create_task("Cierre de caja", None, None).unwrap();
        h.core
            .record_completion(ana_id(), task.id, "2025-05-10", true)
            .unwrap();
        h.core
            .record_completion(ana_id(), task.id, "2025-05-10", false)
            .unwrap();
    }
}
