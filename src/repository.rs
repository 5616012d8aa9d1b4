//! Typed CRUD over the Store. This is the only component
//! allowed to write `StartedPulse`, `StoppedPulse`, `ArchivedPulse`,
//! `UsageDay`, `UsageEvent`, and `UserProfile` rows; everyone else goes
//! through these methods rather than touching the Store directly.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::models::{ArchivedPulse, StartedPulse, StoppedPulse, UsageDay, UsageEvent, UserProfile};
use crate::store::{Direction, IndexSpec, PutOutcome, Store, StoreError};

pub const STARTED_PULSES: &str = "started_pulses";
pub const STOPPED_PULSES: &str = "stopped_pulses";
pub const INGESTED_PULSES: &str = "ingested_pulses";
pub const AI_USAGE_TRACKING: &str = "ai_usage_tracking";
pub const USERS: &str = "users";

pub const STOPPED_PULSES_USER_INDEX: &str = "UserIdIndex";
pub const INGESTED_PULSES_USER_INDEX: &str = "UserIdStoppedAtIndex";
pub const USAGE_TRACKING_DATE_INDEX: &str = "GSI1";
pub const USAGE_TRACKING_PULSE_INDEX: &str = "GSI2";

const LIST_ARCHIVED_MAX: usize = 100;

/// Table/index layout for `MemoryStore::new`.
pub fn table_layout() -> Vec<(&'static str, Vec<IndexSpec>)> {
    vec![
        (STARTED_PULSES, vec![]),
        (
            STOPPED_PULSES,
            vec![IndexSpec {
                name: STOPPED_PULSES_USER_INDEX,
                partition_field: "user_id",
                sort_field: "stopped_at",
            }],
        ),
        (
            INGESTED_PULSES,
            vec![IndexSpec {
                name: INGESTED_PULSES_USER_INDEX,
                partition_field: "user_id",
                sort_field: "inverted_timestamp",
            }],
        ),
        (
            AI_USAGE_TRACKING,
            vec![
                IndexSpec {
                    name: USAGE_TRACKING_DATE_INDEX,
                    partition_field: "date",
                    sort_field: "timestamp",
                },
                IndexSpec {
                    name: USAGE_TRACKING_PULSE_INDEX,
                    partition_field: "pulse_id",
                    sort_field: "timestamp",
                },
            ],
        ),
        (USERS, vec![]),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("a pulse is already running for this user")]
    AlreadyStarted,
    #[error("no pulse is currently running for this user")]
    NotStarted,
    #[error("failed to transition pulse to stopped, rolled back")]
    StopFailed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored record failed to deserialize: {0}")]
    Corrupt(#[from] serde_json::Error),
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, RepoError> {
    Ok(serde_json::to_value(v)?)
}

fn from_value<T: serde::de::DeserializeOwned>(v: Value) -> Result<T, RepoError> {
    Ok(serde_json::from_value(v)?)
}

/// Attaches `inverted_timestamp` to the serialized image so the
/// `UserIdStoppedAtIndex` can sort on it without deserializing every row.
fn ingested_image(archived: &ArchivedPulse) -> Result<Value, RepoError> {
    let mut v = to_value(archived)?;
    if let Value::Object(map) = &mut v {
        map.insert(
            "inverted_timestamp".to_string(),
            Value::from(archived.inverted_timestamp()),
        );
    }
    Ok(v)
}

pub struct PulseRepository {
    store: Arc<dyn Store>,
}

impl PulseRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn create_started(&self, pulse: StartedPulse) -> Result<StartedPulse, RepoError> {
        let key = pulse.user_id.clone();
        let value = to_value(&pulse)?;
        match self.store.put_if_absent(STARTED_PULSES, &key, value)? {
            PutOutcome::Inserted => Ok(pulse),
            PutOutcome::Conflict => Err(RepoError::AlreadyStarted),
        }
    }

    pub fn get_started(&self, user_id: &str) -> Result<Option<StartedPulse>, RepoError> {
        match self.store.get(STARTED_PULSES, user_id)? {
            Some(v) => Ok(Some(from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Delete-returning-old on `StartedPulse`, then conditional
    /// insert of `StoppedPulse`. A conflict on the second step means a
    /// concurrent retry already raced us in; roll the stray insert back and
    /// surface `StopFailed` rather than silently keeping two half-written
    /// attempts around.
    pub fn stop(
        &self,
        user_id: &str,
        reflection: String,
        reflection_emotion: Option<String>,
        stopped_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<StoppedPulse, RepoError> {
        let old = self.store.delete_returning_old(STARTED_PULSES, user_id)?;
        let started: StartedPulse = match old {
            Some(v) => from_value(v)?,
            None => return Err(RepoError::NotStarted),
        };

        let stopped = StoppedPulse::from_started(started, reflection, reflection_emotion, stopped_at);
        let key = stopped.pulse_id.to_string();
        let value = to_value(&stopped)?;
        match self.store.put_if_absent(STOPPED_PULSES, &key, value)? {
            PutOutcome::Inserted => Ok(stopped),
            PutOutcome::Conflict => {
                let _ = self.store.delete_returning_old(STOPPED_PULSES, &key)?;
                Err(RepoError::StopFailed)
            }
        }
    }

    pub fn get_stopped(&self, pulse_id: Uuid) -> Result<Option<StoppedPulse>, RepoError> {
        match self.store.get(STOPPED_PULSES, &pulse_id.to_string())? {
            Some(v) => Ok(Some(from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Conditional insert of `ArchivedPulse`, then delete of
    /// the matching `StoppedPulse`. Both are idempotent by `pulse_id`: a
    /// `Conflict` on insert means a prior delivery already archived this
    /// pulse, so we proceed to the (now likely no-op) delete rather than
    /// erroring. The returned `PutOutcome` tells the caller whether this
    /// delivery did the archiving, so cost commit runs
    /// at most once across redeliveries.
    pub fn archive(&self, archived: &ArchivedPulse) -> Result<PutOutcome, RepoError> {
        let key = archived.pulse_id.to_string();
        let value = ingested_image(archived)?;
        let outcome = self.store.put_if_absent(INGESTED_PULSES, &key, value)?;
        let _ = self.store.delete_returning_old(STOPPED_PULSES, &key)?;
        Ok(outcome)
    }

    pub fn list_archived(&self, user_id: &str, limit: usize) -> Result<Vec<ArchivedPulse>, RepoError> {
        let capped = limit.min(LIST_ARCHIVED_MAX);
        let rows = self
            .store
            .query_index(INGESTED_PULSES, INGESTED_PULSES_USER_INDEX, user_id, capped, Direction::Ascending)?;
        rows.into_iter().map(from_value).collect()
    }

    pub fn get_usage_day(&self, user_id: &str, date: &str) -> Result<Option<UsageDay>, RepoError> {
        let key = format!("{user_id}#{date}");
        match self.store.get(AI_USAGE_TRACKING_DAYS, &key)? {
            Some(v) => Ok(Some(from_value(v)?)),
            None => Ok(None),
        }
    }

    pub fn put_usage_day_if_absent(&self, day: &UsageDay) -> Result<(), RepoError> {
        let key = format!("{}#{}", day.user_id, day.date);
        let value = to_value(day)?;
        let _ = self.store.put_if_absent(AI_USAGE_TRACKING_DAYS, &key, value)?;
        Ok(())
    }

    pub fn record_usage_event(&self, event: &UsageEvent) -> Result<(), RepoError> {
        let key = event.event_id.to_string();
        let mut value = to_value(event)?;
        if let Value::Object(map) = &mut value {
            map.insert("date".to_string(), Value::from(event.timestamp.format("%Y-%m-%d").to_string()));
            map.insert("pulse_id".to_string(), Value::from(event.pulse_id.to_string()));
            map.insert("timestamp".to_string(), Value::from(event.timestamp.to_rfc3339()));
        }
        let _ = self.store.put_if_absent(AI_USAGE_TRACKING, &key, value)?;
        Ok(())
    }

    pub fn events_for_date(&self, date: &str, limit: usize) -> Result<Vec<UsageEvent>, RepoError> {
        let rows = self
            .store
            .query_index(AI_USAGE_TRACKING, USAGE_TRACKING_DATE_INDEX, date, limit, Direction::Ascending)?;
        rows.into_iter().map(from_value).collect()
    }

    pub fn events_for_pulse(&self, pulse_id: Uuid, limit: usize) -> Result<Vec<UsageEvent>, RepoError> {
        let rows = self.store.query_index(
            AI_USAGE_TRACKING,
            USAGE_TRACKING_PULSE_INDEX,
            &pulse_id.to_string(),
            limit,
            Direction::Ascending,
        )?;
        rows.into_iter().map(from_value).collect()
    }

    pub fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RepoError> {
        match self.store.get(USERS, user_id)? {
            Some(v) => Ok(Some(from_value(v)?)),
            None => Ok(None),
        }
    }

    pub fn put_user_profile_if_absent(&self, profile: &UserProfile) -> Result<(), RepoError> {
        let value = to_value(profile)?;
        let _ = self.store.put_if_absent(USERS, &profile.user_id, value)?;
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

/// `UsageDay` rows live in their own logical table, separate from
/// `ai_usage_tracking`'s append-only event log, even though both could in
/// principle share one composite key space; keeping daily aggregates and
/// the event log in separate
/// `Store` tables avoids the two record shapes colliding under one index.
pub const AI_USAGE_TRACKING_DAYS: &str = "ai_usage_tracking_days";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn repo() -> PulseRepository {
        let mut layout = table_layout();
        layout.push((AI_USAGE_TRACKING_DAYS, vec![]));
        PulseRepository::new(Arc::new(MemoryStore::new(layout)))
    }

    fn started(user: &str) -> StartedPulse {
        StartedPulse {
            user_id: user.to_string(),
            pulse_id: Uuid::new_v4(),
            intent: "write the quarterly plan".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            duration_seconds: 1800,
            intent_emotion: None,
            tags: None,
            is_public: false,
        }
    }

    #[test]
    fn second_start_for_same_user_fails() {
        let r = repo();
        r.create_started(started("u1")).unwrap();
        let err = r.create_started(started("u1")).unwrap_err();
        assert!(matches!(err, RepoError::AlreadyStarted));
    }

    #[test]
    fn stop_without_start_fails() {
        let r = repo();
        let err = r.stop("ghost", "reflecting".into(), None, Utc::now()).unwrap_err();
        assert!(matches!(err, RepoError::NotStarted));
    }

    #[test]
    fn stop_consumes_the_started_pulse() {
        let r = repo();
        r.create_started(started("u1")).unwrap();
        let stopped_at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        let stopped = r.stop("u1", "went well".into(), Some("calm".into()), stopped_at).unwrap();
        assert_eq!(stopped.user_id, "u1");
        assert!(r.get_started("u1").unwrap().is_none());
    }

    #[test]
    fn archive_is_idempotent_and_clears_stopped() {
        let r = repo();
        r.create_started(started("u1")).unwrap();
        let stopped_at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        let stopped = r.stop("u1", "went well".into(), None, stopped_at).unwrap();

        let archived = ArchivedPulse {
            user_id: stopped.user_id.clone(),
            pulse_id: stopped.pulse_id,
            intent: stopped.intent.clone(),
            start_time: stopped.start_time,
            duration_seconds: stopped.duration_seconds,
            intent_emotion: stopped.intent_emotion.clone(),
            tags: stopped.tags.clone(),
            is_public: stopped.is_public,
            reflection: stopped.reflection.clone(),
            reflection_emotion: stopped.reflection_emotion.clone(),
            stopped_at: stopped.stopped_at,
            archived_at: Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 5).unwrap(),
            gen_title: "Focus Session".into(),
            gen_badge: "✨ Progress Maker".into(),
            ai_enhanced: false,
            ai_cost_cents: crate::money::Cents::ZERO,
            ai_insights: None,
            ai_selection_info: None,
            triggered_rewards: vec![],
        };

        r.archive(&archived).unwrap();
        r.archive(&archived).unwrap();

        let listed = r.list_archived("u1", 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(r.get_stopped(stopped.pulse_id).unwrap().is_none());
    }

    #[test]
    fn list_archived_caps_at_implementation_limit() {
        let r = repo();
        assert_eq!(r.list_archived("u1", 10_000).unwrap().len(), 0);
    }
}
