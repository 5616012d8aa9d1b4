//! Append-only usage ledger. Every call-site builds an
//! event through this module rather than constructing `UsageEvent` by hand,
//! so the partition/sort-key shape and the two secondary indexes stay
//! consistent.

use uuid::Uuid;

use crate::clock::{Clock, IdGen};
use crate::models::{UsageEvent, UsageEventKind};
use crate::money::Cents;
use crate::repository::PulseRepository;

pub struct UsageTracker<'a> {
    repo: &'a PulseRepository,
    clock: &'a dyn Clock,
    idgen: &'a dyn IdGen,
}

impl<'a> UsageTracker<'a> {
    pub fn new(repo: &'a PulseRepository, clock: &'a dyn Clock, idgen: &'a dyn IdGen) -> Self {
        Self { repo, clock, idgen }
    }

    fn new_event(&self, user_id: &str, pulse_id: Uuid, kind: UsageEventKind, estimated_cost_cents: Cents) -> UsageEvent {
        UsageEvent {
            event_id: self.idgen.new_id(),
            user_id: user_id.to_string(),
            pulse_id,
            timestamp: self.clock.now(),
            kind,
            estimated_cost_cents,
            actual_cost_cents: None,
            input_tokens: None,
            output_tokens: None,
            duration_ms: None,
            model_id: None,
            quality_score: None,
        }
    }

    pub fn record_selection_evaluated(&self, user_id: &str, pulse_id: Uuid, estimated_cost_cents: Cents) -> Result<(), crate::repository::RepoError> {
        let event = self.new_event(user_id, pulse_id, UsageEventKind::SelectionEvaluated, estimated_cost_cents);
        self.repo.record_usage_event(&event)
    }

    pub fn record_enhancement_requested(&self, user_id: &str, pulse_id: Uuid, estimated_cost_cents: Cents) -> Result<(), crate::repository::RepoError> {
        let event = self.new_event(user_id, pulse_id, UsageEventKind::EnhancementRequested, estimated_cost_cents);
        self.repo.record_usage_event(&event)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_enhancement_completed(
        &self,
        user_id: &str,
        pulse_id: Uuid,
        estimated_cost_cents: Cents,
        actual_cost_cents: Cents,
        input_tokens: u32,
        output_tokens: u32,
        duration_ms: u64,
        model_id: &str,
    ) -> Result<(), crate::repository::RepoError> {
        let mut event = self.new_event(user_id, pulse_id, UsageEventKind::EnhancementCompleted, estimated_cost_cents);
        event.actual_cost_cents = Some(actual_cost_cents);
        event.input_tokens = Some(input_tokens);
        event.output_tokens = Some(output_tokens);
        event.duration_ms = Some(duration_ms);
        event.model_id = Some(model_id.to_string());
        self.repo.record_usage_event(&event)
    }

    pub fn record_enhancement_failed(&self, user_id: &str, pulse_id: Uuid, estimated_cost_cents: Cents, model_id: &str) -> Result<(), crate::repository::RepoError> {
        let mut event = self.new_event(user_id, pulse_id, UsageEventKind::EnhancementFailed, estimated_cost_cents);
        event.model_id = Some(model_id.to_string());
        self.repo.record_usage_event(&event)
    }
}

/// Frequency-component input for the worthiness scorer. Prefers an exact same-day count derived
/// from `SelectionEvaluated` events; falls back to the original's
/// `daily_pulses_enhanced * 8` approximation when no events are indexed yet
/// when no usage-day record exists yet.
pub fn daily_pulse_count(repo: &PulseRepository, user_id: &str, date: &str) -> Option<u32> {
    if let Ok(events) = repo.events_for_date(date, 1000) {
        let count = events
            .iter()
            .filter(|e| e.user_id == user_id && e.kind == UsageEventKind::SelectionEvaluated)
            .count();
        if count > 0 {
            return Some(count as u32);
        }
    }

    match repo.get_usage_day(user_id, date) {
        Ok(Some(day)) => Some((day.daily_pulses_enhanced * 8).max(1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SeqGen};
    use crate::repository::{table_layout, PulseRepository, AI_USAGE_TRACKING_DAYS};
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn repo() -> PulseRepository {
        let mut layout = table_layout();
        layout.push((AI_USAGE_TRACKING_DAYS, vec![]));
        PulseRepository::new(Arc::new(MemoryStore::new(layout)))
    }

    #[test]
    fn records_are_retrievable_by_date_index() {
        let repo = repo();
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        let idgen = SeqGen::new(0);
        let tracker = UsageTracker::new(&repo, &clock, &idgen);

        let pulse_id = Uuid::new_v4();
        tracker.record_selection_evaluated("u1", pulse_id, Cents::ZERO).unwrap();

        let events = repo.events_for_date("2026-01-01", 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "u1");
    }

    #[test]
    fn daily_pulse_count_falls_back_to_approximation_without_events() {
        let repo = repo();
        let day = crate::budget::new_usage_day("u1", "2026-01-01", "2026-01", crate::models::Tier::Free);
        let mut day = day;
        day.daily_pulses_enhanced = 2;
        repo.put_usage_day_if_absent(&day).unwrap();
        assert_eq!(daily_pulse_count(&repo, "u1", "2026-01-01"), Some(16));
    }
}
