//! Canonical data model. The source carried three near-duplicate
//! pulse model variants across its schema-evolution history; this is their
//! union, with the emotion fields and sub-cent cost representation always
//! present.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Cents;

pub const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
    Unlimited,
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Free
    }
}

/// One live instance per `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedPulse {
    pub user_id: String,
    pub pulse_id: Uuid,
    pub intent: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub intent_emotion: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: bool,
}

/// Intermediate record, primary key `pulse_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppedPulse {
    pub user_id: String,
    pub pulse_id: Uuid,
    pub intent: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub intent_emotion: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: bool,
    pub reflection: String,
    pub reflection_emotion: Option<String>,
    pub stopped_at: DateTime<Utc>,
}

impl StoppedPulse {
    /// `min(elapsed, declared)`, never negative.
    pub fn actual_duration_seconds(&self) -> i64 {
        let elapsed = (self.stopped_at - self.start_time).num_seconds().max(0);
        elapsed.min(self.duration_seconds)
    }

    pub fn from_started(started: StartedPulse, reflection: String, reflection_emotion: Option<String>, stopped_at: DateTime<Utc>) -> Self {
        StoppedPulse {
            user_id: started.user_id,
            pulse_id: started.pulse_id,
            intent: started.intent,
            start_time: started.start_time,
            duration_seconds: started.duration_seconds,
            intent_emotion: started.intent_emotion,
            tags: started.tags,
            is_public: started.is_public,
            reflection,
            reflection_emotion,
            stopped_at,
        }
    }
}

/// AI-produced insight bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsights {
    pub productivity_score: u8,
    pub key_insight: String,
    pub next_suggestion: String,
    pub mood_assessment: String,
    pub emotion_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRecord {
    pub kind: String,
    pub credits: Cents,
    pub achievement: Option<String>,
    pub message: String,
}

/// Breakdown of one worthiness component, kept for API transparency
/// Ported from the original's `get_worthiness_explanation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorthinessComponent {
    pub score: f64,
    pub weight: f64,
    pub contribution: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorthinessExplanation {
    pub total: f64,
    pub content_length: WorthinessComponent,
    pub duration: WorthinessComponent,
    pub reflection_depth: WorthinessComponent,
    pub frequency_bonus: WorthinessComponent,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub daily_used_cents: Cents,
    pub monthly_used_cents: Cents,
    pub daily_available_cents: Cents,
    pub monthly_cap_cents: Cents,
}

/// The admission decision trace recorded on every archive, win or lose
/// shown as `ai_selection_info` on the archived record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionInfo {
    pub decision_reason: String,
    pub score: f64,
    pub est_cost_cents: Cents,
    pub could_be_enhanced: bool,
    pub budget_status: BudgetStatus,
    pub probability: Option<f64>,
    pub draw: Option<f64>,
    pub model_used: Option<String>,
    pub worthiness: WorthinessExplanation,
}

impl SelectionInfo {
    /// Appends a demotion marker when the LLM path fails mid-pipeline and
    /// the orchestrator falls back to the rule path.
    pub fn mark_model_error(&mut self, reason: &str) {
        self.decision_reason = format!("{}:model_error:{}", self.decision_reason, reason);
    }
}

/// Terminal record, primary key `pulse_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedPulse {
    pub user_id: String,
    pub pulse_id: Uuid,
    pub intent: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub intent_emotion: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: bool,
    pub reflection: String,
    pub reflection_emotion: Option<String>,
    pub stopped_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub gen_title: String,
    pub gen_badge: String,
    pub ai_enhanced: bool,
    pub ai_cost_cents: Cents,
    pub ai_insights: Option<AiInsights>,
    pub ai_selection_info: Option<SelectionInfo>,
    pub triggered_rewards: Vec<RewardRecord>,
}

impl ArchivedPulse {
    /// `far_future − stopped_at` in seconds: ascending sort on this field
    /// yields most-recent-first.
    pub fn inverted_timestamp(&self) -> i64 {
        let far_future = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        (far_future - self.stopped_at).num_seconds()
    }
}

/// Daily aggregate, TTL 90 days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageDay {
    pub user_id: String,
    pub date: String,
    pub daily_cost_cents: Cents,
    pub daily_ai_credits: Cents,
    pub daily_pulses_enhanced: u32,
    pub monthly_cost_cents: Cents,
    pub monthly_ai_credits: Cents,
    pub user_tier: Tier,
    pub streak_days: u32,
    pub achievements: Vec<String>,
    pub total_ai_enhancements: u64,
    pub month: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageEventKind {
    SelectionEvaluated,
    EnhancementRequested,
    EnhancementCompleted,
    EnhancementFailed,
}

/// Append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub event_id: Uuid,
    pub user_id: String,
    pub pulse_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: UsageEventKind,
    pub estimated_cost_cents: Cents,
    pub actual_cost_cents: Option<Cents>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub duration_ms: Option<u64>,
    pub model_id: Option<String>,
    pub quality_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub total_pulses: u64,
    pub total_ai_enhancements: u64,
}

/// Per-user plan and lifetime stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub plan: Tier,
    pub plan_expires: Option<DateTime<Utc>>,
    pub stats: UserStats,
}

impl Default for UserStats {
    fn default() -> Self {
        UserStats {
            total_pulses: 0,
            total_ai_enhancements: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn started(duration_seconds: i64) -> StartedPulse {
        StartedPulse {
            user_id: "u1".into(),
            pulse_id: Uuid::nil(),
            intent: "focus".into(),
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            duration_seconds,
            intent_emotion: None,
            tags: None,
            is_public: false,
        }
    }

    #[test]
    fn actual_duration_is_capped_at_declared_duration() {
        let s = started(60);
        let stopped = StoppedPulse::from_started(
            s,
            "done".into(),
            None,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap(),
        );
        assert_eq!(stopped.actual_duration_seconds(), 60);
    }

    #[test]
    fn actual_duration_is_never_negative() {
        let s = started(600);
        // stopped_at before start_time shouldn't happen, but must not panic
        // or underflow.
        let stopped = StoppedPulse::from_started(s.clone(), "done".into(), None, s.start_time - Duration::seconds(5));
        assert_eq!(stopped.actual_duration_seconds(), 0);
    }

    #[test]
    fn actual_duration_uses_elapsed_when_under_declared() {
        let s = started(600);
        let stopped = StoppedPulse::from_started(
            s.clone(),
            "done".into(),
            None,
            s.start_time + Duration::seconds(200),
        );
        assert_eq!(stopped.actual_duration_seconds(), 200);
    }
}
