//! Drives a single `Stopped` pulse through selection, enrichment, and
//! archival exactly once per delivery, tolerating at-least-once stream
//! redelivery. One instance processes one stream record at a
//! time; parallelism across users comes from running one orchestrator per
//! partition, not from anything in this module.

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::clock::{Clock, IdGen};
use crate::config::Config;
use crate::llm::{self, LlmClient, LlmError};
use crate::models::{ArchivedPulse, SelectionInfo, StoppedPulse, Tier, UserProfile, UserStats};
use crate::money::Cents;
use crate::repository::{PulseRepository, AI_USAGE_TRACKING_DAYS, USERS};
use crate::rule_enricher;
use crate::store::{PutOutcome, StreamEventKind, StreamRecord};
use crate::usage_tracker::{self, UsageTracker};
use crate::{budget, worthiness};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Repo(#[from] crate::repository::RepoError),
}

pub struct Orchestrator<'a> {
    pub repo: &'a PulseRepository,
    pub clock: &'a dyn Clock,
    pub idgen: &'a dyn IdGen,
    pub llm_client: Option<&'a dyn LlmClient>,
    pub config: &'a Config,
}

impl<'a> Orchestrator<'a> {
    fn user_date_keys(&self, stopped_at: chrono::DateTime<Utc>) -> (String, String) {
        (stopped_at.format("%Y-%m-%d").to_string(), stopped_at.format("%Y-%m").to_string())
    }

    fn ensure_user_profile(&self, user_id: &str) -> Result<UserProfile, OrchestratorError> {
        if let Some(profile) = self.repo.get_user_profile(user_id)? {
            return Ok(profile);
        }
        let profile = UserProfile {
            user_id: user_id.to_string(),
            plan: Tier::Free,
            plan_expires: None,
            stats: UserStats::default(),
        };
        self.repo.put_user_profile_if_absent(&profile)?;
        Ok(self.repo.get_user_profile(user_id)?.unwrap_or(profile))
    }

    fn ensure_usage_day(&self, user_id: &str, date: &str, month: &str, tier: Tier) -> Result<crate::models::UsageDay, OrchestratorError> {
        if let Some(day) = self.repo.get_usage_day(user_id, date)? {
            return Ok(day);
        }
        let day = budget::new_usage_day(user_id, date, month, tier);
        self.repo.put_usage_day_if_absent(&day)?;
        Ok(self.repo.get_usage_day(user_id, date)?.unwrap_or(day))
    }

    /// Returns `Ok(())` for records this orchestrator ignores (wrong
    /// table/kind) as well as for a fully processed pulse; only storage
    /// errors propagate, so the stream redelivers the record.
    pub async fn handle_stream_record(&self, record: &StreamRecord, rng: &mut impl Rng) -> Result<(), OrchestratorError> {
        if record.table != crate::repository::STOPPED_PULSES || record.kind != StreamEventKind::Insert {
            return Ok(());
        }
        let Some(new_image) = record.new_image.clone() else {
            return Ok(());
        };
        let stopped: StoppedPulse = match serde_json::from_value(new_image) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "skipping stream record with unparseable new_image");
                return Ok(());
            }
        };

        self.process(stopped, rng).await
    }

    async fn process(&self, stopped: StoppedPulse, rng: &mut impl Rng) -> Result<(), OrchestratorError> {
        let pulse_id = stopped.pulse_id;
        let user_id = stopped.user_id.clone();
        let (date, month) = self.user_date_keys(stopped.stopped_at);

        let profile = self.ensure_user_profile(&user_id)?;
        let usage_before = self.ensure_usage_day(&user_id, &date, &month, profile.plan)?;

        let daily_count = usage_tracker::daily_pulse_count(self.repo, &user_id, &date);
        let score = worthiness::score(&stopped, daily_count);
        let explanation = worthiness::explain(&stopped, daily_count);
        let est_cost = llm::estimate_cost(&stopped.intent, &stopped.reflection);

        let decision = budget::evaluate(score, explanation, est_cost, profile.plan, &usage_before, self.config.ai_enabled, rng);

        let tracker = UsageTracker::new(self.repo, self.clock, self.idgen);
        let _ = tracker.record_selection_evaluated(&user_id, pulse_id, est_cost);

        let mut selection_info = SelectionInfo {
            decision_reason: decision.decision_reason.clone(),
            score: decision.score,
            est_cost_cents: decision.est_cost_cents,
            could_be_enhanced: decision.could_be_enhanced,
            budget_status: decision.budget_status,
            probability: decision.probability,
            draw: decision.draw,
            model_used: None,
            worthiness: decision.worthiness,
        };

        let (gen_title, gen_badge, ai_enhanced, ai_insights, actual_cost, model_used) = if decision.accepted {
            let _ = tracker.record_enhancement_requested(&user_id, pulse_id, est_cost);
            match self.try_llm_path(&stopped).await {
                Ok(outcome) => {
                    selection_info.model_used = Some(outcome.model_used.clone());
                    (outcome.title, outcome.badge, true, Some(outcome.insights), outcome.actual_cost_cents, Some(outcome.model_used))
                }
                Err(e) => {
                    warn!(pulse_id = %pulse_id, error = %e, "demoting pulse to rule path after LLM failure");
                    selection_info.mark_model_error(&e.to_string());
                    let _ = tracker.record_enhancement_failed(&user_id, pulse_id, est_cost, "none");
                    let (title, badge) = rule_enricher::enrich(&stopped, rng);
                    (title, badge, false, None, Cents::ZERO, None)
                }
            }
        } else {
            let (title, badge) = rule_enricher::enrich(&stopped, rng);
            (title, badge, false, None, Cents::ZERO, None)
        };

        let triggered_rewards = if ai_enhanced {
            budget::evaluate_rewards(&stopped.reflection, &stopped.intent, stopped.actual_duration_seconds(), &usage_before)
        } else {
            Vec::new()
        };

        let archived = ArchivedPulse {
            user_id: stopped.user_id.clone(),
            pulse_id,
            intent: stopped.intent.clone(),
            start_time: stopped.start_time,
            duration_seconds: stopped.duration_seconds,
            intent_emotion: stopped.intent_emotion.clone(),
            tags: stopped.tags.clone(),
            is_public: stopped.is_public,
            reflection: stopped.reflection.clone(),
            reflection_emotion: stopped.reflection_emotion.clone(),
            stopped_at: stopped.stopped_at,
            archived_at: self.clock.now(),
            gen_title,
            gen_badge,
            ai_enhanced,
            ai_cost_cents: if ai_enhanced { actual_cost } else { Cents::ZERO },
            ai_insights,
            ai_selection_info: Some(selection_info),
            triggered_rewards: triggered_rewards.clone(),
        };

        let outcome = self.repo.archive(&archived)?;
        info!(pulse_id = %pulse_id, user_id = %user_id, ai_enhanced, "pulse archived");

        // Commit cost and rewards exactly once, only on
        // the delivery that actually performed the insert (step 5).
        if outcome == PutOutcome::Inserted && ai_enhanced {
            self.commit_enhancement(&user_id, &date, actual_cost, &triggered_rewards)?;
            let _ = tracker.record_enhancement_completed(
                &user_id,
                pulse_id,
                est_cost,
                actual_cost,
                0,
                0,
                0,
                model_used.as_deref().unwrap_or("unknown"),
            );
        }

        // Failure isolation: stats update never fails
        // the archive that already happened above.
        if let Err(e) = self.bump_user_stats(&user_id, ai_enhanced) {
            warn!(user_id = %user_id, error = %e, "failed to update user stats after archive");
        }

        Ok(())
    }

    async fn try_llm_path(&self, stopped: &StoppedPulse) -> Result<llm::EnrichmentOutcome, LlmError> {
        let client = self.llm_client.ok_or(LlmError::ModelUnavailable)?;
        let model = llm::select_model(client, &self.config.bedrock_model_id).await?;
        llm::enrich(client, &model, stopped, Cents::from_whole_cents(self.config.max_cost_per_pulse_cents)).await
    }

    fn commit_enhancement(&self, user_id: &str, date: &str, actual_cost: Cents, rewards: &[crate::models::RewardRecord]) -> Result<(), OrchestratorError> {
        let key = format!("{user_id}#{date}");
        let rewards = rewards.to_vec();
        self.repo.store().atomic_update(
            AI_USAGE_TRACKING_DAYS,
            &key,
            Box::new(move |old| {
                let usage: crate::models::UsageDay = old
                    .and_then(|v| serde_json::from_value(v).ok())
                    .expect("usage day must exist before committing an enhancement");
                let updated = budget::apply_enhancement(usage, actual_cost, &rewards);
                serde_json::to_value(updated).expect("UsageDay always serializes")
            }),
        )?;
        Ok(())
    }

    fn bump_user_stats(&self, user_id: &str, ai_enhanced: bool) -> Result<(), OrchestratorError> {
        let owned_user_id = user_id.to_string();
        self.repo.store().atomic_update(
            USERS,
            user_id,
            Box::new(move |old| {
                let mut profile: UserProfile = old
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_else(|| UserProfile {
                        user_id: owned_user_id,
                        plan: Tier::Free,
                        plan_expires: None,
                        stats: UserStats::default(),
                    });
                profile.stats.total_pulses += 1;
                if ai_enhanced {
                    profile.stats.total_ai_enhancements += 1;
                }
                serde_json::to_value(profile).expect("UserProfile always serializes")
            }),
        )?;
        Ok(())
    }
}
