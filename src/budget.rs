//! Admission control and budget accounting. `evaluate` only ever reads
//! state; `apply_enhancement` is the single place that mutates a day's
//! counters, and it is only ever invoked from inside the orchestrator's one
//! commit step, so a reward never gets counted twice and a pulse is never
//! debited against the budget more than once.

use rand::Rng;

use crate::models::{BudgetStatus, RewardRecord, Tier, UsageDay, WorthinessExplanation};
use crate::money::Cents;
use crate::worthiness::{BREAKTHROUGH_WORDS, EXCEPTIONAL, GOOD};

pub struct TierCaps {
    pub daily_base_cents: Cents,
    pub daily_bonus_credits: Cents,
    pub monthly_cap_cents: Cents,
}

/// Per-tier daily base allowance, daily bonus credits, and monthly cap.
pub fn tier_caps(tier: Tier) -> TierCaps {
    match tier {
        Tier::Free => TierCaps {
            daily_base_cents: Cents::from_whole_cents(5),
            daily_bonus_credits: Cents::ZERO,
            monthly_cap_cents: Cents::from_whole_cents(30),
        },
        Tier::Premium => TierCaps {
            daily_base_cents: Cents::from_whole_cents(18),
            daily_bonus_credits: Cents::from_whole_cents(2),
            monthly_cap_cents: Cents::from_whole_cents(375),
        },
        Tier::Unlimited => TierCaps {
            daily_base_cents: Cents::from_whole_cents(75),
            daily_bonus_credits: Cents::from_whole_cents(25),
            monthly_cap_cents: Cents::from_whole_cents(1000),
        },
    }
}

/// Seeds a freshly created day with the tier's daily bonus credits, per the
/// original's `get_or_create_daily_usage`.
pub fn new_usage_day(user_id: &str, date: &str, month: &str, tier: Tier) -> UsageDay {
    let caps = tier_caps(tier);
    UsageDay {
        user_id: user_id.to_string(),
        date: date.to_string(),
        daily_cost_cents: Cents::ZERO,
        daily_ai_credits: caps.daily_bonus_credits,
        daily_pulses_enhanced: 0,
        monthly_cost_cents: Cents::ZERO,
        monthly_ai_credits: Cents::ZERO,
        user_tier: tier,
        streak_days: 0,
        achievements: Vec::new(),
        total_ai_enhancements: 0,
        month: month.to_string(),
    }
}

fn total_daily_available(caps: &TierCaps, usage: &UsageDay) -> Cents {
    caps.daily_base_cents + usage.daily_ai_credits
}

fn budget_status(caps: &TierCaps, usage: &UsageDay) -> BudgetStatus {
    BudgetStatus {
        daily_used_cents: usage.daily_cost_cents,
        monthly_used_cents: usage.monthly_cost_cents,
        daily_available_cents: total_daily_available(caps, usage),
        monthly_cap_cents: caps.monthly_cap_cents,
    }
}

fn within_budget(caps: &TierCaps, usage: &UsageDay, est_cost: Cents) -> bool {
    let monthly_ok = usage.monthly_cost_cents + est_cost <= caps.monthly_cap_cents;
    let daily_ok = usage.daily_cost_cents + est_cost <= total_daily_available(caps, usage);
    monthly_ok && daily_ok
}

/// The admission decision trace, precomputed for display. Rewards carried
/// here are a preview only — they are not applied until
/// `apply_enhancement` runs as part of the single commit step.
pub struct Decision {
    pub accepted: bool,
    pub decision_reason: String,
    pub score: f64,
    pub est_cost_cents: Cents,
    pub could_be_enhanced: bool,
    pub probability: Option<f64>,
    pub draw: Option<f64>,
    pub budget_status: BudgetStatus,
    pub worthiness: WorthinessExplanation,
}

/// Decides whether a pulse gets enhanced. `score` and `est_cost` are
/// computed by the caller (the worthiness scorer and the LLM enricher
/// respectively) since this controller only decides, it does not itself
/// score content or price a model call.
pub fn evaluate(
    score: f64,
    worthiness: WorthinessExplanation,
    est_cost: Cents,
    tier: Tier,
    usage: &UsageDay,
    ai_enabled: bool,
    rng: &mut impl Rng,
) -> Decision {
    let caps = tier_caps(tier);
    let status = budget_status(&caps, usage);

    if !ai_enabled {
        return Decision {
            accepted: false,
            decision_reason: "reject:ai_disabled".to_string(),
            score,
            est_cost_cents: est_cost,
            could_be_enhanced: false,
            probability: None,
            draw: None,
            budget_status: status,
            worthiness,
        };
    }

    if !within_budget(&caps, usage, est_cost) {
        return Decision {
            accepted: false,
            decision_reason: "reject:budget".to_string(),
            score,
            est_cost_cents: est_cost,
            could_be_enhanced: true,
            probability: None,
            draw: None,
            budget_status: status,
            worthiness,
        };
    }

    if score >= EXCEPTIONAL {
        return Decision {
            accepted: true,
            decision_reason: "accept:exceptional".to_string(),
            score,
            est_cost_cents: est_cost,
            could_be_enhanced: true,
            probability: None,
            draw: None,
            budget_status: status,
            worthiness,
        };
    }

    if score >= GOOD {
        let probability = (1.5 * (score - GOOD) / (EXCEPTIONAL - GOOD)).min(1.0);
        let draw: f64 = rng.gen();
        let accepted = draw < probability;
        return Decision {
            accepted,
            decision_reason: if accepted { "accept:probabilistic".to_string() } else { "reject:low_roll".to_string() },
            score,
            est_cost_cents: est_cost,
            could_be_enhanced: true,
            probability: Some(probability),
            draw: Some(draw),
            budget_status: status,
            worthiness,
        };
    }

    Decision {
        accepted: false,
        decision_reason: "reject:low_worthiness".to_string(),
        score,
        est_cost_cents: est_cost,
        could_be_enhanced: false,
        probability: None,
        draw: None,
        budget_status: status,
        worthiness,
    }
}

/// Reward table, scanned in fixed order. `usage_before` must be
/// the day's state *before* this attempt's commit.
pub fn evaluate_rewards(reflection: &str, intent: &str, actual_duration_seconds: i64, usage_before: &UsageDay) -> Vec<RewardRecord> {
    let mut rewards = Vec::new();

    if usage_before.total_ai_enhancements == 0 {
        rewards.push(RewardRecord {
            kind: "first_ai_enhancement".to_string(),
            credits: Cents::from_whole_cents(5),
            achievement: Some("ai_apprentice".to_string()),
            message: "Your first AI-enhanced pulse!".to_string(),
        });
    }

    let next_total = usage_before.total_ai_enhancements + 1;
    if next_total == 10 {
        rewards.push(RewardRecord {
            kind: "ai_enthusiast".to_string(),
            credits: Cents::from_whole_cents(5),
            achievement: Some("ai_enthusiast".to_string()),
            message: "10 AI enhancements and counting.".to_string(),
        });
    }
    if next_total == 50 {
        rewards.push(RewardRecord {
            kind: "ai_master".to_string(),
            credits: Cents::from_whole_cents(15),
            achievement: Some("ai_master".to_string()),
            message: "50 AI enhancements — true mastery.".to_string(),
        });
    }

    if actual_duration_seconds >= 2 * 3600 {
        rewards.push(RewardRecord {
            kind: "long_session".to_string(),
            credits: Cents::from_whole_cents(3),
            achievement: None,
            message: "Two hours of sustained focus.".to_string(),
        });
    }

    if reflection.chars().count() >= 200 {
        rewards.push(RewardRecord {
            kind: "deep_reflection".to_string(),
            credits: Cents::from_whole_cents(2),
            achievement: None,
            message: "A thoughtful, detailed reflection.".to_string(),
        });
    }

    let combined = format!("{} {}", intent.to_lowercase(), reflection.to_lowercase());
    if BREAKTHROUGH_WORDS[..6].iter().any(|w| combined.contains(w)) {
        rewards.push(RewardRecord {
            kind: "breakthrough_words".to_string(),
            credits: Cents::from_whole_cents(1),
            achievement: None,
            message: "Breakthrough energy in this one.".to_string(),
        });
    }

    rewards
}

/// The single place `UsageDay` counters are mutated on a completed
/// enhancement. Called from inside the `Store::atomic_update`
/// closure so the read-modify-write is race-free.
pub fn apply_enhancement(mut usage: UsageDay, actual_cost: Cents, rewards: &[RewardRecord]) -> UsageDay {
    usage.daily_cost_cents += actual_cost;
    usage.monthly_cost_cents += actual_cost;
    let reward_credits: Cents = rewards.iter().map(|r| r.credits).sum();
    usage.daily_ai_credits += reward_credits;
    usage.monthly_ai_credits += reward_credits;
    usage.daily_pulses_enhanced += 1;
    usage.total_ai_enhancements += 1;
    for r in rewards {
        if let Some(achievement) = &r.achievement {
            if !usage.achievements.contains(achievement) {
                usage.achievements.push(achievement.clone());
            }
        }
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg32;
    use rand::SeedableRng;

    fn day(tier: Tier) -> UsageDay {
        new_usage_day("u1", "2026-01-01", "2026-01", tier)
    }

    fn explanation(total: f64) -> WorthinessExplanation {
        let component = crate::models::WorthinessComponent { score: 0.0, weight: 0.0, contribution: 0.0, description: String::new() };
        WorthinessExplanation {
            total,
            content_length: component.clone(),
            duration: component.clone(),
            reflection_depth: component.clone(),
            frequency_bonus: component,
            recommendation: "probable",
        }
    }

    #[test]
    fn exceptional_score_is_always_accepted_within_budget() {
        let mut rng = Pcg32::seed_from_u64(0);
        let usage = day(Tier::Free);
        let d = evaluate(0.9, explanation(0.9), Cents::from_whole_cents(1), Tier::Free, &usage, true, &mut rng);
        assert!(d.accepted);
        assert_eq!(d.decision_reason, "accept:exceptional");
    }

    #[test]
    fn over_budget_rejects_regardless_of_score() {
        let mut rng = Pcg32::seed_from_u64(0);
        let mut usage = day(Tier::Free);
        usage.monthly_cost_cents = Cents::from_whole_cents(30);
        let d = evaluate(0.95, explanation(0.95), Cents::from_whole_cents(1), Tier::Free, &usage, true, &mut rng);
        assert!(!d.accepted);
        assert_eq!(d.decision_reason, "reject:budget");
        assert!(d.could_be_enhanced);
        assert_eq!(d.budget_status.monthly_used_cents, Cents::from_whole_cents(30));
    }

    #[test]
    fn disabled_rejects_before_budget_check() {
        let mut rng = Pcg32::seed_from_u64(0);
        let usage = day(Tier::Free);
        let d = evaluate(0.95, explanation(0.95), Cents::from_whole_cents(1), Tier::Free, &usage, false, &mut rng);
        assert_eq!(d.decision_reason, "reject:ai_disabled");
    }

    #[test]
    fn low_worthiness_always_rejects() {
        let mut rng = Pcg32::seed_from_u64(0);
        let usage = day(Tier::Free);
        let d = evaluate(0.1, explanation(0.1), Cents::from_whole_cents(1), Tier::Free, &usage, true, &mut rng);
        assert!(!d.accepted);
        assert_eq!(d.decision_reason, "reject:low_worthiness");
    }

    #[test]
    fn probabilistic_band_is_reproducible_for_a_fixed_seed() {
        let usage = day(Tier::Free);
        let mut rng_a = Pcg32::seed_from_u64(0);
        let mut rng_b = Pcg32::seed_from_u64(0);
        let a = evaluate(0.6, explanation(0.6), Cents::from_whole_cents(1), Tier::Free, &usage, true, &mut rng_a);
        let b = evaluate(0.6, explanation(0.6), Cents::from_whole_cents(1), Tier::Free, &usage, true, &mut rng_b);
        assert_eq!(a.accepted, b.accepted);
        assert_eq!(a.draw, b.draw);
    }

    #[test]
    fn first_enhancement_grants_apprentice_reward() {
        let usage = day(Tier::Free);
        let rewards = evaluate_rewards("a deep reflection", "intent", 600, &usage);
        assert!(rewards.iter().any(|r| r.kind == "first_ai_enhancement"));
    }

    #[test]
    fn apply_enhancement_never_double_counts_when_called_once() {
        let usage = day(Tier::Free);
        let rewards = evaluate_rewards("reflection", "intent", 600, &usage);
        let updated = apply_enhancement(usage, Cents::from_whole_cents(2), &rewards);
        assert_eq!(updated.total_ai_enhancements, 1);
        assert_eq!(updated.daily_cost_cents, Cents::from_whole_cents(2));
    }
}
