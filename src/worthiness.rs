//! Deterministic worthiness scorer. Maps a stopped pulse
//! plus the user's same-day pulse count to a score in `[0,1]`; the budget
//! controller uses this score, never the raw text, to decide
//! admission.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{StoppedPulse, WorthinessComponent, WorthinessExplanation};

pub const EXCEPTIONAL: f64 = 0.8;
pub const GOOD: f64 = 0.4;

const WEIGHT_LENGTH: f64 = 0.4;
const WEIGHT_DURATION: f64 = 0.3;
const WEIGHT_REFLECTION: f64 = 0.2;
const WEIGHT_FREQUENCY: f64 = 0.1;

/// Reused verbatim by the budget service's own breakthrough-word reward
/// trigger, which checks the first six of these.
pub(crate) const BREAKTHROUGH_WORDS: &[&str] = &[
    "breakthrough",
    "innovation",
    "revolutionary",
    "novel",
    "pioneering",
    "discovery",
    "groundbreaking",
    "cutting-edge",
    "advanced",
    "sophisticated",
    "exceptional",
    "remarkable",
    "extraordinary",
    "unprecedented",
    "milestone",
    "achievement",
    "success",
    "triumph",
    "victory",
    "accomplishment",
];

struct TechnicalDomain {
    keywords: &'static [&'static str],
}

const TECHNICAL_DOMAINS: &[TechnicalDomain] = &[
    TechnicalDomain {
        keywords: &[
            "ai",
            "artificial intelligence",
            "machine learning",
            "ml",
            "neural",
            "deep learning",
            "transformer",
            "algorithm",
            "model",
            "training",
            "inference",
            "data science",
        ],
    },
    TechnicalDomain {
        keywords: &[
            "research",
            "study",
            "analysis",
            "investigation",
            "experiment",
            "hypothesis",
            "methodology",
            "findings",
            "results",
            "conclusion",
            "publication",
        ],
    },
    TechnicalDomain {
        keywords: &[
            "engineering",
            "development",
            "coding",
            "programming",
            "software",
            "system",
            "architecture",
            "design",
            "implementation",
            "optimization",
            "performance",
        ],
    },
    TechnicalDomain {
        keywords: &[
            "creative",
            "design",
            "art",
            "writing",
            "content",
            "visual",
            "aesthetic",
            "inspiration",
            "imagination",
            "artistic",
            "innovative design",
        ],
    },
    TechnicalDomain {
        keywords: &[
            "strategy",
            "planning",
            "meeting",
            "presentation",
            "analysis",
            "decision",
            "leadership",
            "management",
            "collaboration",
            "teamwork",
        ],
    },
];

const ELITE_END_EMOTIONS: &[&str] = &["breakthrough", "innovative", "accomplished", "exhilarated"];
const POSITIVE_EMOTIONS: &[&str] = &[
    "accomplished",
    "fulfilled",
    "energized",
    "breakthrough",
    "innovative",
    "creative",
    "excited",
    "motivated",
    "inspired",
    "confident",
    "proud",
    "satisfied",
    "successful",
    "triumphant",
    "exhilarated",
];
const NEGATIVE_EMOTIONS: &[&str] = &[
    "frustrated",
    "tired",
    "stuck",
    "confused",
    "overwhelmed",
    "disappointed",
    "discouraged",
    "stressed",
    "anxious",
    "blocked",
];
const ACTION_VERBS: &[&str] = &[
    "implemented",
    "developed",
    "created",
    "built",
    "designed",
    "achieved",
    "completed",
    "solved",
    "optimized",
    "improved",
];

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?(?:%|percent|hours?|minutes?|seconds?|mb|gb|tb|kb)").unwrap());
static TECH_PATTERN_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\w+(?:API|SDK|ML|AI|DB|SQL|HTTP|JSON|XML|CSS|HTML|JS)\b").unwrap());
static TECH_PATTERN_PRACTICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:algorithm|architecture|framework|methodology|implementation)\b").unwrap());
static TECH_PATTERN_QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:performance|optimization|efficiency|scalability|reliability)\b").unwrap());

/// L component: `len(intent) + len(reflection)`, both already capped at 200
/// chars on ingress.
pub fn length_score(intent: &str, reflection: &str) -> f64 {
    let n = (intent.chars().count() + reflection.chars().count()) as f64;
    if n >= 350.0 {
        1.0
    } else if n >= 250.0 {
        0.8 + (n - 250.0) / 100.0 * 0.2
    } else if n >= 150.0 {
        0.5 + (n - 150.0) / 100.0 * 0.3
    } else if n >= 50.0 {
        0.2 + (n - 50.0) / 100.0 * 0.3
    } else {
        n / 50.0 * 0.2
    }
}

/// Duration component, Pomodoro-oriented minutes thresholds.
pub fn duration_score(actual_duration_seconds: i64) -> f64 {
    let m = actual_duration_seconds as f64 / 60.0;
    if m >= 90.0 {
        1.0
    } else if m >= 60.0 {
        0.8 + (m - 60.0) / 30.0 * 0.2
    } else if m >= 30.0 {
        0.6 + (m - 30.0) / 30.0 * 0.2
    } else if m >= 20.0 {
        0.4 + (m - 20.0) / 10.0 * 0.2
    } else if m >= 10.0 {
        0.2 + (m - 10.0) / 10.0 * 0.2
    } else {
        m / 10.0 * 0.2
    }
}

fn breakthrough_score(content: &str) -> f64 {
    let count = BREAKTHROUGH_WORDS.iter().filter(|w| content.contains(*w)).count();
    (count as f64 * 0.1).min(0.3)
}

/// Scans domains in fixed order and stops at the first one with any keyword
/// present, so a pulse spanning two domains only ever scores one.
fn domain_score(content: &str) -> f64 {
    for domain in TECHNICAL_DOMAINS {
        let matches = domain.keywords.iter().filter(|k| content.contains(*k)).count();
        if matches > 0 {
            return (matches as f64 * 0.05).min(0.2);
        }
    }
    0.0
}

fn emotion_score(intent_emotion: Option<&str>, reflection_emotion: Option<&str>) -> f64 {
    let mut score = 0.0;
    let re = reflection_emotion.map(str::to_lowercase);
    let ie = intent_emotion.map(str::to_lowercase);

    if let Some(re) = &re {
        if POSITIVE_EMOTIONS.contains(&re.as_str()) {
            score += 0.15;
        }
        if let Some(ie) = &ie {
            if NEGATIVE_EMOTIONS.contains(&ie.as_str()) && POSITIVE_EMOTIONS.contains(&re.as_str()) {
                score += 0.15;
            }
        }
        if ELITE_END_EMOTIONS.contains(&re.as_str()) {
            score += 0.1;
        }
    }
    score
}

/// Four fixed contributions: a number/unit pattern, three tech-jargon
/// patterns (+0.03 each, present-or-not rather than count-weighted), two or
/// more long sentences, and action-verb density.
fn specificity_score(content: &str) -> f64 {
    let mut score = 0.0;

    if NUMBER_RE.is_match(content) {
        score += 0.05;
    }

    for pattern in [&*TECH_PATTERN_ACRONYM, &*TECH_PATTERN_PRACTICE, &*TECH_PATTERN_QUALITY] {
        if pattern.is_match(content) {
            score += 0.03;
        }
    }

    let long_sentences = content.split('.').filter(|s| s.trim().chars().count() > 80).count();
    if long_sentences >= 2 {
        score += 0.05;
    }

    let action_count = ACTION_VERBS.iter().filter(|v| content.contains(*v)).count();
    score += (action_count as f64 * 0.02).min(0.05);

    score
}

/// Reflection-depth component: four sub-scores, clamped to 1.0.
pub fn reflection_depth_score(
    intent: &str,
    reflection: &str,
    intent_emotion: Option<&str>,
    reflection_emotion: Option<&str>,
) -> f64 {
    let content = format!("{} {}", intent.to_lowercase(), reflection.to_lowercase());

    let total =
        breakthrough_score(&content) + domain_score(&content) + emotion_score(intent_emotion, reflection_emotion) + specificity_score(&content);
    total.min(1.0)
}

/// F component. `None` means the caller has no usage history available
/// (matches the original's "no budget service" fallback).
pub fn frequency_bonus(daily_pulse_count: Option<u32>) -> f64 {
    match daily_pulse_count {
        None => 0.5,
        Some(n) if n >= 5 => 1.0,
        Some(n) if n >= 3 => 0.7 + (n - 3) as f64 * 0.15,
        Some(n) if n >= 2 => 0.5 + (n - 2) as f64 * 0.2,
        Some(n) if n >= 1 => 0.3,
        Some(_) => 0.5,
    }
}

pub fn score(pulse: &StoppedPulse, daily_pulse_count: Option<u32>) -> f64 {
    let l = length_score(&pulse.intent, &pulse.reflection);
    let d = duration_score(pulse.actual_duration_seconds());
    let r = reflection_depth_score(
        &pulse.intent,
        &pulse.reflection,
        pulse.intent_emotion.as_deref(),
        pulse.reflection_emotion.as_deref(),
    );
    let f = frequency_bonus(daily_pulse_count);
    (WEIGHT_LENGTH * l + WEIGHT_DURATION * d + WEIGHT_REFLECTION * r + WEIGHT_FREQUENCY * f).clamp(0.0, 1.0)
}

/// Component breakdown for API transparency.
pub fn explain(pulse: &StoppedPulse, daily_pulse_count: Option<u32>) -> WorthinessExplanation {
    let l = length_score(&pulse.intent, &pulse.reflection);
    let d = duration_score(pulse.actual_duration_seconds());
    let r = reflection_depth_score(
        &pulse.intent,
        &pulse.reflection,
        pulse.intent_emotion.as_deref(),
        pulse.reflection_emotion.as_deref(),
    );
    let f = frequency_bonus(daily_pulse_count);
    let total = (WEIGHT_LENGTH * l + WEIGHT_DURATION * d + WEIGHT_REFLECTION * r + WEIGHT_FREQUENCY * f).clamp(0.0, 1.0);

    let recommendation = if total >= EXCEPTIONAL {
        "guaranteed"
    } else if total >= GOOD {
        "probable"
    } else {
        "unlikely"
    };

    WorthinessExplanation {
        total,
        content_length: WorthinessComponent {
            score: l,
            weight: WEIGHT_LENGTH,
            contribution: WEIGHT_LENGTH * l,
            description: "combined length of intent and reflection".to_string(),
        },
        duration: WorthinessComponent {
            score: d,
            weight: WEIGHT_DURATION,
            contribution: WEIGHT_DURATION * d,
            description: "actual focused duration in minutes".to_string(),
        },
        reflection_depth: WorthinessComponent {
            score: r,
            weight: WEIGHT_REFLECTION,
            contribution: WEIGHT_REFLECTION * r,
            description: "breakthrough language, technical domain, emotional arc, specificity".to_string(),
        },
        frequency_bonus: WorthinessComponent {
            score: f,
            weight: WEIGHT_FREQUENCY,
            contribution: WEIGHT_FREQUENCY * f,
            description: "same-day pulse count".to_string(),
        },
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pulse(intent: &str, reflection: &str, duration_seconds: i64, ie: Option<&str>, re: Option<&str>) -> StoppedPulse {
        StoppedPulse {
            user_id: "u1".into(),
            pulse_id: uuid::Uuid::nil(),
            intent: intent.to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            duration_seconds,
            intent_emotion: ie.map(str::to_string),
            tags: None,
            is_public: false,
            reflection: reflection.to_string(),
            reflection_emotion: re.map(str::to_string),
            stopped_at: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + chrono::Duration::seconds(duration_seconds),
        }
    }

    #[test]
    fn s1_short_pulse_scores_low() {
        let p = pulse("Quick fix", "Fixed a small bug", 600, None, None);
        let s = score(&p, None);
        assert!(s < GOOD, "expected below GOOD threshold, got {s}");
    }

    #[test]
    fn score_is_always_in_unit_interval() {
        let p = pulse(&"x".repeat(200), &"y".repeat(200), 10_000, Some("excited"), Some("accomplished"));
        let s = score(&p, Some(10));
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn longer_text_never_decreases_length_score() {
        let short = length_score("short", "short");
        let long = length_score(&"word ".repeat(80), &"word ".repeat(80));
        assert!(long >= short);
    }

    #[test]
    fn duration_score_is_monotone_non_decreasing() {
        let mut prev = duration_score(0);
        for secs in (0..10_000).step_by(60) {
            let cur = duration_score(secs);
            assert!(cur >= prev - 1e-9);
            prev = cur;
        }
    }

    #[test]
    fn frequency_bonus_matches_fixed_table() {
        assert_eq!(frequency_bonus(None), 0.5);
        assert_eq!(frequency_bonus(Some(1)), 0.3);
        assert!((frequency_bonus(Some(5)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exceptional_session_crosses_threshold() {
        let intent = "Breakthrough discovery: finally cracked the model training pipeline after a \
            long research milestone push into neural network architecture and algorithm design";
        let reflection = "I implemented the new training algorithm and achieved a major performance \
            optimization in the model architecture; inference latency dropped by 42% after hours of \
            focused work, and I felt truly accomplished and energized. This breakthrough also marks a \
            genuine research milestone because the neural training pipeline finally converged, and I \
            optimized the achievement into a real discovery today.";
        let p = pulse(intent, reflection, 7_500, Some("frustrated"), Some("accomplished"));
        let s = score(&p, Some(5));
        assert!(s >= EXCEPTIONAL, "expected exceptional score, got {s}");
    }
}
