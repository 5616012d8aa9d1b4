//! Deterministic title/badge generation from curated dictionaries. This is
//! the fallback path for every pulse the admission
//! controller rejects, and the demotion target when the LLM path fails, so
//! it must never itself fail or return an empty string.

mod data;

use rand::Rng;

use crate::models::StoppedPulse;
use data::{
    Category, IntensityLevel, ACTIVITY_KEYWORDS, BADGES, CATEGORIES, EMOTION_JOURNEY_BADGES, EMOTION_TO_SENTIMENT,
    HIGH_ENERGY_EMOTIONS, INTENSITY_LEVELS, NEGATIVE_EMOTIONS, POSITIVE_EMOTIONS, SENTIMENT_BUCKETS, SYNONYMS,
};

const WORD_FUZZY_THRESHOLD: f64 = 60.0;
const TEXT_FUZZY_THRESHOLD: f64 = 50.0;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

fn category_by_name(name: &str) -> &'static Category {
    CATEGORIES.iter().find(|c| c.name == name).unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

/// Bucket match is `min ≤ d < max`, falling back to the first bucket if
/// somehow nothing matches (never happens given the table's bounds).
pub fn classify_duration(seconds: i64) -> &'static IntensityLevel {
    INTENSITY_LEVELS
        .iter()
        .find(|level| seconds >= level.min_seconds && seconds < level.max_seconds)
        .unwrap_or(&INTENSITY_LEVELS[0])
}

fn duration_suffix(level: &IntensityLevel, seconds: i64) -> String {
    let minutes = seconds as f64 / 60.0;
    let hours = seconds as f64 / 3600.0;
    match level.name {
        "micro" => format!("Quick {seconds}s burst"),
        "minor" => format!("{minutes:.0} min session"),
        "major" => format!("Focused {minutes:.0} min streak"),
        "grand" => format!("Power {hours:.1}h session"),
        _ => format!("{hours:.1}h marathon"),
    }
}

/// Fallback chain: exact match, fuzzy-word, fuzzy-text, noun scan,
/// synonym, keyword map, default — first hit wins.
pub fn classify_category(intent: &str) -> &'static Category {
    let words = tokenize(intent);
    let lower_text = intent.to_lowercase();

    for word in &words {
        if CATEGORIES.iter().any(|c| c.name == word) {
            return category_by_name(word);
        }
    }

    for word in &words {
        for cat in CATEGORIES {
            if fuzzy_ratio(word, cat.name) >= WORD_FUZZY_THRESHOLD {
                return cat;
            }
        }
    }

    for cat in CATEGORIES {
        if fuzzy_ratio(&lower_text, cat.name) >= TEXT_FUZZY_THRESHOLD {
            return cat;
        }
    }

    for cat in CATEGORIES {
        for noun in cat.nouns {
            for word in &words {
                if fuzzy_ratio(word, noun) >= WORD_FUZZY_THRESHOLD {
                    return cat;
                }
            }
        }
    }

    for word in &words {
        if let Some((_, target)) = SYNONYMS.iter().find(|(syn, _)| syn == word) {
            return category_by_name(target);
        }
    }

    for word in &words {
        if let Some((_, target)) = ACTIVITY_KEYWORDS.iter().find(|(kw, _)| kw == word) {
            return category_by_name(target);
        }
    }

    category_by_name("default")
}

fn lexical_polarity(text: &str) -> f64 {
    let words = tokenize(text);
    let positive = words.iter().filter(|w| POSITIVE_EMOTIONS.contains(&w.as_str())).count();
    let negative = words.iter().filter(|w| NEGATIVE_EMOTIONS.contains(&w.as_str())).count();
    if positive == 0 && negative == 0 {
        return 0.0;
    }
    (positive as f64 - negative as f64) / (positive + negative) as f64
}

/// Emotion tag takes priority over lexical polarity.
pub fn classify_sentiment(reflection_emotion: Option<&str>, reflection: &str) -> &'static str {
    if let Some(emotion) = reflection_emotion {
        let lower = emotion.to_lowercase();
        if let Some((_, bucket)) = EMOTION_TO_SENTIMENT.iter().find(|(e, _)| *e == lower) {
            return bucket;
        }
    }

    let polarity = lexical_polarity(reflection);
    if polarity >= 0.7 {
        "very_positive"
    } else if polarity >= 0.3 {
        "positive"
    } else if polarity >= 0.1 {
        "neutral_positive"
    } else if polarity >= -0.1 {
        "neutral"
    } else if polarity >= -0.3 {
        "neutral_negative"
    } else if polarity >= -0.7 {
        "negative"
    } else {
        "very_negative"
    }
}

fn sentiment_adjective(bucket: &str, rng: &mut impl Rng) -> &'static str {
    let adjectives = SENTIMENT_BUCKETS
        .iter()
        .find(|b| b.name == bucket)
        .map(|b| b.adjectives)
        .unwrap_or(SENTIMENT_BUCKETS[3].adjectives);
    adjectives[rng.gen_range(0..adjectives.len())]
}

const EMOTION_EMOJIS: &[(&str, &str)] = &[
    ("accomplished", "🏆"),
    ("excited", "⚡"),
    ("peaceful", "🌿"),
    ("frustrated", "😤"),
    ("tired", "🔋"),
];

fn pick_emoji(category: &Category, intent_emotion: Option<&str>, reflection_emotion: Option<&str>, rng: &mut impl Rng) -> &'static str {
    for emotion in [reflection_emotion, intent_emotion].into_iter().flatten() {
        let lower = emotion.to_lowercase();
        if let Some((_, emoji)) = EMOTION_EMOJIS.iter().find(|(e, _)| *e == lower) {
            return emoji;
        }
    }
    category.emojis[rng.gen_range(0..category.emojis.len())]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn generate_title(
    category: &Category,
    level: &IntensityLevel,
    sentiment: &str,
    intent_emotion: Option<&str>,
    reflection_emotion: Option<&str>,
    seconds: i64,
    rng: &mut impl Rng,
) -> String {
    let prefix = level.prefixes[rng.gen_range(0..level.prefixes.len())];
    let adjective = sentiment_adjective(sentiment, rng);
    let emoji = pick_emoji(category, intent_emotion, reflection_emotion, rng);

    let mut templates = vec![
        format!("{prefix} {adjective} {} {emoji}", category.action_noun),
        format!("{emoji} {prefix} {}", category.action_noun),
        format!("{} {} complete {emoji}", capitalize(adjective), category.action_noun),
        format!("{prefix} {} energy {emoji}", category.name),
    ];

    if let (Some(ie), Some(re)) = (intent_emotion, reflection_emotion) {
        if !ie.eq_ignore_ascii_case(re) {
            templates.push(format!("{emoji} From {ie} to {re}"));
        }
    }

    let base = &templates[rng.gen_range(0..templates.len())];
    format!("{base} ({})", duration_suffix(level, seconds))
}

fn generate_badge(category: &Category, level: &IntensityLevel, intent_emotion: Option<&str>, reflection_emotion: Option<&str>) -> String {
    if let (Some(ie), Some(re)) = (intent_emotion, reflection_emotion) {
        if !ie.eq_ignore_ascii_case(re) {
            let ie_lower = ie.to_lowercase();
            let re_lower = re.to_lowercase();
            if let Some((_, _, badge)) = EMOTION_JOURNEY_BADGES.iter().find(|(a, b, _)| *a == ie_lower && *b == re_lower) {
                return badge.to_string();
            }
            if matches!(level.name, "epic" | "grand") && HIGH_ENERGY_EMOTIONS.contains(&re_lower.as_str()) {
                return format!("⚡ {} Triumph", capitalize(&re_lower));
            }
        }
    }

    if let Some((_, _, badge)) = BADGES.iter().find(|(cat, lvl, _)| *cat == category.name && *lvl == level.name) {
        return badge.to_string();
    }

    match level.name {
        "epic" => "🏆 Legendary Achiever".to_string(),
        "major" => "⭐ Great Performer".to_string(),
        _ => "✨ Progress Maker".to_string(),
    }
}

/// Full rule-path enrichment: `(gen_title, gen_badge)`.
pub fn enrich(pulse: &StoppedPulse, rng: &mut impl Rng) -> (String, String) {
    let seconds = pulse.actual_duration_seconds();
    let level = classify_duration(seconds);
    let category = classify_category(&pulse.intent);
    let sentiment = classify_sentiment(pulse.reflection_emotion.as_deref(), &pulse.reflection);

    let title = generate_title(
        category,
        level,
        sentiment,
        pulse.intent_emotion.as_deref(),
        pulse.reflection_emotion.as_deref(),
        seconds,
        rng,
    );
    let badge = generate_badge(category, level, pulse.intent_emotion.as_deref(), pulse.reflection_emotion.as_deref());
    (title, badge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg32;
    use rand::SeedableRng;
    use chrono::{TimeZone, Utc};

    fn pulse(intent: &str, reflection: &str, duration_seconds: i64) -> StoppedPulse {
        StoppedPulse {
            user_id: "u1".into(),
            pulse_id: uuid::Uuid::nil(),
            intent: intent.to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            duration_seconds,
            intent_emotion: None,
            tags: None,
            is_public: false,
            reflection: reflection.to_string(),
            reflection_emotion: None,
            stopped_at: Utc.with_ymd_and_hms(2026, 1, 1, 9, 10, 0).unwrap(),
        }
    }

    #[test]
    fn s1_short_pulse_gets_quick_burst_suffix_and_default_badge() {
        let p = pulse("Quick fix", "Fixed a small bug", 600);
        let mut rng = Pcg32::seed_from_u64(0);
        let (title, badge) = enrich(&p, &mut rng);
        assert!(title.contains("Quick 600s burst"), "title was {title}");
        assert_eq!(badge, "✨ Progress Maker");
    }

    #[test]
    fn every_category_produces_a_nonempty_title_and_badge() {
        for cat in CATEGORIES {
            let p = pulse(&format!("{} time", cat.nouns.first().copied().unwrap_or(cat.name)), "a solid session", 1200);
            let mut rng = Pcg32::seed_from_u64(1);
            let (title, badge) = enrich(&p, &mut rng);
            assert!(!title.is_empty());
            assert!(!badge.is_empty());
        }
    }

    #[test]
    fn exact_category_name_match_wins_over_fuzzy() {
        let cat = classify_category("coding all day");
        assert_eq!(cat.name, "coding");
    }

    #[test]
    fn emotion_tag_overrides_lexical_sentiment() {
        assert_eq!(classify_sentiment(Some("accomplished"), "it was fine"), "very_positive");
    }

    #[test]
    fn duration_buckets_are_contiguous() {
        assert_eq!(classify_duration(0).name, "micro");
        assert_eq!(classify_duration(899).name, "micro");
        assert_eq!(classify_duration(900).name, "minor");
        assert_eq!(classify_duration(10_000).name, "epic");
    }
}
