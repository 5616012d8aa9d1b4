//! LLM-backed enrichment. Three sequential calls per pulse
//! — title, badge, insights — each with its own prompt, token budget, and
//! response cleaner. A parse failure on one field falls back to that
//! field's deterministic default rather than failing the whole pulse; a
//! model-unavailable or over-budget failure is the only thing that demotes
//! the whole pulse to the rule path (handled by the orchestrator).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{AiInsights, StoppedPulse};
use crate::money::Cents;

/// Tried in order after the configured model fails its probe.
pub const FALLBACK_MODELS: &[&str] = &["haiku-class", "nova-lite-us", "nova-lite-eu", "nova-lite-apac"];

const IN_RATE_CENTS_PER_1K: f64 = 0.25;
const OUT_RATE_CENTS_PER_1K: f64 = 1.25;
/// Sequence multiplier: the pre-flight estimate covers all three calls with
/// headroom, not a tight per-call sum.
const SEQUENCE_MULTIPLIER: f64 = 4.0;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no configured or fallback model responded to the probe")]
    ModelUnavailable,
    #[error("could not parse a usable response for {0}")]
    ModelParseError(&'static str),
    #[error("estimated cost exceeds the configured per-pulse cap")]
    CostExceeded,
}

pub struct LlmCallResult {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The vendor wire format is out of scope for this crate; this is the seam a
/// concrete Bedrock/Anthropic/etc. client plugs into.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<LlmCallResult, LlmError>;
}

fn estimate_tokens(total_chars: usize) -> (u32, u32) {
    let input = ((total_chars as f64) / 4.0).ceil() as u32;
    let output = (50 + 2 * input).min(300);
    (input, output)
}

/// Cost estimation, scaled for the three-call sequence.
pub fn estimate_cost(intent: &str, reflection: &str) -> Cents {
    let total_chars = intent.chars().count() + reflection.chars().count();
    let (input, output) = estimate_tokens(total_chars);
    let per_call = (input as f64 / 1000.0) * IN_RATE_CENTS_PER_1K + (output as f64 / 1000.0) * OUT_RATE_CENTS_PER_1K;
    Cents::from_cents_f64(per_call * SEQUENCE_MULTIPLIER)
}

fn actual_cost(input_tokens: u32, output_tokens: u32) -> Cents {
    let cost = (input_tokens as f64 / 1000.0) * IN_RATE_CENTS_PER_1K + (output_tokens as f64 / 1000.0) * OUT_RATE_CENTS_PER_1K;
    Cents::from_cents_f64(cost)
}

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());
static JSON_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
const VERBOSE_PREFIXES: &[&str] = &["RAW JSON:", "JSON:", "TITLE:", "BADGE:", "ANSWER:"];

fn strip_verbose_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    for prefix in VERBOSE_PREFIXES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim();
        }
    }
    trimmed
}

/// Cleans a free-text response (title/badge calls): strips code fences,
/// verbose prefixes, surrounding quotes, and takes the first non-empty line.
pub fn clean_text_response(raw: &str) -> String {
    let unfenced = if let Some(caps) = CODE_FENCE_RE.captures(raw) {
        caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_else(|| raw.to_string())
    } else {
        raw.to_string()
    };
    let stripped = strip_verbose_prefix(&unfenced);
    let first_line = stripped.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    first_line.trim_matches('"').trim_matches('\'').to_string()
}

/// Cleans and parses a JSON response (insights call). Strips fences and
/// prefixes, then as a last resort regex-extracts the first `{...}` block.
pub fn clean_json_response(raw: &str) -> Option<serde_json::Value> {
    let unfenced = if let Some(caps) = CODE_FENCE_RE.captures(raw) {
        caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_else(|| raw.to_string())
    } else {
        raw.to_string()
    };
    let stripped = strip_verbose_prefix(&unfenced);

    if let Ok(v) = serde_json::from_str::<serde_json::Value>(stripped) {
        return Some(v);
    }
    if let Some(m) = JSON_BLOCK_RE.find(stripped) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(m.as_str()) {
            return Some(v);
        }
    }
    None
}

fn title_prompt(pulse: &StoppedPulse) -> String {
    format!(
        "Write a short, energetic title (max 8 words) for a focus session.\nIntent: {}\nReflection: {}\nRespond with the title only.",
        pulse.intent, pulse.reflection
    )
}

fn badge_prompt(pulse: &StoppedPulse, title: &str) -> String {
    format!(
        "Pick a one-line celebratory badge (emoji + short phrase) for this completed session titled \"{title}\".\nReflection: {}\nRespond with the badge only.",
        pulse.reflection
    )
}

fn insights_prompt(pulse: &StoppedPulse) -> String {
    format!(
        "Analyze this focus session and respond with a JSON object with keys \
         productivity_score (1-10 integer), key_insight, next_suggestion, mood_assessment, emotion_pattern.\n\
         Intent: {}\nReflection: {}\nRAW JSON:",
        pulse.intent, pulse.reflection
    )
}

#[derive(Debug, Deserialize, Serialize)]
struct RawInsights {
    productivity_score: u8,
    key_insight: String,
    next_suggestion: String,
    mood_assessment: String,
    emotion_pattern: String,
}

fn fallback_insights() -> AiInsights {
    AiInsights {
        productivity_score: 5,
        key_insight: "You showed up and did the work.".to_string(),
        next_suggestion: "Keep the same time block tomorrow.".to_string(),
        mood_assessment: "steady".to_string(),
        emotion_pattern: "consistent".to_string(),
    }
}

pub struct EnrichmentOutcome {
    pub title: String,
    pub badge: String,
    pub insights: AiInsights,
    pub model_used: String,
    pub actual_cost_cents: Cents,
}

/// Probes the configured model first, then the fixed fallback chain, each
/// with a 1-token request.
pub async fn select_model(client: &dyn LlmClient, configured_model: &str) -> Result<String, LlmError> {
    for candidate in std::iter::once(configured_model).chain(FALLBACK_MODELS.iter().copied()) {
        if client.generate(candidate, "ping", 1).await.is_ok() {
            return Ok(candidate.to_string());
        }
    }
    Err(LlmError::ModelUnavailable)
}

/// Runs the title → badge → insights sequence against the already-selected
/// model. A JSON/text parse failure on one field degrades only that field;
/// a transport-level failure propagates (the orchestrator demotes the whole
/// pulse on that).
pub async fn enrich(client: &dyn LlmClient, model: &str, pulse: &StoppedPulse, max_cost_cents: Cents) -> Result<EnrichmentOutcome, LlmError> {
    let est = estimate_cost(&pulse.intent, &pulse.reflection);
    if est > max_cost_cents {
        return Err(LlmError::CostExceeded);
    }

    let title_call = client.generate(model, &title_prompt(pulse), 32).await?;
    let title = {
        let cleaned = clean_text_response(&title_call.text);
        if cleaned.is_empty() {
            format!("{} Session", pulse.intent.chars().take(20).collect::<String>())
        } else {
            cleaned
        }
    };

    let badge_call = client.generate(model, &badge_prompt(pulse, &title), 16).await?;
    let badge = {
        let cleaned = clean_text_response(&badge_call.text);
        if cleaned.is_empty() {
            "✨ Progress Maker".to_string()
        } else {
            cleaned
        }
    };

    let insights_call = client.generate(model, &insights_prompt(pulse), 160).await?;
    let insights = clean_json_response(&insights_call.text)
        .and_then(|v| serde_json::from_value::<RawInsights>(v).ok())
        .map(|r| AiInsights {
            productivity_score: r.productivity_score.clamp(1, 10),
            key_insight: r.key_insight,
            next_suggestion: r.next_suggestion,
            mood_assessment: r.mood_assessment,
            emotion_pattern: r.emotion_pattern,
        })
        .unwrap_or_else(fallback_insights);

    let total_input = title_call.input_tokens + badge_call.input_tokens + insights_call.input_tokens;
    let total_output = title_call.output_tokens + badge_call.output_tokens + insights_call.output_tokens;

    Ok(EnrichmentOutcome {
        title,
        badge,
        insights,
        model_used: model.to_string(),
        actual_cost_cents: actual_cost(total_input, total_output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fence_and_prefix() {
        let raw = "```json\nRAW JSON: {\"a\": 1}\n```";
        let cleaned = clean_json_response(raw).unwrap();
        assert_eq!(cleaned["a"], 1);
    }

    #[test]
    fn extracts_first_json_block_as_last_resort() {
        let raw = "Sure, here you go: {\"productivity_score\": 7} — hope that helps!";
        let cleaned = clean_json_response(raw).unwrap();
        assert_eq!(cleaned["productivity_score"], 7);
    }

    #[test]
    fn returns_none_for_unparseable_garbage() {
        assert!(clean_json_response("not json at all").is_none());
    }

    #[test]
    fn text_cleaner_strips_quotes_and_prefix() {
        assert_eq!(clean_text_response("TITLE: \"Deep Work Win\""), "Deep Work Win");
    }

    #[test]
    fn cost_estimate_scales_with_text_length() {
        let short = estimate_cost("hi", "ok");
        let long = estimate_cost(&"word ".repeat(40), &"word ".repeat(40));
        assert!(long > short);
    }
}
