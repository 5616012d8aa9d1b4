use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::error::PulseError;
use crate::models::{ArchivedPulse, StartedPulse, StoppedPulse, MAX_TEXT_LEN};

use super::dto::{ListQuery, StartPulseRequest, StartedPulseView, StopPulseRequest};
use super::AppState;

const LIST_DEFAULT: usize = 20;
const LIST_MAX: usize = 100;

/// `user_id` always comes from the authenticated principal, never the
/// body. Real authentication is out of scope for this service; this header
/// is the seam an auth-extracting middleware would fill in.
fn extract_user_id(headers: &HeaderMap) -> Result<String, PulseError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PulseError::Validation("missing X-User-Id header".to_string()))
}

fn validate_bounded_text(field: &str, value: &str) -> Result<(), PulseError> {
    if value.trim().is_empty() {
        return Err(PulseError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(PulseError::Validation(format!("{field} exceeds {MAX_TEXT_LEN} characters")));
    }
    Ok(())
}

pub async fn start_pulse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<StartPulseRequest>,
) -> Result<Json<StartedPulse>, PulseError> {
    let user_id = extract_user_id(&headers)?;
    validate_bounded_text("intent", &body.intent)?;
    if body.duration_seconds < 1 {
        return Err(PulseError::Validation("duration_seconds must be at least 1".to_string()));
    }

    let pulse = StartedPulse {
        user_id,
        pulse_id: state.idgen.new_id(),
        intent: body.intent,
        start_time: state.clock.now(),
        duration_seconds: body.duration_seconds,
        intent_emotion: body.intent_emotion,
        tags: body.tags,
        is_public: body.is_public.unwrap_or(false),
    };

    let created = state.repo.create_started(pulse)?;
    Ok(Json(created))
}

pub async fn stop_pulse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<StopPulseRequest>,
) -> Result<Json<StoppedPulse>, PulseError> {
    let user_id = extract_user_id(&headers)?;
    validate_bounded_text("reflection", &body.reflection)?;
    let stopped_at = body.stopped_at.unwrap_or_else(|| state.clock.now());

    let stopped = state.repo.stop(&user_id, body.reflection, body.reflection_emotion, stopped_at)?;
    Ok(Json(stopped))
}

pub async fn get_started_pulse(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<StartedPulseView>, PulseError> {
    let user_id = extract_user_id(&headers)?;
    let pulse = state.repo.get_started(&user_id)?.ok_or(PulseError::NotStarted)?;

    let now = state.clock.now();
    let elapsed = (now - pulse.start_time).num_seconds().max(0);
    let remaining_seconds = (pulse.duration_seconds - elapsed).max(0);

    Ok(Json(StartedPulseView {
        pulse,
        remaining_seconds,
        server_time: now,
    }))
}

pub async fn list_ingested_pulses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ArchivedPulse>>, PulseError> {
    let user_id = extract_user_id(&headers)?;
    let limit = query.nb_items.unwrap_or(LIST_DEFAULT).min(LIST_MAX);

    let pulses = state.repo.list_archived(&user_id, limit)?;
    Ok(Json(pulses))
}
