//! Wire shapes for the HTTP façade. Kept separate from the domain
//! model: the model carries server-assigned fields (`pulse_id`,
//! `start_time`) that a request body must never set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::StartedPulse;

#[derive(Debug, Deserialize)]
pub struct StartPulseRequest {
    pub intent: String,
    pub duration_seconds: i64,
    pub intent_emotion: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StopPulseRequest {
    pub reflection: String,
    pub reflection_emotion: Option<String>,
    pub stopped_at: Option<DateTime<Utc>>,
}

/// GET `/start-pulse` response: the live pulse plus the two fields a
/// client needs to render a countdown without its own clock skew.
#[derive(Debug, Serialize)]
pub struct StartedPulseView {
    #[serde(flatten)]
    pub pulse: StartedPulse,
    pub remaining_seconds: i64,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub nb_items: Option<usize>,
}
