//! Process configuration. Loaded once at startup via
//! `clap`'s env support, with `.env` picked up through `dotenvy` for local
//! runs — the same shape the teacher binary uses for its own `Args`.

use std::sync::OnceLock;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "pulseshrine", about = "Pulse session recorder with value-gated AI enrichment")]
pub struct Config {
    /// Address the API façade binds to.
    #[arg(long, env = "PULSESHRINE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Global kill switch for AI enrichment.
    #[arg(long, env = "PULSESHRINE_AI_ENABLED", default_value_t = true)]
    pub ai_enabled: bool,

    /// Model id to try first before falling back through the configured chain.
    #[arg(long, env = "PULSESHRINE_BEDROCK_MODEL_ID", default_value = "claude-haiku")]
    pub bedrock_model_id: String,

    /// Hard per-pulse cost ceiling, in whole cents.
    #[arg(long, env = "PULSESHRINE_MAX_COST_PER_PULSE_CENTS", default_value_t = 5)]
    pub max_cost_per_pulse_cents: i64,

    /// Namespace prefix under which AI-related settings are mirrored.
    #[arg(long, env = "PULSESHRINE_PARAMETER_PREFIX", default_value = "/pulseshrine/ai")]
    pub parameter_prefix: String,

    #[arg(long, env = "PULSESHRINE_TABLE_STARTED_PULSES", default_value = "started_pulses")]
    pub table_started_pulses: String,

    #[arg(long, env = "PULSESHRINE_TABLE_STOPPED_PULSES", default_value = "stopped_pulses")]
    pub table_stopped_pulses: String,

    #[arg(long, env = "PULSESHRINE_TABLE_INGESTED_PULSES", default_value = "ingested_pulses")]
    pub table_ingested_pulses: String,

    #[arg(long, env = "PULSESHRINE_TABLE_AI_USAGE_TRACKING", default_value = "ai_usage_tracking")]
    pub table_ai_usage_tracking: String,

    #[arg(long, env = "PULSESHRINE_TABLE_USERS", default_value = "users")]
    pub table_users: String,
}

impl Config {
    /// Loads `.env` (if present) before parsing so local runs don't need to
    /// export every variable by hand; a deployed process simply won't find
    /// the file and falls through to real environment variables.
    pub fn load() -> Config {
        let _ = dotenvy::dotenv();
        Config::parse()
    }
}

/// Read-through cache: the config is read once at process start and never
/// re-read, matching the "entries are small and immutable within a process
/// lifetime" model.
static CONFIG_CACHE: OnceLock<Config> = OnceLock::new();

pub struct ConfigCache;

impl ConfigCache {
    pub fn init(config: Config) {
        let _ = CONFIG_CACHE.set(config);
    }

    pub fn get() -> &'static Config {
        CONFIG_CACHE.get().expect("ConfigCache::init must run before ConfigCache::get")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_explicit_args_without_env() {
        let cfg = Config::parse_from(["pulseshrine"]);
        assert!(cfg.ai_enabled);
        assert_eq!(cfg.max_cost_per_pulse_cents, 5);
    }
}
