//! Environment-variable overrides.

use crate::config::loader::ConfigError;
use crate::config::schema::RelayConfig;

pub const ENV_PREFIX: &str = "EDGE_RELAY_";

/// Source of environment lookups, so tests can supply their own.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for std::collections::HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

fn lookup<E: EnvSource>(env: &E, name: &str) -> Option<String> {
    env.get(&format!("{ENV_PREFIX}{name}"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply `EDGE_RELAY_*` overrides on top of the loaded config.
pub fn apply_env_overrides<E: EnvSource>(
    config: &mut RelayConfig,
    env: &E,
) -> Result<(), ConfigError> {
    if let Some(key) = lookup(env, "INGEST_KEY") {
        config.ingest.api_key = Some(key);
    }
    if let Some(endpoint) = lookup(env, "INGEST_ENDPOINT") {
        config.ingest.endpoint = endpoint;
    }
    if let Some(addr) = lookup(env, "LISTEN_ADDR") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup(env, "LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(raw) = lookup(env, "SCHEDULE_INTERVAL_SECS") {
        config.schedule.interval_secs = raw.parse().map_err(|_| ConfigError::Env {
            name: format!("{ENV_PREFIX}SCHEDULE_INTERVAL_SECS"),
            value: raw,
        })?;
        config.schedule.enabled = true;
    }
    Ok(())
}
