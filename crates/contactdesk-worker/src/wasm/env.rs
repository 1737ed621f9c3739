use worker::Env;

use crate::config::{normalize_env_value, AppConfig};

/// Plain var or secret, quote-stripped; blank values count as unset.
pub fn env_string(env: &Env, key: &str) -> Option<String> {
    env.var(key)
        .map(|v| v.to_string())
        .or_else(|_| env.secret(key).map(|v| v.to_string()))
        .ok()
        .map(normalize_env_value)
        .filter(|s| !s.is_empty())
}

pub fn app_config(env: &Env) -> AppConfig {
    AppConfig::from_lookup(|key| env_string(env, key))
}
