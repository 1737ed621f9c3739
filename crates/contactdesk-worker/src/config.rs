/// Runtime settings resolved once per request from the worker environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public origin used to build links in emails, without trailing slash.
    pub base_url: String,
    pub production: bool,
    /// Inbox receiving in-app feedback; feedback is only stored when unset.
    pub feedback_email: Option<String>,
    pub cache_revalidate_seconds: i64,
    pub password_iterations: u32,
    pub session_max_age_seconds: i64,
}

pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;
pub const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            production: false,
            feedback_email: None,
            cache_revalidate_seconds: default_revalidate_seconds(false),
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
            session_max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
        }
    }
}

pub fn default_revalidate_seconds(production: bool) -> i64 {
    if production {
        3600
    } else {
        120
    }
}

pub fn normalize_env_value(raw: String) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return inner.trim().to_string();
    }

    trimmed.to_string()
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl AppConfig {
    /// Build from a key lookup (worker vars, secrets, or a test map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(normalize_env_value)
                .filter(|s| !s.is_empty())
        };

        let production = get("APP_PRODUCTION").is_some_and(|v| parse_bool(&v));
        let base_url = get("APP_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| AppConfig::default().base_url);

        let cache_revalidate_seconds = get("CACHE_REVALIDATE_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or_else(|| default_revalidate_seconds(production));

        let password_iterations = get("PASSWORD_ITERATIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PASSWORD_ITERATIONS);

        let session_max_age_seconds = get("SESSION_MAX_AGE_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECONDS);

        Self {
            base_url,
            production,
            feedback_email: get("FEEDBACK_EMAIL"),
            cache_revalidate_seconds,
            password_iterations,
            session_max_age_seconds,
        }
    }

    pub fn invitation_link(&self, token: &str) -> String {
        format!("{}/invitations/request/{token}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn production_defaults_to_hour_long_revalidation() {
        let config = AppConfig::from_lookup(lookup(&[("APP_PRODUCTION", "\"true\"")]));
        assert!(config.production);
        assert_eq!(config.cache_revalidate_seconds, 3600);
    }

    #[test]
    fn development_defaults_to_two_minutes() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert!(!config.production);
        assert_eq!(config.cache_revalidate_seconds, 120);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = AppConfig::from_lookup(lookup(&[("APP_BASE_URL", " 'https://crm.test/' ")]));
        assert_eq!(
            config.invitation_link("abc"),
            "https://crm.test/invitations/request/abc"
        );
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PASSWORD_ITERATIONS", "0"),
            ("CACHE_REVALIDATE_SECONDS", "soon"),
        ]));
        assert_eq!(config.password_iterations, DEFAULT_PASSWORD_ITERATIONS);
        assert_eq!(config.cache_revalidate_seconds, 120);
    }
}
