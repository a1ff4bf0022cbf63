use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::Level;
use url::Url;

use crate::login::Theme;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be set.")]
    Missing(&'static str),

    #[error("{key} can't be parsed: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("WEBHOOK_URL and WEBHOOK_ADDR must be set together")]
    PartialWebhook,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub url: Url,
    pub address: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bot_token: String,
    pub log_level: Level,
    pub webhook: Option<Webhook>,
    pub session_ttl: Duration,
    pub login_theme: Theme,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let log_level = parse_or(&lookup, "LOG_LEVEL", Level::ERROR)?;

        let webhook = match (lookup("WEBHOOK_URL"), lookup("WEBHOOK_ADDR")) {
            (Some(url), Some(address)) => Some(Webhook {
                url: parse("WEBHOOK_URL", url)?,
                address: parse("WEBHOOK_ADDR", address)?,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialWebhook),
        };

        let ttl_minutes: i64 = parse_or(&lookup, "SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES)?;
        let session_ttl = Duration::try_minutes(ttl_minutes)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| ConfigError::Invalid {
                key: "SESSION_TTL_MINUTES",
                value: ttl_minutes.to_string(),
            })?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bot_token: required("TELOXIDE_TOKEN")?,
            log_level,
            webhook,
            session_ttl,
            login_theme: parse_or(&lookup, "LOGIN_THEME", Theme::default())?,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => parse(key, value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/quizzes"),
        ("TELOXIDE_TOKEN", "123:abc"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = config(&REQUIRED).unwrap();

        assert_eq!(config.log_level, Level::ERROR);
        assert_eq!(config.webhook, None);
        assert_eq!(config.session_ttl, Duration::minutes(1440));
        assert_eq!(config.login_theme, Theme::Emoji);
    }

    #[test]
    fn missing_token_is_reported() {
        let err = config(&REQUIRED[..1]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELOXIDE_TOKEN"));
    }

    #[test]
    fn webhook_requires_both_halves() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WEBHOOK_URL", "https://example.com/bot"));
        assert_eq!(config(&vars).unwrap_err(), ConfigError::PartialWebhook);

        vars.push(("WEBHOOK_ADDR", "0.0.0.0:8443"));
        let webhook = config(&vars).unwrap().webhook.unwrap();
        assert_eq!(webhook.address.port(), 8443);
        assert_eq!(webhook.url.host_str(), Some("example.com"));
    }

    #[test]
    fn invalid_values_name_their_key() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LOG_LEVEL", "chatty"));
        assert!(matches!(
            config(&vars).unwrap_err(),
            ConfigError::Invalid { key: "LOG_LEVEL", .. }
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("SESSION_TTL_MINUTES", "0"));
        assert!(matches!(
            config(&vars).unwrap_err(),
            ConfigError::Invalid { key: "SESSION_TTL_MINUTES", .. }
        ));
    }

    #[test]
    fn theme_and_level_are_read() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LOG_LEVEL", "debug"));
        vars.push(("LOGIN_THEME", "plain"));
        let config = config(&vars).unwrap();

        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.login_theme, Theme::Plain);
    }
}
