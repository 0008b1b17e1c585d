use std::{env, str::FromStr};

use chrono_tz::Tz;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIME_ZONE: &str = "Asia/Jakarta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Redis,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<LedgerBackend, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "redis" => Ok(LedgerBackend::Redis),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(ConfigError::Invalid("LEDGER_BACKEND", other.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

/* Bot configuration.
 * Read from the environment after .env has been loaded. The bot token itself is
 * read by teloxide from TELOXIDE_TOKEN.
 */
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub backend: LedgerBackend,
    pub redis_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub time_zone: Tz,
}

impl BotConfig {
    pub fn from_env() -> Result<BotConfig, ConfigError> {
        BotConfig::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<BotConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("LEDGER_BACKEND") {
            Some(value) => value.parse()?,
            None => LedgerBackend::Redis,
        };
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let time_zone = lookup("TIME_ZONE").unwrap_or(DEFAULT_TIME_ZONE.to_string());
        let time_zone = time_zone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid("TIME_ZONE", time_zone.clone()))?;

        Ok(BotConfig {
            backend,
            redis_url: lookup("REDIS_URL").unwrap_or(DEFAULT_REDIS_URL.to_string()),
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or(DEFAULT_GEMINI_MODEL.to_string()),
            time_zone,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "key")])).unwrap();
        assert_eq!(config.backend, LedgerBackend::Redis);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.time_zone, chrono_tz::Asia::Jakarta);
    }

    #[test]
    fn test_overrides() {
        let config = BotConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "key"),
            ("LEDGER_BACKEND", "Memory"),
            ("TIME_ZONE", "Asia/Singapore"),
        ]))
        .unwrap();
        assert_eq!(config.backend, LedgerBackend::Memory);
        assert_eq!(config.time_zone, chrono_tz::Asia::Singapore);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            BotConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("GEMINI_API_KEY")
        );
        assert!(matches!(
            BotConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "key"), ("TIME_ZONE", "Mars/Base")])),
            Err(ConfigError::Invalid("TIME_ZONE", _))
        ));
        assert!(matches!(
            BotConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "key"), ("LEDGER_BACKEND", "sqlite")])),
            Err(ConfigError::Invalid("LEDGER_BACKEND", _))
        ));
    }
}
