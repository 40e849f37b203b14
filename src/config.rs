use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use tracing_subscriber::EnvFilter;

use crate::{
    constants::DEFAULT_SESSION_LIFETIME_HOURS,
    error::{Error, TypeError},
    jwt::SessionKey,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
    pub clear_cart_after_download: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: require(&lookup, "DATABASE_URL")?,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            redis_url: try_load(&lookup, "REDIS_URL", "redis://127.0.0.1/")?,
            jwt_secret: require(&lookup, "JWT_SECRET")?,
            session_lifetime_hours: try_load(
                &lookup,
                "SESSION_LIFETIME_HOURS",
                &DEFAULT_SESSION_LIFETIME_HOURS.to_string(),
            )?,
            clear_cart_after_download: try_load(&lookup, "CLEAR_CART_AFTER_DOWNLOAD", "false")?,
        })
    }

    pub fn session_key(&self) -> Result<SessionKey, Error> {
        SessionKey::new(
            self.jwt_secret.as_bytes(),
            Duration::hours(self.session_lifetime_hours),
        )
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| {
        log::error!("Environment variable {key} is required");
        TypeError::new(&format!("Missing {key}")).into()
    })
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e| {
            log::warn!("Invalid {key} value: {e}");
            TypeError::new(&format!("Invalid {key}")).into()
        })
}

/// Installs a fmt subscriber filtered by `RUST_LOG`. `log` records from the
/// SDK are forwarded to it.
pub fn init_logging() {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        log::warn!("Logger already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.redis_url, "redis://127.0.0.1/");
        assert_eq!(config.session_lifetime_hours, DEFAULT_SESSION_LIFETIME_HOURS);
        assert!(!config.clear_cart_after_download);
        assert!(config.session_key().is_ok());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/foodgram"),
            ("JWT_SECRET", "secret"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("CLEAR_CART_AFTER_DOWNLOAD", "true"),
            ("SESSION_LIFETIME_HOURS", " 2 "),
        ]))
        .unwrap();

        assert_eq!(config.database_max_connections, 20);
        assert!(config.clear_cart_after_download);
        assert_eq!(config.session_lifetime_hours, 2);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let error =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db/foodgram")])).unwrap_err();
        assert_eq!(error.info.as_deref(), Some("Missing JWT_SECRET"));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/foodgram"),
            ("JWT_SECRET", "secret"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]));
        assert!(result.is_err());
    }
}
