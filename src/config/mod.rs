//! Runtime configuration from the environment (after `dotenvy` has loaded `.env`).

use crate::error::{AppError, ConfigError};
use crate::service::batch::DEFAULT_BATCH_SIZE;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/crudkit";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_open_conns: u32,
    /// Connections kept open while idle (pool minimum).
    pub max_idle_conns: u32,
    pub acquire_timeout: Duration,
    pub batch_size: i64,
    pub body_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_open_conns: 100,
            max_idle_conns: 10,
            acquire_timeout: Duration::from_secs(30),
            batch_size: DEFAULT_BATCH_SIZE,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = AppConfig::default();
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(d.database_url);
        if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
            return Err(ConfigError::DatabaseUrl(database_url));
        }
        let config = AppConfig {
            database_url,
            host: lookup("SERVER_HOST")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.host),
            port: parse_or(&lookup, "SERVER_PORT", d.port)?,
            max_open_conns: parse_or(&lookup, "DB_MAX_OPEN_CONNS", d.max_open_conns)?,
            max_idle_conns: parse_or(&lookup, "DB_MAX_IDLE_CONNS", d.max_idle_conns)?,
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                d.acquire_timeout.as_secs(),
            )?),
            batch_size: parse_or(&lookup, "BATCH_SIZE", d.batch_size)?,
            body_limit: parse_or(&lookup, "BODY_LIMIT_BYTES", d.body_limit)?,
        };
        if config.max_open_conns == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_OPEN_CONNS",
                value: "0".into(),
            });
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_open_conns)
            .min_connections(self.max_idle_conns.min(self.max_open_conns))
            .acquire_timeout(self.acquire_timeout)
    }

    pub async fn connect_pool(&self) -> Result<PgPool, AppError> {
        let pool = self.pool_options().connect(&self.database_url).await?;
        tracing::info!(
            max_open = self.max_open_conns,
            max_idle = self.max_idle_conns,
            "database pool ready"
        );
        Ok(pool)
    }

    /// Pool that connects on first use; for tests and tooling that may never touch the database.
    pub fn connect_lazy(&self) -> Result<PgPool, AppError> {
        Ok(self.pool_options().connect_lazy(&self.database_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, AppConfig::default());
        assert_eq!(c.bind_addr(), "127.0.0.1:3000");
        assert_eq!(c.batch_size, 100);
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let c = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://u:p@db:5432/app"),
            ("SERVER_PORT", " 8080 "),
            ("DB_MAX_OPEN_CONNS", "20"),
            ("DB_MAX_IDLE_CONNS", ""),
            ("BATCH_SIZE", "500"),
        ]))
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.max_open_conns, 20);
        assert_eq!(c.max_idle_conns, 10);
        assert_eq!(c.batch_size, 500);
        assert_eq!(c.database_url, "postgresql://u:p@db:5432/app");
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SERVER_PORT: 'eighty'");
        assert!(AppConfig::from_lookup(lookup(&[("DB_MAX_OPEN_CONNS", "0")])).is_err());
    }

    #[test]
    fn non_postgres_url_is_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("DATABASE_URL", "mysql://x/y")])),
            Err(ConfigError::DatabaseUrl(_))
        ));
    }
}
