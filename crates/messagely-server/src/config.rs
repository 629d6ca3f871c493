use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use messagely_db::{DbConfig, HashingConfig};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub hashing: HashingConfig,
    pub token_ttl: chrono::Duration,
    pub admins: HashSet<String>,
    pub request_timeout: Duration,
    pub db_busy_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("MESSAGELY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MESSAGELY_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = lookup("MESSAGELY_DB_PATH").unwrap_or_else(|| "messagely.db".into());
        let host = lookup("MESSAGELY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "MESSAGELY_PORT", 3000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {host}:{port}"))?;

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            iterations: parse_or(&lookup, "MESSAGELY_HASH_ITERATIONS", defaults.iterations)?,
            memory_kib: parse_or(&lookup, "MESSAGELY_HASH_MEMORY_KIB", defaults.memory_kib)?,
            ..defaults
        };

        let token_ttl_hours: i64 = parse_or(&lookup, "MESSAGELY_TOKEN_TTL_HOURS", 24)?;
        if token_ttl_hours <= 0 {
            bail!("MESSAGELY_TOKEN_TTL_HOURS must be positive");
        }

        let admins = lookup("MESSAGELY_ADMINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            jwt_secret,
            db_path: db_path.into(),
            addr,
            hashing,
            token_ttl: chrono::Duration::hours(token_ttl_hours),
            admins,
            request_timeout: Duration::from_secs(parse_or(&lookup, "MESSAGELY_REQUEST_TIMEOUT_SECS", 30)?),
            db_busy_timeout: Duration::from_millis(parse_or(&lookup, "MESSAGELY_DB_BUSY_TIMEOUT_MS", 5000)?),
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            busy_timeout: self.db_busy_timeout,
            hashing: self.hashing,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = config(&[("MESSAGELY_JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("messagely.db"));
        assert_eq!(config.hashing, HashingConfig::default());
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
        assert!(config.admins.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.db_busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(config(&[]).is_err());
        assert!(config(&[("MESSAGELY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("MESSAGELY_JWT_SECRET", "s3cret"),
            ("MESSAGELY_HOST", "127.0.0.1"),
            ("MESSAGELY_PORT", "8080"),
            ("MESSAGELY_HASH_ITERATIONS", "4"),
            ("MESSAGELY_ADMINS", "root, ops ,,"),
            ("MESSAGELY_TOKEN_TTL_HOURS", "2"),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.hashing.iterations, 4);
        assert_eq!(config.token_ttl, chrono::Duration::hours(2));
        assert_eq!(config.admins, HashSet::from(["root".to_string(), "ops".to_string()]));
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = config(&[("MESSAGELY_JWT_SECRET", "s3cret"), ("MESSAGELY_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("MESSAGELY_PORT"));
    }
}
