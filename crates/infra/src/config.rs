//! Configuration loading and representation.

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;

use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Runtime configuration, read from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    /// True when `JWT_SECRET` was absent and the dev default is in use.
    pub jwt_secret_is_default: bool,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let database_max_connections = parse_u32(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?;
        let default_page_size = parse_u32(var("DEFAULT_PAGE_SIZE"), "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_u32(var("MAX_PAGE_SIZE"), "MAX_PAGE_SIZE", MAX_PAGE_SIZE)?;
        if default_page_size > max_page_size {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_PAGE_SIZE",
                value: default_page_size.to_string(),
                reason: format!("must not exceed MAX_PAGE_SIZE ({max_page_size})"),
            });
        }

        let log_format = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected 'json' or 'pretty'".to_string(),
                });
            }
        };

        let (jwt_secret, jwt_secret_is_default) = match var("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL"),
            database_max_connections,
            jwt_secret,
            jwt_secret_is_default,
            default_page_size,
            max_page_size,
            log_format,
        })
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }
}

fn parse_u32(raw: Option<String>, var: &'static str, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
