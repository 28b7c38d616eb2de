//! Environment-backed configuration, loaded once at startup.

use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
    pub storage_backend: StorageBackend,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub prune_interval_secs: u64,
}

/// Bootstrap admin account, created on first start when the user table is
/// empty.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres,
            other => bail!("unknown STORAGE_BACKEND: {other}"),
        };

        let database = DatabaseConfig {
            url: if storage_backend == StorageBackend::Postgres {
                env::var("DATABASE_URL").context("DATABASE_URL is required for the postgres backend")?
            } else {
                env::var("DATABASE_URL").unwrap_or_default()
            },
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("SERVER_PORT", 5000)?,
            },
            database,
            session: SessionConfig {
                ttl_hours: env_parse("SESSION_TTL_HOURS", 24)?,
                prune_interval_secs: env_parse("SESSION_PRUNE_INTERVAL_SECS", 3600)?,
            },
            admin: AdminConfig {
                username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string()),
                full_name: env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| "Admin User".to_string()),
            },
            storage_backend,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("invalid {key}")),
        Err(_) => Ok(default),
    }
}
