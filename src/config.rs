use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use crate::services::record_normalizer::NumericPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("could not parse DB_SECRET_JSON: {0}")]
    Secret(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Document,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "relational" => Ok(StorageBackend::Postgres),
            "document" | "memory" => Ok(StorageBackend::Document),
            _ => Err(()),
        }
    }
}

/// Connection parameters for the relational backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseSettings {
    Url(String),
    Parts {
        host: String,
        user: String,
        password: Option<String>,
        database: String,
        port: u16,
    },
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match self {
            DatabaseSettings::Url(url) => PgConnectOptions::from_str(url),
            DatabaseSettings::Parts { host, user, password, database, port } => {
                let mut options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .database(database);
                if let Some(password) = password {
                    options = options.password(password);
                }
                Ok(options)
            }
        }
    }
}

// Shape of a managed-secret payload; both the RDS-style and the plain key names are accepted.
#[derive(Debug, Deserialize)]
struct DatabaseSecret {
    host: String,
    #[serde(alias = "username")]
    user: String,
    password: Option<String>,
    #[serde(alias = "dbname")]
    database: String,
    port: Option<PortValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: Option<DatabaseSettings>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub numeric_policy: NumericPolicy,
}

const DEFAULT_PORT: u16 = 5432;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>().map_err(|_| ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                value,
            })?,
            None => StorageBackend::Postgres,
        };

        let numeric_policy = match lookup("NUMERIC_COERCION") {
            Some(value) => value.parse::<NumericPolicy>().map_err(|_| ConfigError::Invalid {
                key: "NUMERIC_COERCION",
                value,
            })?,
            None => NumericPolicy::Truthy,
        };

        let database = match backend {
            StorageBackend::Postgres => Some(database_settings(&lookup)?),
            StorageBackend::Document => None,
        };

        let storage = StorageConfig {
            backend,
            database,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30)?),
        };

        Ok(Self { bind_addr, storage, numeric_policy })
    }
}

fn database_settings<F>(lookup: &F) -> Result<DatabaseSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("DB_SECRET_JSON") {
        let secret: DatabaseSecret = serde_json::from_str(&raw)?;
        let port = match secret.port {
            None => DEFAULT_PORT,
            Some(PortValue::Number(port)) => port,
            Some(PortValue::Text(text)) => text.parse().map_err(|_| ConfigError::Invalid {
                key: "DB_SECRET_JSON.port",
                value: text,
            })?,
        };
        return Ok(DatabaseSettings::Parts {
            host: secret.host,
            user: secret.user,
            password: secret.password,
            database: secret.database,
            port,
        });
    }

    if let Some(url) = lookup("DATABASE_URL") {
        return Ok(DatabaseSettings::Url(url));
    }

    Ok(DatabaseSettings::Parts {
        host: lookup("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?,
        user: lookup("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?,
        password: lookup("DB_PASSWORD"),
        database: lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?,
        port: parse_or(lookup, "DB_PORT", DEFAULT_PORT)?,
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
