use crate::store::PgPoolSettings;
use anyhow::{anyhow, bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown SENSORD_STORAGE backend {other:?} (expected postgres or memory)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub sensor_listen_http: String,
    pub admin_listen_http: String,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub database_log: bool,
    pub db_pool_size: u32,
    pub db_acquire_timeout_ms: u64,
    pub store_timeout_ms: u64,
    pub report_window_days: u64,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let sensor_listen_http =
            env_string("SENSOR_LISTEN_HTTP").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let admin_listen_http =
            env_string("ADMIN_LISTEN_HTTP").unwrap_or_else(|| "127.0.0.1:8081".to_string());

        let storage = StorageBackend::parse(&env_string("SENSORD_STORAGE").unwrap_or_default())?;
        let database_url = env_string("DB_URL")
            .or_else(|| env_string("DATABASE_URL"))
            .map(normalize_database_url);
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing database URL"))
                .context("DB_URL or DATABASE_URL is required for the postgres storage backend");
        }
        let database_log = env_string("DB_LOG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let db_pool_size = env_parse("SENSORD_DB_POOL_SIZE")?.unwrap_or(10);
        let db_acquire_timeout_ms = env_parse("SENSORD_DB_ACQUIRE_TIMEOUT_MS")?.unwrap_or(8000);
        let store_timeout_ms = env_parse("SENSORD_STORE_TIMEOUT_MS")?.unwrap_or(5000);
        let report_window_days = env_parse("SENSORD_REPORT_WINDOW_DAYS")?.unwrap_or(7);
        if report_window_days == 0 {
            bail!("SENSORD_REPORT_WINDOW_DAYS must be at least 1");
        }
        let otlp_endpoint = env_string("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            sensor_listen_http,
            admin_listen_http,
            storage,
            database_url,
            database_log,
            db_pool_size: db_pool_size.max(1),
            db_acquire_timeout_ms,
            store_timeout_ms,
            report_window_days,
            otlp_endpoint,
        })
    }

    pub fn pool_settings(&self) -> PgPoolSettings {
        PgPoolSettings {
            max_connections: self.db_pool_size,
            acquire_timeout: Duration::from_millis(self.db_acquire_timeout_ms),
            log_statements: self.database_log,
        }
    }

    pub fn store_deadline(&self) -> Option<Duration> {
        if self.store_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.store_timeout_ms))
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(key)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid {key}: {raw:?}")))
        .transpose()
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}
