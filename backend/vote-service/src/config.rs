/// Configuration management for Vote Service
///
/// Loads configuration from environment variables.
use crate::services::feed::MAX_PAGE_SIZE;
use anyhow::{anyhow, Context, Result};
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const SERVICE_NAME: &str = "vote-service";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    /// Pool settings, read by `db_pool` from the `DB_*` variables
    pub database: DbConfig,
    pub feed: FeedConfig,
    pub vote: VoteConfig,
    pub loader: LoaderSettings,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port for health checks and metrics
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upper bound on posts per page, never above 50
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteConfig {
    /// Deadline of one vote unit; an expired unit is rolled back
    pub unit_timeout_ms: u64,
}

impl VoteConfig {
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_timeout_ms)
    }
}

/// Batch loader tuning for request-scoped decorations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    pub batch_delay_ms: u64,
    pub max_batch_size: usize,
}

impl LoaderSettings {
    pub fn to_loader_config(&self) -> batch_loader::LoaderConfig {
        batch_loader::LoaderConfig {
            delay: Duration::from_millis(self.batch_delay_ms),
            max_batch_size: self.max_batch_size,
        }
    }
}

// Default values
fn default_http_port() -> u16 {
    8010
}

fn default_unit_timeout_ms() -> u64 {
    5_000
}

fn default_batch_delay_ms() -> u64 {
    1
}

fn default_max_batch_size() -> usize {
    100
}

/// Parse an optional variable; unset falls back, unparseable is an error
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env("PORT", default_http_port())?,
        };

        let database = DbConfig::from_env(SERVICE_NAME)
            .map_err(|e| anyhow!(e))
            .context("Failed to load database configuration")?;

        let feed = FeedConfig {
            max_page_size: parse_env("FEED_MAX_PAGE_SIZE", MAX_PAGE_SIZE)?.clamp(1, MAX_PAGE_SIZE),
        };

        let vote = VoteConfig {
            unit_timeout_ms: parse_env("VOTE_UNIT_TIMEOUT_MS", default_unit_timeout_ms())?.max(1),
        };

        let loader = LoaderSettings {
            batch_delay_ms: parse_env("LOADER_BATCH_DELAY_MS", default_batch_delay_ms())?,
            max_batch_size: parse_env("LOADER_MAX_BATCH_SIZE", default_max_batch_size())?.max(1),
        };

        Ok(Config {
            app,
            database,
            feed,
            vote,
            loader,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production" || self.app.env == "prod"
    }
}
