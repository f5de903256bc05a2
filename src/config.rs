use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_SESSION_CAPACITY: u64 = 1024;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub session_ttl: Duration,
    pub session_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            session_capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = parse_or(&lookup, "APP_ADDR", DEFAULT_ADDR.parse::<SocketAddr>()?)?;
        let max_file_size = parse_or(&lookup, "MAX_FILE_SIZE", default_max_file_size())?;
        let ttl_secs = parse_or(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let session_capacity = parse_or(&lookup, "SESSION_CAPACITY", DEFAULT_SESSION_CAPACITY)?;

        if max_file_size == 0 {
            anyhow::bail!("MAX_FILE_SIZE must be greater than zero");
        }

        Ok(Config {
            bind_addr,
            max_file_size,
            session_ttl: Duration::from_secs(ttl_secs),
            session_capacity,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        _ => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Loaded config: addr={}, max_file_size={}, session_ttl={:?}",
        config.bind_addr,
        config.max_file_size,
        config.session_ttl
    );
    Ok(config)
}
