// Process configuration read from the environment (and `.env`).

use chrono_tz::Tz;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spreadsheet_id: String,
    pub google_token_file: String,
    pub tokens_dir: String,
    pub upload_temp_dir: String,
    pub timezone: Tz,
    pub graph_version: String,
    pub reconcile_interval: Duration,
    pub task_max_age: Duration,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable lookup, so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let spreadsheet_id = get("SPREADSHEET_ID").ok_or(ConfigError::Missing("SPREADSHEET_ID"))?;

        let timezone_name = get("PUBLISH_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let timezone: Tz = timezone_name.parse().map_err(|_| ConfigError::Invalid {
            name: "PUBLISH_TIMEZONE",
            value: timezone_name.clone(),
        })?;

        let port = parse_number(&get, "PORT", 3000u16)?;
        let bind_addr = match get("BIND_ADDR") {
            Some(addr) => addr.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: addr,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], port)),
        };

        Ok(Self {
            spreadsheet_id,
            google_token_file: get("GOOGLE_TOKEN_FILE").unwrap_or_else(|| "token.json".into()),
            tokens_dir: get("TOKENS_DIR").unwrap_or_else(|| "tokens".into()),
            upload_temp_dir: get("UPLOAD_TEMP_DIR").unwrap_or_else(|| "uploads_temp".into()),
            timezone,
            graph_version: get("FACEBOOK_GRAPH_VERSION").unwrap_or_else(|| "v21.0".into()),
            reconcile_interval: Duration::from_secs(parse_number(
                &get,
                "RECONCILE_INTERVAL_SECS",
                300u64,
            )?),
            task_max_age: Duration::from_secs(parse_number(&get, "TASK_MAX_AGE_SECS", 86_400u64)?),
            bind_addr,
            max_upload_bytes: parse_number(&get, "MAX_UPLOAD_BYTES", 512 * 1024 * 1024usize)?,
        })
    }
}

fn parse_number<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}
