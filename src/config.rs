use crate::error::{AppResult, ConfigErrorKind, InfraError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DENIAL_EXPIRY_MS: u64 = 2000;
const DEFAULT_OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,              // e.g. "0.0.0.0:3000"
    pub static_dir: Option<PathBuf>,    // browser client, served next to /ws
    pub denial_expiry_ms: u64,          // how long a denied request stays visible
    pub outbound_buffer: usize,         // frames queued per connection before dropping
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            static_dir: None,
            denial_expiry_ms: DEFAULT_DENIAL_EXPIRY_MS,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| InfraError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Read(e),
        })?;

        Self::parse(&data).map_err(|e| {
            InfraError::Config {
                path: path.to_path_buf(),
                source: e,
            }
            .into()
        })
    }

    pub fn parse(data: &str) -> Result<Self, ConfigErrorKind> {
        toml::from_str(data).map_err(ConfigErrorKind::Parse)
    }

    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();

        let http_addr = match (lookup("HTTP_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{}", port.trim()),
            (None, None) => defaults.http_addr,
        };

        Ok(Self {
            http_addr,
            static_dir: lookup("STATIC_DIR").filter(|s| !s.is_empty()).map(PathBuf::from),
            denial_expiry_ms: parse_env(&lookup, "DENIAL_EXPIRY_MS", defaults.denial_expiry_ms)?,
            outbound_buffer: parse_env(&lookup, "OUTBOUND_BUFFER", defaults.outbound_buffer)?,
        })
    }

    pub fn denial_expiry(&self) -> Duration {
        Duration::from_millis(self.denial_expiry_ms)
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            InfraError::Env(ConfigErrorKind::InvalidEnv(key.to_string(), raw.clone())).into()
        }),
    }
}
