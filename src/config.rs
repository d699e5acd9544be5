use crate::consts::{DEFAULT_BIND_ADDR, DEFAULT_DATA_PATH, DEFAULT_VAPI_BASE_URL};

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid BIND_ADDR {value:?}: {source}")]
pub struct ConfigError {
    value: String,
    #[source]
    source: std::net::AddrParseError,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` leaves the gateway unusable; every provider call will fail.
    pub vapi_api_key: Option<String>,
    pub vapi_base_url: String,
    pub data_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError { value: bind, source })?;

        Ok(Self {
            vapi_api_key: get("VAPI_API_KEY"),
            vapi_base_url: get("VAPI_BASE_URL").unwrap_or_else(|| DEFAULT_VAPI_BASE_URL.to_string()),
            data_path: get("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            bind_addr,
        })
    }
}
