use std::net::SocketAddr;
use std::path::PathBuf;

use crate::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Optional YAML catalog; the built-in seed is served when unset.
    pub stores_path: Option<PathBuf>,
    pub api_base: String,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub map_client_id: Option<String>,
    pub map_sdk_url: String,
    pub geo_timeout_ms: u64,
    pub geo_max_age_ms: u64,
    pub fallback_center: Coordinate,
    pub map_zoom: u8,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("stores_path", &self.stores_path)
            .field("api_base", &self.api_base)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field(
                "map_client_id",
                &self.map_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field("map_sdk_url", &self.map_sdk_url)
            .field("geo_timeout_ms", &self.geo_timeout_ms)
            .field("geo_max_age_ms", &self.geo_max_age_ms)
            .field("fallback_center", &self.fallback_center)
            .field("map_zoom", &self.map_zoom)
            .finish()
    }
}
