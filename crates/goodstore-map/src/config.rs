use std::time::Duration;

use goodstore_core::{AppConfig, Coordinate};

use crate::error::SdkError;
use crate::sdk::sdk_script_url;

/// Per-view settings of the map controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub geo_timeout: Duration,
    pub geo_max_age: Duration,
    /// Map center used when the device location cannot be resolved.
    pub fallback_center: Coordinate,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            geo_timeout: Duration::from_millis(10_000),
            geo_max_age: Duration::from_millis(300_000),
            fallback_center: Coordinate::SEOUL_CITY_HALL,
            zoom: 15,
        }
    }
}

impl MapConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            geo_timeout: Duration::from_millis(config.geo_timeout_ms),
            geo_max_age: Duration::from_millis(config.geo_max_age_ms),
            fallback_center: config.fallback_center,
            zoom: config.map_zoom,
        }
    }
}

/// SDK script URL for the configured base and client key.
///
/// # Errors
///
/// Returns [`SdkError::InvalidScriptUrl`] if `map_sdk_url` is not absolute.
pub fn script_url_from_app_config(config: &AppConfig) -> Result<String, SdkError> {
    sdk_script_url(&config.map_sdk_url, config.map_client_id.as_deref())
}
