use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, Coordinate};

pub(crate) const DEFAULT_MAP_SDK_URL: &str = "https://openapi.map.naver.com/openapi/v3/maps.js";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("GOODSTORE_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_value(
        "GOODSTORE_BIND_ADDR",
        &or_default("GOODSTORE_BIND_ADDR", "0.0.0.0:5000"),
    )?;
    let log_level = or_default("GOODSTORE_LOG_LEVEL", "info");
    let stores_path = lookup("GOODSTORE_STORES_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    let api_base = or_default("GOODSTORE_API_BASE", "http://localhost:5000")
        .trim_end_matches('/')
        .to_string();
    let http_timeout_secs: u64 = parse_value(
        "GOODSTORE_HTTP_TIMEOUT_SECS",
        &or_default("GOODSTORE_HTTP_TIMEOUT_SECS", "10"),
    )?;
    let http_max_retries: u32 = parse_value(
        "GOODSTORE_HTTP_MAX_RETRIES",
        &or_default("GOODSTORE_HTTP_MAX_RETRIES", "2"),
    )?;

    let map_client_id = lookup("GOODSTORE_MAP_CLIENT_ID")
        .ok()
        .filter(|s| !s.trim().is_empty());
    if map_client_id.is_none() && env == Environment::Production {
        return Err(ConfigError::MissingEnvVar(
            "GOODSTORE_MAP_CLIENT_ID".to_string(),
        ));
    }
    let map_sdk_url = or_default("GOODSTORE_MAP_SDK_URL", DEFAULT_MAP_SDK_URL);

    let geo_timeout_ms: u64 = parse_value(
        "GOODSTORE_GEO_TIMEOUT_MS",
        &or_default("GOODSTORE_GEO_TIMEOUT_MS", "10000"),
    )?;
    let geo_max_age_ms: u64 = parse_value(
        "GOODSTORE_GEO_MAX_AGE_MS",
        &or_default("GOODSTORE_GEO_MAX_AGE_MS", "300000"),
    )?;

    let fallback_lat: f64 = parse_value(
        "GOODSTORE_FALLBACK_LAT",
        &or_default("GOODSTORE_FALLBACK_LAT", "37.5665"),
    )?;
    let fallback_lon: f64 = parse_value(
        "GOODSTORE_FALLBACK_LON",
        &or_default("GOODSTORE_FALLBACK_LON", "126.9780"),
    )?;
    let fallback_center =
        Coordinate::new(fallback_lat, fallback_lon).map_err(|e| ConfigError::InvalidEnvVar {
            var: "GOODSTORE_FALLBACK_LAT/GOODSTORE_FALLBACK_LON".to_string(),
            reason: e.to_string(),
        })?;

    let map_zoom: u8 = parse_value(
        "GOODSTORE_MAP_ZOOM",
        &or_default("GOODSTORE_MAP_ZOOM", "15"),
    )?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        stores_path,
        api_base,
        http_timeout_secs,
        http_max_retries,
        map_client_id,
        map_sdk_url,
        geo_timeout_ms,
        geo_max_age_ms,
        fallback_center,
        map_zoom,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GOODSTORE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
