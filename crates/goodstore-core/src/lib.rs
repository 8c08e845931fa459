pub mod app_config;
pub mod categories;
pub mod config;
pub mod geo;
pub mod stores;

pub use app_config::{AppConfig, Environment};
pub use categories::{CategoryFilter, CategoryTag};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::Coordinate;
pub use stores::{load_store_catalog, Store, StoreCatalog, StoreId, StoreRecord};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),

    #[error("score {0} is outside 0.0..=5.0")]
    ScoreOutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read store catalog {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store catalog: {0}")]
    StoresFileParse(#[from] serde_yaml::Error),

    #[error("store catalog validation failed: {0}")]
    Validation(String),
}
