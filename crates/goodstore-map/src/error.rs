use goodstore_core::StoreId;
use thiserror::Error;

use crate::geolocation::PositionErrorCode;

/// Failures surfaced by the map SDK boundary.
///
/// `Clone` because one load outcome is shared by every caller waiting on the
/// in-flight load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdkError {
    #[error("map SDK script failed to load: {0}")]
    ScriptError(String),

    #[error("map SDK script loaded but the library symbol is missing")]
    SymbolMissing,

    #[error("map SDK host dropped the script load callback")]
    CallbackDropped,

    #[error("invalid map SDK script URL \"{url}\": {reason}")]
    InvalidScriptUrl { url: String, reason: String },

    #[error("map SDK call failed: {0}")]
    Call(String),
}

/// Errors returned by the HTTP store source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        /// Parsed `Retry-After` header, when the server sent one in seconds.
        retry_after: Option<std::time::Duration>,
    },

    #[error("invalid API base URL \"{base}\": {reason}")]
    InvalidBaseUrl { base: String, reason: String },
}

/// Failure taxonomy of the map view.
///
/// Every variant is contained by the component that produced it; none of them
/// abort the view.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("current location unavailable: {0}")]
    LocationUnavailable(PositionErrorCode),

    #[error("map SDK unavailable: {0}")]
    SdkLoadFailed(#[from] SdkError),

    #[error("store fetch failed: {0}")]
    StoreFetchFailed(#[from] FetchError),

    #[error("marker for store {store_id} could not be created: {source}")]
    MarkerInitFailed {
        store_id: StoreId,
        #[source]
        source: SdkError,
    },

    #[error("info window for store {store_id} could not be opened: {source}")]
    InfoWindowFailed {
        store_id: StoreId,
        #[source]
        source: SdkError,
    },

    #[error("map is not ready")]
    NotReady,

    #[error("store {0} is not on the map")]
    UnknownStore(StoreId),
}
