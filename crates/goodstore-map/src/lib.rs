//! Client side of the store map: device location, the map SDK, the marker
//! set and the controller tying them together for one view.

pub mod config;
pub mod controller;
pub mod error;
pub mod geolocation;
pub mod markers;
mod retry;
pub mod sdk;
pub mod source;

#[cfg(test)]
mod test_support;

pub use config::{script_url_from_app_config, MapConfig};
pub use controller::{MapInitState, MapViewController, PLACEHOLDER_MESSAGE, STORE_FETCH_NOTICE};
pub use error::{FetchError, MapError, SdkError};
pub use geolocation::{
    GeolocationResolver, Position, PositionError, PositionErrorCode, PositionOptions,
    PositionProvider,
};
pub use markers::{MarkerSetManager, StoreTapCallback, SyncReport};
pub use sdk::{
    sdk_script_url, LoadPhase, MapOptions, MapSdk, MarkerOptions, ScriptEvent, ScriptHost,
    SdkLoader, TapHandler,
};
pub use source::{HttpStoreSource, StoreSource};
