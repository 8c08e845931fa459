//! Map SDK boundary and the load-once script loader.
//!
//! The loader is a process-wide service with one writer of its load state:
//!
//! ```text
//! NotRequested ──inject──▶ Requested ──load + symbol present──▶ Loaded
//!      │                       └──────error / symbol missing───▶ LoadFailed
//!      └──library already on the global object────────────────▶ Loaded
//! ```
//!
//! `Loaded` and `LoadFailed` are terminal until [`SdkLoader::reset`]. While
//! `Requested`, every caller awaits the same shared future, so the script is
//! injected at most once no matter how many views mount concurrently.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use goodstore_core::Coordinate;
use reqwest::Url;
use tokio::sync::oneshot;

use crate::error::SdkError;

/// Handler registered for a marker tap event.
pub type TapHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOptions {
    pub center: Coordinate,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerOptions<'a> {
    pub position: Coordinate,
    pub title: &'a str,
}

/// Capabilities exposed by the loaded map library.
///
/// Handles are opaque; the SDK owns what they point at.
pub trait MapSdk: Clone + Send + Sync + 'static {
    type Map: Send + Sync + 'static;
    type Marker: Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns [`SdkError::Call`] if the library throws during construction.
    fn create_map(&self, options: &MapOptions) -> Result<Self::Map, SdkError>;

    /// # Errors
    ///
    /// Returns [`SdkError::Call`] if the library throws during construction.
    fn create_marker(
        &self,
        map: &Self::Map,
        options: MarkerOptions<'_>,
    ) -> Result<Self::Marker, SdkError>;

    /// Registers `handler` for taps on `marker`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Call`] if the listener cannot be attached.
    fn on_marker_tap(&self, marker: &Self::Marker, handler: TapHandler) -> Result<(), SdkError>;

    /// Opens an info window anchored at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Call`] if the library throws.
    fn open_info_window(
        &self,
        map: &Self::Map,
        position: Coordinate,
        content: &str,
    ) -> Result<(), SdkError>;

    /// Detaches the marker from its map and releases its listeners.
    fn remove_marker(&self, marker: Self::Marker);

    fn destroy_map(&self, map: Self::Map);
}

/// Native outcome of a script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    Loaded,
    Failed(String),
}

/// The page hosting the map: its global object and its document head.
pub trait ScriptHost: Send + Sync + 'static {
    type Library: MapSdk;

    /// Looks the library up on the global object.
    fn library(&self) -> Option<Self::Library>;

    /// Appends one script element for `src`; the receiver fires with its
    /// `load` or `error` event.
    fn inject_script(&self, src: &str) -> oneshot::Receiver<ScriptEvent>;
}

/// Public view of the loader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    NotRequested,
    Requested,
    Loaded,
    LoadFailed,
}

type PendingLoad<L> = Shared<BoxFuture<'static, Result<L, SdkError>>>;

enum LoadState<L> {
    NotRequested,
    Requested(PendingLoad<L>),
    Loaded(L),
    LoadFailed(SdkError),
}

pub struct SdkLoader<H: ScriptHost> {
    host: Arc<H>,
    script_url: String,
    state: Mutex<LoadState<H::Library>>,
}

impl<H: ScriptHost> SdkLoader<H> {
    pub fn new(host: H, script_url: impl Into<String>) -> Self {
        Self {
            host: Arc::new(host),
            script_url: script_url.into(),
            state: Mutex::new(LoadState::NotRequested),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    pub fn phase(&self) -> LoadPhase {
        match &*self.lock_state() {
            LoadState::NotRequested => LoadPhase::NotRequested,
            LoadState::Requested(_) => LoadPhase::Requested,
            LoadState::Loaded(_) => LoadPhase::Loaded,
            LoadState::LoadFailed(_) => LoadPhase::LoadFailed,
        }
    }

    /// Returns the map library, loading it on first use.
    ///
    /// Safe to call from any number of views at once: only the first call
    /// while `NotRequested` injects the script, later calls share its outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`SdkError`] recorded by the load: script error, dropped
    /// callback, or a load that fired without exposing the library.
    pub async fn ensure_loaded(&self) -> Result<H::Library, SdkError> {
        let pending = {
            let mut state = self.lock_state();
            match &*state {
                LoadState::Loaded(library) => return Ok(library.clone()),
                LoadState::LoadFailed(e) => return Err(e.clone()),
                LoadState::Requested(pending) => pending.clone(),
                LoadState::NotRequested => {
                    if let Some(library) = self.host.library() {
                        tracing::debug!("map SDK already present on the global object");
                        *state = LoadState::Loaded(library.clone());
                        return Ok(library);
                    }

                    tracing::info!(url = %self.script_url, "injecting map SDK script");
                    let events = self.host.inject_script(&self.script_url);
                    let pending = wait_for_library(Arc::clone(&self.host), events)
                        .boxed()
                        .shared();
                    *state = LoadState::Requested(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.await;

        let mut state = self.lock_state();
        if matches!(&*state, LoadState::Requested(_)) {
            *state = match &outcome {
                Ok(library) => LoadState::Loaded(library.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "map SDK load failed");
                    LoadState::LoadFailed(e.clone())
                }
            };
        }

        outcome
    }

    /// Forgets any recorded load so the next call starts from `NotRequested`.
    ///
    /// A script already injected stays in the page; this only exists so tests
    /// can reuse one host.
    pub fn reset(&self) {
        *self.lock_state() = LoadState::NotRequested;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LoadState<H::Library>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn wait_for_library<H: ScriptHost>(
    host: Arc<H>,
    events: oneshot::Receiver<ScriptEvent>,
) -> Result<H::Library, SdkError> {
    match events.await {
        Ok(ScriptEvent::Loaded) => host.library().ok_or(SdkError::SymbolMissing),
        Ok(ScriptEvent::Failed(reason)) => Err(SdkError::ScriptError(reason)),
        Err(_) => Err(SdkError::CallbackDropped),
    }
}

/// Builds the SDK script URL carrying the client key as `ncpClientId`.
///
/// # Errors
///
/// Returns [`SdkError::InvalidScriptUrl`] if `base` is not an absolute URL.
pub fn sdk_script_url(base: &str, client_id: Option<&str>) -> Result<String, SdkError> {
    let mut url = Url::parse(base).map_err(|e| SdkError::InvalidScriptUrl {
        url: base.to_owned(),
        reason: e.to_string(),
    })?;

    if let Some(client_id) = client_id {
        url.query_pairs_mut().append_pair("ncpClientId", client_id);
    }

    Ok(url.to_string())
}
