//! In-memory stand-ins for the page, the map library and the store API.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use goodstore_core::{CategoryFilter, CategoryTag, Coordinate, Store, StoreId};
use tokio::sync::{oneshot, Notify};

use crate::error::{FetchError, SdkError};
use crate::geolocation::{Position, PositionError, PositionOptions, PositionProvider};
use crate::sdk::{MapOptions, MapSdk, MarkerOptions, ScriptEvent, ScriptHost, TapHandler};
use crate::source::StoreSource;

#[allow(clippy::cast_precision_loss)]
pub(crate) fn store(id: i64, tags: &[CategoryTag]) -> Store {
    Store {
        id: StoreId(id),
        name: format!("store-{id}"),
        location: Coordinate {
            latitude: 37.56 + (id % 100) as f64 * 0.0001,
            longitude: 126.97,
        },
        score: 4.0,
        categories: tags.iter().copied().collect(),
    }
}

struct FakeMarkerState {
    title: String,
    handler: Option<TapHandler>,
}

#[derive(Default)]
struct FakeSdkState {
    next_id: AtomicU64,
    markers_created: AtomicUsize,
    maps_created: AtomicUsize,
    maps_destroyed: AtomicUsize,
    live: Mutex<BTreeMap<u64, FakeMarkerState>>,
    failing_markers: Mutex<HashSet<String>>,
    failing_listeners: Mutex<HashSet<String>>,
    info_windows: Mutex<Vec<(Coordinate, String)>>,
    last_map_options: Mutex<Option<MapOptions>>,
}

/// Records every SDK call; markers are ordered by creation.
#[derive(Clone, Default)]
pub(crate) struct FakeSdk {
    state: Arc<FakeSdkState>,
}

impl std::fmt::Debug for FakeSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeSdk")
            .field("maps_created", &self.state.maps_created.load(Ordering::SeqCst))
            .field("markers_created", &self.state.markers_created.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

pub(crate) struct FakeMap;

pub(crate) struct FakeMarker {
    id: u64,
    title: String,
}

impl FakeSdk {
    pub(crate) fn fail_marker_for(&self, title: &str) {
        self.state
            .failing_markers
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    pub(crate) fn fail_tap_listener_for(&self, title: &str) {
        self.state
            .failing_listeners
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    pub(crate) fn live_marker_titles(&self) -> Vec<String> {
        self.state
            .live
            .lock()
            .unwrap()
            .values()
            .map(|m| m.title.clone())
            .collect()
    }

    pub(crate) fn live_marker_count(&self) -> usize {
        self.state.live.lock().unwrap().len()
    }

    pub(crate) fn markers_created(&self) -> usize {
        self.state.markers_created.load(Ordering::SeqCst)
    }

    pub(crate) fn maps_created(&self) -> usize {
        self.state.maps_created.load(Ordering::SeqCst)
    }

    pub(crate) fn maps_destroyed(&self) -> usize {
        self.state.maps_destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn last_map_options(&self) -> Option<MapOptions> {
        *self.state.last_map_options.lock().unwrap()
    }

    pub(crate) fn info_windows(&self) -> Vec<(Coordinate, String)> {
        self.state.info_windows.lock().unwrap().clone()
    }

    /// Fires the tap handler of the live marker titled `title`.
    pub(crate) fn tap(&self, title: &str) -> bool {
        let handler = self
            .state
            .live
            .lock()
            .unwrap()
            .values()
            .find(|m| m.title == title)
            .and_then(|m| m.handler.clone());
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl MapSdk for FakeSdk {
    type Map = FakeMap;
    type Marker = FakeMarker;

    fn create_map(&self, options: &MapOptions) -> Result<FakeMap, SdkError> {
        self.state.maps_created.fetch_add(1, Ordering::SeqCst);
        *self.state.last_map_options.lock().unwrap() = Some(*options);
        Ok(FakeMap)
    }

    fn create_marker(
        &self,
        _map: &FakeMap,
        options: MarkerOptions<'_>,
    ) -> Result<FakeMarker, SdkError> {
        if self
            .state
            .failing_markers
            .lock()
            .unwrap()
            .contains(options.title)
        {
            return Err(SdkError::Call(format!("cannot place {}", options.title)));
        }

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.markers_created.fetch_add(1, Ordering::SeqCst);
        self.state.live.lock().unwrap().insert(
            id,
            FakeMarkerState {
                title: options.title.to_string(),
                handler: None,
            },
        );
        Ok(FakeMarker {
            id,
            title: options.title.to_string(),
        })
    }

    fn on_marker_tap(&self, marker: &FakeMarker, handler: TapHandler) -> Result<(), SdkError> {
        if self
            .state
            .failing_listeners
            .lock()
            .unwrap()
            .contains(&marker.title)
        {
            return Err(SdkError::Call("addListener threw".to_string()));
        }
        if let Some(live) = self.state.live.lock().unwrap().get_mut(&marker.id) {
            live.handler = Some(handler);
        }
        Ok(())
    }

    fn open_info_window(
        &self,
        _map: &FakeMap,
        position: Coordinate,
        content: &str,
    ) -> Result<(), SdkError> {
        self.state
            .info_windows
            .lock()
            .unwrap()
            .push((position, content.to_string()));
        Ok(())
    }

    fn remove_marker(&self, marker: FakeMarker) {
        self.state.live.lock().unwrap().remove(&marker.id);
    }

    fn destroy_map(&self, _map: FakeMap) {
        self.state.maps_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptBehavior {
    LoadImmediately,
    FailImmediately,
    LoadWithoutSymbol,
    DropCallback,
    /// Holds the callback until [`FakeHost::complete_pending`].
    Manual,
}

/// A page whose global object may or may not carry the map library.
pub(crate) struct FakeHost {
    sdk: FakeSdk,
    library_installed: AtomicBool,
    behavior: Mutex<ScriptBehavior>,
    injected: Mutex<Vec<String>>,
    pending: Mutex<Vec<oneshot::Sender<ScriptEvent>>>,
    injected_notify: Notify,
}

impl FakeHost {
    pub(crate) fn new(behavior: ScriptBehavior) -> Self {
        Self {
            sdk: FakeSdk::default(),
            library_installed: AtomicBool::new(false),
            behavior: Mutex::new(behavior),
            injected: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            injected_notify: Notify::new(),
        }
    }

    pub(crate) fn sdk(&self) -> &FakeSdk {
        &self.sdk
    }

    pub(crate) fn install_library(&self) {
        self.library_installed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_behavior(&self, behavior: ScriptBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn injection_count(&self) -> usize {
        self.injected.lock().unwrap().len()
    }

    pub(crate) fn injected_sources(&self) -> Vec<String> {
        self.injected.lock().unwrap().clone()
    }

    /// Resolves once at least one script has been injected.
    pub(crate) async fn wait_for_injection(&self) {
        loop {
            let notified = self.injected_notify.notified();
            if self.injection_count() > 0 {
                return;
            }
            notified.await;
        }
    }

    /// Fires every held callback with `event`. Returns how many were delivered.
    pub(crate) fn complete_pending(&self, event: ScriptEvent) -> usize {
        if event == ScriptEvent::Loaded {
            self.install_library();
        }
        self.pending
            .lock()
            .unwrap()
            .drain(..)
            .filter(|tx| !tx.is_closed())
            .map(|tx| tx.send(event.clone()).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }
}

impl ScriptHost for FakeHost {
    type Library = FakeSdk;

    fn library(&self) -> Option<FakeSdk> {
        self.library_installed
            .load(Ordering::SeqCst)
            .then(|| self.sdk.clone())
    }

    fn inject_script(&self, src: &str) -> oneshot::Receiver<ScriptEvent> {
        self.injected.lock().unwrap().push(src.to_string());
        self.injected_notify.notify_waiters();

        let (tx, rx) = oneshot::channel();
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            ScriptBehavior::LoadImmediately => {
                self.install_library();
                let _ = tx.send(ScriptEvent::Loaded);
            }
            ScriptBehavior::FailImmediately => {
                let _ = tx.send(ScriptEvent::Failed("net::ERR_BLOCKED_BY_CLIENT".to_string()));
            }
            ScriptBehavior::LoadWithoutSymbol => {
                let _ = tx.send(ScriptEvent::Loaded);
            }
            ScriptBehavior::DropCallback => drop(tx),
            ScriptBehavior::Manual => self.pending.lock().unwrap().push(tx),
        }
        rx
    }
}

#[derive(Debug, Clone)]
pub(crate) enum GeoBehavior {
    Fix(Coordinate),
    Fail(PositionError),
    /// Never answers.
    Silent,
}

/// A geolocation facility that can also be held until the test releases it.
pub(crate) struct FakePositionProvider {
    behavior: GeoBehavior,
    calls: AtomicUsize,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    released_late: Arc<AtomicBool>,
}

impl FakePositionProvider {
    pub(crate) fn new(behavior: GeoBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
            released_late: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Holds the next answer until the returned sender fires.
    pub(crate) fn gated(behavior: GeoBehavior) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let provider = Self::new(behavior);
        *provider.gate.lock().unwrap() = Some(rx);
        (provider, tx)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a gated answer was produced after its caller went away.
    pub(crate) fn answered_late(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released_late)
    }
}

impl PositionProvider for FakePositionProvider {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
            self.released_late.store(true, Ordering::SeqCst);
        }

        match &self.behavior {
            GeoBehavior::Fix(coord) => Ok(Position {
                latitude: coord.latitude,
                longitude: coord.longitude,
                accuracy: Some(10.0),
            }),
            GeoBehavior::Fail(e) => Err(e.clone()),
            GeoBehavior::Silent => std::future::pending().await,
        }
    }
}

/// Serves a fixed list with server-side match-any filtering.
pub(crate) struct FakeStoreSource {
    stores: Vec<Store>,
    fail: AtomicBool,
    calls: AtomicUsize,
    filters: Mutex<Vec<CategoryFilter>>,
}

impl FakeStoreSource {
    pub(crate) fn new(stores: Vec<Store>) -> Self {
        Self {
            stores,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_filters(&self) -> Vec<CategoryFilter> {
        self.filters.lock().unwrap().clone()
    }
}

impl StoreSource for FakeStoreSource {
    async fn list_stores(&self, filter: &CategoryFilter) -> Result<Vec<Store>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().unwrap().push(filter.clone());
        tokio::task::yield_now().await;

        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::UnexpectedStatus {
                status: 500,
                url: "http://fake/stores".to_string(),
                retry_after: None,
            });
        }

        Ok(self
            .stores
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}
