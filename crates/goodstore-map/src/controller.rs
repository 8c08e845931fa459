//! Per-mount coordinator of the map view.
//!
//! ```text
//! Uninitialized ─mount─▶ ResolvingLocation ─fix or fallback─▶ LoadingSdk ─ok─▶ Ready
//!                                                                  └──err──▶ Failed
//! ```
//!
//! Each suspension point races the unmount signal. Once unmounted, pending
//! geolocation and SDK futures are dropped so their late answers land nowhere
//! and the state stays where it was.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use goodstore_core::{CategoryFilter, Coordinate, Store, StoreId};
use tokio::sync::watch;

use crate::config::MapConfig;
use crate::error::MapError;
use crate::geolocation::{GeolocationResolver, PositionProvider};
use crate::markers::{MarkerSetManager, StoreTapCallback, SyncReport};
use crate::sdk::{MapOptions, MapSdk, ScriptHost, SdkLoader};
use crate::source::StoreSource;

/// Shown instead of the map when the SDK could not be loaded.
pub const PLACEHOLDER_MESSAGE: &str = "The map is unavailable right now.";

/// Soft notice shown while the store list could not be fetched.
pub const STORE_FETCH_NOTICE: &str = "Stores could not be loaded.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapInitState {
    Uninitialized,
    ResolvingLocation,
    LoadingSdk,
    Ready,
    Failed,
}

impl std::fmt::Display for MapInitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MapInitState::Uninitialized => "uninitialized",
            MapInitState::ResolvingLocation => "resolving_location",
            MapInitState::LoadingSdk => "loading_sdk",
            MapInitState::Ready => "ready",
            MapInitState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Mounted<S: MapSdk> {
    sdk: S,
    map: S::Map,
    markers: MarkerSetManager<S>,
}

struct View<S: MapSdk> {
    mounted: Option<Mounted<S>>,
    /// Filter generation the live markers were built for.
    rendered_generation: Option<u64>,
    stores: Vec<Store>,
}

#[derive(Debug, Default)]
struct Status {
    notice: Option<String>,
    selected: Option<StoreId>,
}

/// Drives one map view from mount to unmount.
///
/// The SDK loader is shared between views; everything else (map handle,
/// markers, filter) belongs to this controller.
pub struct MapViewController<P, H, Src>
where
    P: PositionProvider,
    H: ScriptHost,
    Src: StoreSource,
{
    resolver: GeolocationResolver<P>,
    loader: Arc<SdkLoader<H>>,
    source: Src,
    config: MapConfig,
    on_tap: StoreTapCallback,
    state: watch::Sender<MapInitState>,
    unmounted: watch::Sender<bool>,
    filter: watch::Sender<(u64, CategoryFilter)>,
    view: tokio::sync::Mutex<View<H::Library>>,
    status: Arc<Mutex<Status>>,
}

impl<P, H, Src> MapViewController<P, H, Src>
where
    P: PositionProvider,
    H: ScriptHost,
    Src: StoreSource,
{
    /// `on_tap` receives the id of every tapped marker; the tapped store also
    /// becomes [`selected_store`](Self::selected_store).
    pub fn new(
        resolver: GeolocationResolver<P>,
        loader: Arc<SdkLoader<H>>,
        source: Src,
        config: MapConfig,
        on_tap: StoreTapCallback,
    ) -> Self {
        let status = Arc::new(Mutex::new(Status::default()));
        let tap_status = Arc::clone(&status);
        let on_tap: StoreTapCallback = Arc::new(move |store_id| {
            lock_status(&tap_status).selected = Some(store_id);
            on_tap(store_id);
        });

        Self {
            resolver,
            loader,
            source,
            config,
            on_tap,
            state: watch::Sender::new(MapInitState::Uninitialized),
            unmounted: watch::Sender::new(false),
            filter: watch::Sender::new((0, CategoryFilter::All)),
            view: tokio::sync::Mutex::new(View {
                mounted: None,
                rendered_generation: None,
                stores: Vec::new(),
            }),
            status,
        }
    }

    pub fn resolver(&self) -> &GeolocationResolver<P> {
        &self.resolver
    }

    pub fn loader(&self) -> &Arc<SdkLoader<H>> {
        &self.loader
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn state(&self) -> MapInitState {
        *self.state.borrow()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<MapInitState> {
        self.state.subscribe()
    }

    pub fn active_filter(&self) -> CategoryFilter {
        self.filter.borrow().1.clone()
    }

    /// Message to render instead of the map once the view has failed.
    pub fn placeholder(&self) -> Option<&'static str> {
        (self.state() == MapInitState::Failed).then_some(PLACEHOLDER_MESSAGE)
    }

    /// Inline notice for the last store fetch, if it failed.
    pub fn notice(&self) -> Option<String> {
        lock_status(&self.status).notice.clone()
    }

    /// Store whose marker was tapped or whose info window was opened last.
    pub fn selected_store(&self) -> Option<StoreId> {
        lock_status(&self.status).selected
    }

    pub async fn rendered_store_ids(&self) -> Vec<StoreId> {
        let view = self.view.lock().await;
        view.mounted
            .as_ref()
            .map_or_else(Vec::new, |m| m.markers.rendered_ids())
    }

    /// Runs the mount sequence and returns the state it settled in.
    ///
    /// Never fails: location errors fall back to the configured center and
    /// SDK errors end in [`MapInitState::Failed`]. Calling it again after the
    /// first mount is a no-op.
    pub async fn mount(&self) -> MapInitState {
        if !self.claim_mount() {
            tracing::debug!(state = %self.state(), "mount ignored");
            return self.state();
        }

        let resolved = tokio::select! {
            biased;
            () = self.until_unmounted() => return self.abandon_mount(),
            r = self.resolver.resolve(self.config.geo_timeout, self.config.geo_max_age) => r,
        };
        let center = match resolved {
            Ok(center) => center,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = %self.config.fallback_center,
                    "using fallback map center"
                );
                self.config.fallback_center
            }
        };

        self.set_state(MapInitState::LoadingSdk);
        let loaded = tokio::select! {
            biased;
            () = self.until_unmounted() => return self.abandon_mount(),
            r = self.loader.ensure_loaded() => r,
        };
        let sdk = match loaded {
            Ok(sdk) => sdk,
            Err(e) => {
                tracing::warn!(error = %MapError::from(e), "map view failed");
                self.set_state(MapInitState::Failed);
                return MapInitState::Failed;
            }
        };

        if !self.construct_map(sdk, center).await {
            return self.state();
        }

        if let Err(e) = self.refresh_markers().await {
            tracing::debug!(error = %e, "initial marker sync skipped");
        }
        self.state()
    }

    /// Makes `filter` active and re-syncs the markers on the existing map.
    ///
    /// Before the view is ready the filter is only recorded and used by the
    /// first sync; the call then returns [`MapError::NotReady`].
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] when no map is mounted.
    pub async fn set_category(&self, filter: CategoryFilter) -> Result<SyncReport, MapError> {
        tracing::debug!(filter = %filter, "category changed");
        self.filter.send_modify(|(generation, current)| {
            *generation += 1;
            *current = filter;
        });

        if self.state() != MapInitState::Ready {
            return Err(MapError::NotReady);
        }
        self.refresh_markers().await
    }

    /// Fetches stores for the active filter and rebuilds the markers.
    ///
    /// Syncs are serialized. A sync that finds the markers already built for
    /// the latest filter returns without fetching, and a fetch overtaken by a
    /// newer filter is redone for that filter, so bursts of filter changes
    /// render only the last one. A failed fetch renders zero markers and sets
    /// [`notice`](Self::notice).
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] when no map is mounted or the view is
    /// unmounted mid-sync.
    pub async fn refresh_markers(&self) -> Result<SyncReport, MapError> {
        let mut view = self.view.lock().await;
        loop {
            if self.is_unmounted() || view.mounted.is_none() {
                return Err(MapError::NotReady);
            }

            let (generation, filter) = self.filter.borrow().clone();
            if view.rendered_generation == Some(generation) {
                tracing::debug!(generation, "markers already current");
                let rendered = view.mounted.as_ref().map_or(0, |m| m.markers.len());
                return Ok(SyncReport {
                    rendered,
                    ..SyncReport::default()
                });
            }

            let fetched = tokio::select! {
                biased;
                () = self.until_unmounted() => return Err(MapError::NotReady),
                r = self.source.list_stores(&filter) => r,
            };

            if self.filter.borrow().0 != generation {
                tracing::debug!(generation, "filter changed during fetch, refetching");
                continue;
            }

            let stores = match fetched {
                Ok(stores) => {
                    lock_status(&self.status).notice = None;
                    stores
                }
                Err(e) => {
                    tracing::warn!(
                        filter = %filter,
                        error = %MapError::from(e),
                        "rendering no markers"
                    );
                    lock_status(&self.status).notice = Some(STORE_FETCH_NOTICE.to_owned());
                    Vec::new()
                }
            };

            let View {
                mounted,
                rendered_generation,
                stores: shown,
            } = &mut *view;
            let Some(Mounted { map, markers, .. }) = mounted.as_mut() else {
                return Err(MapError::NotReady);
            };

            let report = markers.sync(map, &filter, &stores);
            *shown = stores;
            *rendered_generation = Some(generation);
            return Ok(report);
        }
    }

    /// Opens the info window of a rendered store and selects it.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] without a map,
    /// [`MapError::UnknownStore`] if the store has no live marker, and
    /// [`MapError::InfoWindowFailed`] if the SDK call throws.
    pub async fn open_info_window(&self, store_id: StoreId) -> Result<(), MapError> {
        let view = self.view.lock().await;
        let Some(mounted) = view.mounted.as_ref() else {
            return Err(MapError::NotReady);
        };
        if !mounted.markers.rendered_ids().contains(&store_id) {
            return Err(MapError::UnknownStore(store_id));
        }
        let store = view
            .stores
            .iter()
            .find(|s| s.id == store_id)
            .ok_or(MapError::UnknownStore(store_id))?;

        mounted
            .sdk
            .open_info_window(&mounted.map, store.location, &store.name)
            .map_err(|source| MapError::InfoWindowFailed { store_id, source })?;

        lock_status(&self.status).selected = Some(store_id);
        Ok(())
    }

    /// Tears the view down from whatever state it is in.
    ///
    /// Pending mount steps and syncs are cancelled, the markers are removed
    /// and the map is destroyed if it was constructed. The init state is left
    /// as it was.
    pub async fn unmount(&self) {
        self.unmounted.send_replace(true);

        let mut view = self.view.lock().await;
        view.rendered_generation = None;
        view.stores.clear();
        if let Some(Mounted {
            sdk,
            map,
            mut markers,
        }) = view.mounted.take()
        {
            let removed = markers.clear();
            drop(markers);
            sdk.destroy_map(map);
            tracing::info!(removed, "map view unmounted");
        } else {
            tracing::debug!(state = %self.state(), "unmounted before the map was built");
        }
    }

    /// Returns `false` if the view ended up without a map.
    async fn construct_map(&self, sdk: H::Library, center: Coordinate) -> bool {
        let mut view = self.view.lock().await;
        if self.is_unmounted() {
            self.abandon_mount();
            return false;
        }

        let options = MapOptions {
            center,
            zoom: self.config.zoom,
        };
        let map = match sdk.create_map(&options) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "map construction failed");
                self.set_state(MapInitState::Failed);
                return false;
            }
        };

        let markers = MarkerSetManager::new(sdk.clone(), Arc::clone(&self.on_tap));
        view.mounted = Some(Mounted { sdk, map, markers });
        self.set_state(MapInitState::Ready);
        true
    }

    /// Moves `Uninitialized` to `ResolvingLocation` in one step; only the
    /// caller that wins runs the mount sequence.
    fn claim_mount(&self) -> bool {
        if self.is_unmounted() {
            return false;
        }
        let claimed = self.state.send_if_modified(|state| {
            if *state == MapInitState::Uninitialized {
                *state = MapInitState::ResolvingLocation;
                true
            } else {
                false
            }
        });
        if claimed {
            tracing::debug!(
                from = %MapInitState::Uninitialized,
                to = %MapInitState::ResolvingLocation,
                "map view state"
            );
        }
        claimed
    }

    fn abandon_mount(&self) -> MapInitState {
        tracing::debug!(state = %self.state(), "unmounted during mount");
        self.state()
    }

    fn set_state(&self, next: MapInitState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "map view state");
    }

    fn is_unmounted(&self) -> bool {
        *self.unmounted.borrow()
    }

    async fn until_unmounted(&self) {
        let mut rx = self.unmounted.subscribe();
        // The sender lives as long as `self`, so this only returns on unmount.
        let _ = rx.wait_for(|gone| *gone).await;
    }
}

fn lock_status(status: &Mutex<Status>) -> MutexGuard<'_, Status> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
