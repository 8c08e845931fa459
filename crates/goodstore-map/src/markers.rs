//! Keeps the pins on a map in step with the active category filter.

use std::collections::HashSet;
use std::sync::Arc;

use goodstore_core::{CategoryFilter, Store, StoreId};

use crate::error::MapError;
use crate::sdk::{MapSdk, MarkerOptions, TapHandler};

/// Invoked with the tapped store's id.
pub type StoreTapCallback = Arc<dyn Fn(StoreId) + Send + Sync>;

/// Outcome of one [`MarkerSetManager::sync`] pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub rendered: usize,
    pub removed: usize,
    pub failures: Vec<MapError>,
}

/// Owns every marker handle of one mounted map view.
pub struct MarkerSetManager<S: MapSdk> {
    sdk: S,
    on_tap: StoreTapCallback,
    markers: Vec<(StoreId, S::Marker)>,
}

impl<S: MapSdk> MarkerSetManager<S> {
    pub fn new(sdk: S, on_tap: StoreTapCallback) -> Self {
        Self {
            sdk,
            on_tap,
            markers: Vec::new(),
        }
    }

    /// Rebuilds the marker set for `filter` over `stores`.
    ///
    /// Every existing marker is removed first, then one marker is created per
    /// matching store in input order. A store whose marker cannot be created
    /// is skipped and reported; the rest still render. Duplicate ids render
    /// once.
    pub fn sync(&mut self, map: &S::Map, filter: &CategoryFilter, stores: &[Store]) -> SyncReport {
        let mut report = SyncReport {
            removed: self.clear(),
            ..SyncReport::default()
        };

        let mut seen = HashSet::new();
        for store in stores.iter().filter(|s| filter.matches(s)) {
            if !seen.insert(store.id) {
                tracing::debug!(store_id = %store.id, "duplicate store in list, skipping");
                continue;
            }

            match self.render(map, store) {
                Ok(marker) => self.markers.push((store.id, marker)),
                Err(e) => {
                    tracing::warn!(store_id = %store.id, error = %e, "marker init failed");
                    report.failures.push(e);
                }
            }
        }

        report.rendered = self.markers.len();
        tracing::debug!(
            filter = %filter,
            rendered = report.rendered,
            removed = report.removed,
            failed = report.failures.len(),
            "marker set synced"
        );
        report
    }

    /// Removes every marker from the map. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.markers.len();
        for (_, marker) in self.markers.drain(..) {
            self.sdk.remove_marker(marker);
        }
        removed
    }

    /// Ids of the live markers in render order.
    pub fn rendered_ids(&self) -> Vec<StoreId> {
        self.markers.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn render(&self, map: &S::Map, store: &Store) -> Result<S::Marker, MapError> {
        let init_failed = |source| MapError::MarkerInitFailed {
            store_id: store.id,
            source,
        };

        let marker = self
            .sdk
            .create_marker(
                map,
                MarkerOptions {
                    position: store.location,
                    title: &store.name,
                },
            )
            .map_err(init_failed)?;

        let on_tap = Arc::clone(&self.on_tap);
        let store_id = store.id;
        let handler: TapHandler = Arc::new(move || on_tap(store_id));

        if let Err(e) = self.sdk.on_marker_tap(&marker, handler) {
            self.sdk.remove_marker(marker);
            return Err(init_failed(e));
        }

        Ok(marker)
    }
}

impl<S: MapSdk> Drop for MarkerSetManager<S> {
    fn drop(&mut self) {
        self.clear();
    }
}
