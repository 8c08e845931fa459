use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use goodstore_core::{CategoryFilter, Store, StoreId};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StoresQuery {
    /// Comma-separated tags; absent or empty means every store.
    pub categories: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
}

pub(super) async fn list_stores(
    State(state): State<AppState>,
    Query(params): Query<StoresQuery>,
) -> Json<Vec<Store>> {
    let raw = params.categories.as_deref().unwrap_or_default();
    let Some(filter) = CategoryFilter::from_query(raw) else {
        tracing::debug!(categories = %raw, "no known category requested");
        return Json(Vec::new());
    };

    let stores: Vec<Store> = state.catalog.filtered(&filter).cloned().collect();
    tracing::debug!(filter = %filter, count = stores.len(), "listed stores");
    Json(stores)
}

/// A path segment that is not an integer names no store, so it is a 404 too.
pub(super) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<Store>, ApiError> {
    raw_id
        .parse::<i64>()
        .ok()
        .and_then(|id| state.catalog.get(StoreId(id)))
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(req_id.0, "not_found", format!("store {raw_id} not found"))
        })
}

pub(super) async fn search_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Store>>, ApiError> {
    let Some(query) = params.q else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "query parameter q is required",
        ));
    };

    let stores: Vec<Store> = state.catalog.search(&query).into_iter().cloned().collect();
    tracing::debug!(query = %query, count = stores.len(), "searched stores");
    Ok(Json(stores))
}
