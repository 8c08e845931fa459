//! Where the map view gets its stores from.

use std::future::Future;
use std::time::Duration;

use goodstore_core::{AppConfig, CategoryFilter, Store, StoreId, StoreRecord};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::retry::{with_retries, Backoff};

const USER_AGENT: &str = "goodstore/0.1 (map-client)";
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Store list backing the markers.
pub trait StoreSource: Send + Sync {
    /// Stores holding at least one tag of `filter`, or every store for `All`.
    fn list_stores(
        &self,
        filter: &CategoryFilter,
    ) -> impl Future<Output = Result<Vec<Store>, FetchError>> + Send;
}

/// Client for the store REST API.
///
/// Use [`HttpStoreSource::new`] with the service base URL; a base with a path
/// (for example `https://host/api`) is kept as a prefix.
#[derive(Debug, Clone)]
pub struct HttpStoreSource {
    client: Client,
    base_url: Url,
    max_retries: u32,
}

impl HttpStoreSource {
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidBaseUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`FetchError::Http`] if the `reqwest::Client` cannot be
    /// built.
    pub fn new(base_url: &str, timeout_secs: u64, max_retries: u32) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::InvalidBaseUrl {
            base: base_url.to_owned(),
            reason,
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base URL".to_owned()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            max_retries,
        })
    }

    /// # Errors
    ///
    /// See [`HttpStoreSource::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.api_base,
            config.http_timeout_secs,
            config.http_max_retries,
        )
    }

    /// `GET /stores[?categories=…]`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-2xx status, or a body
    /// that is not a JSON array. Invalid records inside the array are skipped.
    pub async fn fetch_stores(&self, filter: &CategoryFilter) -> Result<Vec<Store>, FetchError> {
        let url = self.stores_url(filter)?;
        self.get_store_list(url, "store list").await
    }

    /// `GET /stores/{id}`; `Ok(None)` when the service answers 404.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, any other non-2xx status,
    /// or an invalid body.
    pub async fn get_store(&self, id: StoreId) -> Result<Option<Store>, FetchError> {
        let url = self.endpoint(&["stores", &id.to_string()])?;
        self.get_json(url, &format!("store {id}")).await
    }

    /// `GET /stores/search?q=…`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-2xx status, or an
    /// invalid body.
    pub async fn search_stores(&self, query: &str) -> Result<Vec<Store>, FetchError> {
        let mut url = self.endpoint(&["stores", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        self.get_store_list(url, "store search").await
    }

    fn stores_url(&self, filter: &CategoryFilter) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["stores"])?;
        if let Some(categories) = filter.query_value() {
            url.query_pairs_mut().append_pair("categories", &categories);
        }
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidBaseUrl {
                base: self.base_url.to_string(),
                reason: "URL cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_store_list(&self, url: Url, context: &str) -> Result<Vec<Store>, FetchError> {
        let records: Option<Vec<serde_json::Value>> = self.get_json(url, context).await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| decode_store(raw, context))
            .collect())
    }

    /// GETs `url` and decodes the body, mapping 404 to `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<Option<T>, FetchError> {
        let backoff = Backoff {
            max_retries: self.max_retries,
            base: BACKOFF_BASE,
        };
        with_retries(backoff, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                if !status.is_success() {
                    return Err(FetchError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                        retry_after: retry_after(response.headers()),
                    });
                }

                let body = response.text().await?;
                let parsed =
                    serde_json::from_str::<T>(&body).map_err(|e| FetchError::Deserialize {
                        context: context.to_owned(),
                        source: e,
                    })?;
                Ok(Some(parsed))
            }
        })
        .await
    }
}

/// `Retry-After` in delay-seconds form; HTTP dates are ignored.
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// One list entry; `None` (logged) when it is not a usable store.
fn decode_store(raw: serde_json::Value, context: &str) -> Option<Store> {
    let record = match serde_json::from_value::<StoreRecord>(raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(context, error = %e, "skipping malformed store record");
            return None;
        }
    };

    let unknown: Vec<&str> = record.unknown_categories().collect();
    if !unknown.is_empty() {
        tracing::debug!(store_id = record.id, ?unknown, "ignoring unknown categories");
    }

    let id = record.id;
    match Store::try_from(record) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(context, store_id = id, error = %e, "skipping invalid store");
            None
        }
    }
}

impl StoreSource for HttpStoreSource {
    async fn list_stores(&self, filter: &CategoryFilter) -> Result<Vec<Store>, FetchError> {
        self.fetch_stores(filter).await
    }
}
