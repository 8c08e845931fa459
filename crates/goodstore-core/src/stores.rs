use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CategoryFilter, CategoryTag, ConfigError, Coordinate, CoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub i64);

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A certified local business.
///
/// Serializes as the flat wire record `{id, name, lat, lon, score, categories}`;
/// deserialization validates the coordinate and score and drops unknown tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoreRecord", into = "StoreRecord")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub location: Coordinate,
    pub score: f64,
    pub categories: BTreeSet<CategoryTag>,
}

/// Wire and catalog-file shape of a [`Store`].
///
/// Tags stay as strings so a record carrying a tag this build does not know
/// still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl StoreRecord {
    /// Tags that are not a known [`CategoryTag`].
    pub fn unknown_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .map(String::as_str)
            .filter(|raw| raw.parse::<CategoryTag>().is_err())
    }
}

impl TryFrom<StoreRecord> for Store {
    type Error = CoreError;

    fn try_from(record: StoreRecord) -> Result<Self, Self::Error> {
        let location = Coordinate::new(record.lat, record.lon)?;
        if !record.score.is_finite() || !(0.0..=5.0).contains(&record.score) {
            return Err(CoreError::ScoreOutOfRange(record.score));
        }
        Ok(Self {
            id: StoreId(record.id),
            name: record.name,
            location,
            score: record.score,
            categories: record
                .categories
                .iter()
                .filter_map(|raw| raw.parse().ok())
                .collect(),
        })
    }
}

impl From<Store> for StoreRecord {
    fn from(store: Store) -> Self {
        Self {
            id: store.id.0,
            name: store.name,
            lat: store.location.latitude,
            lon: store.location.longitude,
            score: store.score,
            categories: store
                .categories
                .into_iter()
                .map(|tag| tag.as_str().to_owned())
                .collect(),
        }
    }
}

/// Immutable, ordered list of stores served by the backend.
#[derive(Debug, Clone, Default)]
pub struct StoreCatalog {
    stores: Vec<Store>,
}

impl StoreCatalog {
    /// Builds a catalog, rejecting duplicate ids, blank names and untagged stores.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first offending store.
    pub fn new(stores: Vec<Store>) -> Result<Self, ConfigError> {
        let mut seen_ids = HashSet::new();

        for store in &stores {
            if store.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "store {} must have a non-empty name",
                    store.id
                )));
            }

            if store.categories.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "store '{}' must hold at least one category",
                    store.name
                )));
            }

            if !seen_ids.insert(store.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate store id: {}",
                    store.id
                )));
            }
        }

        Ok(Self { stores })
    }

    /// The six demo stores around Seoul City Hall.
    #[must_use]
    pub fn seed() -> Self {
        use CategoryTag::{EcoFriendly, GoodPrice, Welfare};

        let entries: [(i64, &str, f64, f64, f64, &[CategoryTag]); 6] = [
            (1, "종이밥", 37.5665, 126.9780, 4.5, &[GoodPrice]),
            (2, "덤브치킨", 37.5668, 126.9785, 4.2, &[EcoFriendly]),
            (3, "신호등찜닭", 37.5662, 126.9775, 4.7, &[Welfare]),
            (4, "맛있닭", 37.5670, 126.9790, 4.3, &[GoodPrice, EcoFriendly]),
            (5, "행컵", 37.5660, 126.9770, 4.6, &[Welfare, EcoFriendly]),
            (6, "착한카페", 37.5672, 126.9788, 4.4, &[GoodPrice, Welfare]),
        ];

        let stores = entries
            .into_iter()
            .map(|(id, name, latitude, longitude, score, tags)| Store {
                id: StoreId(id),
                name: name.to_string(),
                location: Coordinate {
                    latitude,
                    longitude,
                },
                score,
                categories: tags.iter().copied().collect(),
            })
            .collect();

        Self { stores }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    #[must_use]
    pub fn all(&self) -> &[Store] {
        &self.stores
    }

    /// Stores matching `filter`, in catalog order.
    pub fn filtered<'a>(&'a self, filter: &'a CategoryFilter) -> impl Iterator<Item = &'a Store> {
        self.stores.iter().filter(move |s| filter.matches(s))
    }

    #[must_use]
    pub fn get(&self, id: StoreId) -> Option<&Store> {
        self.stores.iter().find(|s| s.id == id)
    }

    /// Case-insensitive substring match on the store name, in catalog order.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Store> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.stores
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct StoresFile {
    stores: Vec<StoreRecord>,
}

/// Load and validate a store catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_store_catalog(path: &Path) -> Result<StoreCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_store_catalog(&content)
}

fn parse_store_catalog(content: &str) -> Result<StoreCatalog, ConfigError> {
    let file: StoresFile = serde_yaml::from_str(content)?;

    let stores = file
        .stores
        .into_iter()
        .map(|record| {
            let id = record.id;
            if let Some(unknown) = record.unknown_categories().next() {
                return Err(ConfigError::Validation(format!(
                    "store {id}: unknown category: {unknown}"
                )));
            }
            Store::try_from(record)
                .map_err(|e| ConfigError::Validation(format!("store {id}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    StoreCatalog::new(stores)
}

#[cfg(test)]
#[path = "stores_test.rs"]
mod tests;
