use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Store};

/// Social-impact certification a store may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryTag {
    GoodPrice,
    EcoFriendly,
    Welfare,
}

impl CategoryTag {
    pub const ALL: [CategoryTag; 3] = [
        CategoryTag::GoodPrice,
        CategoryTag::EcoFriendly,
        CategoryTag::Welfare,
    ];

    /// Wire name used by the REST API and query strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryTag::GoodPrice => "good-price",
            CategoryTag::EcoFriendly => "eco-friendly",
            CategoryTag::Welfare => "welfare",
        }
    }

    /// Display label shown on category chips.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CategoryTag::GoodPrice => "착한 가격",
            CategoryTag::EcoFriendly => "친환경",
            CategoryTag::Welfare => "복지 실천",
        }
    }
}

impl std::fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryTag {
    type Err = CoreError;

    /// Accepts the wire name or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == trimmed || tag.label() == trimmed)
            .ok_or_else(|| CoreError::UnknownCategory(trimmed.to_string()))
    }
}

/// The active category filter on the map.
///
/// `Any` matches a store holding at least one of the listed tags. It is never
/// constructed empty; an empty selection collapses to `All`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Any(BTreeSet<CategoryTag>),
}

impl CategoryFilter {
    #[must_use]
    pub fn only(tag: CategoryTag) -> Self {
        Self::Any(BTreeSet::from([tag]))
    }

    /// Builds a filter from a set of tags; an empty set means `All`.
    #[must_use]
    pub fn from_tags(tags: impl IntoIterator<Item = CategoryTag>) -> Self {
        let tags: BTreeSet<_> = tags.into_iter().collect();
        if tags.is_empty() {
            Self::All
        } else {
            Self::Any(tags)
        }
    }

    #[must_use]
    pub fn matches(&self, store: &Store) -> bool {
        match self {
            Self::All => true,
            Self::Any(tags) => !store.categories.is_disjoint(tags),
        }
    }

    /// Comma-separated tag list for a `categories=` query parameter.
    ///
    /// `None` for `All`, which is expressed by omitting the parameter.
    #[must_use]
    pub fn query_value(&self) -> Option<String> {
        match self {
            Self::All => None,
            Self::Any(tags) => Some(
                tags.iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

impl CategoryFilter {
    /// Parses a `categories=` query value, dropping tags it does not know.
    ///
    /// `None` when tags were given but none of them is known; such a query
    /// matches no store rather than every store.
    #[must_use]
    pub fn from_query(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }

        let parts: Vec<&str> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            return Some(Self::All);
        }

        let tags: BTreeSet<CategoryTag> =
            parts.into_iter().filter_map(|part| part.parse().ok()).collect();
        if tags.is_empty() {
            None
        } else {
            Some(Self::Any(tags))
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.query_value() {
            Some(value) => f.write_str(&value),
            None => f.write_str("all"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CoreError;

    /// Parses `all`, an empty string, or a comma-separated tag list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let tags = trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(CategoryTag::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self::from_tags(tags))
    }
}
