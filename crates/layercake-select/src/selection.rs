// SPDX-License-Identifier: Apache-2.0
//! An ordered, alias-unique set of [`Column`]s.

use std::collections::BTreeSet;

use layercake_hash::ContentHash;
use layercake_storage::ColumnType;

use crate::column::Column;
use crate::error::SelectError;

/// A lookup key accepted by [`ColumnSelection::column_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey<'a> {
    /// Match by `alias`.
    Alias(&'a str),
    /// Match by `route`.
    Route(&'a str),
    /// Match by `route_hash()`.
    Hash(ContentHash),
    /// Match by position.
    Index(usize),
}

impl std::fmt::Display for ColumnKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alias(a) => write!(f, "alias {a:?}"),
            Self::Route(r) => write!(f, "route {r:?}"),
            Self::Hash(h) => write!(f, "hash {h}"),
            Self::Index(i) => write!(f, "index {i}"),
        }
    }
}

fn is_lower_camel_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// An ordered list of [`Column`]s with unique, lower-camel-case aliases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSelection {
    columns: Vec<Column>,
}

impl ColumnSelection {
    /// Build a selection from already-constructed columns.
    ///
    /// # Errors
    /// Returns [`SelectError::InvalidAlias`]/[`SelectError::DuplicateAlias`]
    /// if any column's alias is malformed or repeated.
    pub fn new(columns: Vec<Column>) -> Result<Self, SelectError> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !is_lower_camel_case(&column.alias) {
                return Err(SelectError::InvalidAlias {
                    alias: column.alias.clone(),
                });
            }
            if !seen.insert(column.alias.clone()) {
                return Err(SelectError::DuplicateAlias {
                    alias: column.alias.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a selection from bare route strings, deriving an alias from
    /// each route's trailing property key. Duplicate routes are
    /// deduplicated; alias collisions between distinct routes are
    /// resolved by appending a numeric suffix (`brand`, `brand2`, ...).
    ///
    /// # Errors
    /// Returns [`SelectError::InvalidRoute`] if a route has no trailing
    /// path component to derive an alias from.
    pub fn from_routes(routes: &[impl AsRef<str>], column_type: ColumnType) -> Result<Self, SelectError> {
        let mut columns = Vec::new();
        let mut seen_routes = BTreeSet::new();
        let mut used_aliases: std::collections::BTreeMap<String, u32> = std::collections::BTreeMap::new();

        for route in routes {
            let route = route.as_ref();
            if !seen_routes.insert(route.to_owned()) {
                continue;
            }
            let base_alias = route
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SelectError::InvalidRoute {
                    route: route.to_owned(),
                    reason: "route has no trailing component to derive an alias from".to_owned(),
                })?;
            let count = used_aliases.entry(base_alias.to_owned()).or_insert(0);
            *count += 1;
            let alias = if *count == 1 {
                base_alias.to_owned()
            } else {
                format!("{base_alias}{count}")
            };
            columns.push(Column::new(route, alias, column_type));
        }
        Self::new(columns)
    }

    /// The selection's columns, in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// `true` if the selection has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Every column's `route_hash()`, in column order.
    #[must_use]
    pub fn route_hashes(&self) -> Vec<ContentHash> {
        self.columns.iter().map(Column::route_hash).collect()
    }

    /// Resolve `key` to a column index.
    ///
    /// # Errors
    /// Returns [`SelectError::ColumnNotFound`] if `throw_if_not_existing`
    /// and no column matches; otherwise a miss returns `Ok(-1)`.
    pub fn column_index(&self, key: &ColumnKey<'_>, throw_if_not_existing: bool) -> Result<i64, SelectError> {
        let found = if let ColumnKey::Index(i) = key {
            (*i < self.columns.len()).then_some(*i)
        } else {
            self.columns.iter().position(|c| match key {
                ColumnKey::Alias(alias) => c.alias == *alias,
                ColumnKey::Route(route) => c.route == *route,
                ColumnKey::Hash(hash) => c.route_hash() == *hash,
                ColumnKey::Index(_) => unreachable!("handled above"),
            })
        };
        match found {
            Some(i) => Ok(i as i64),
            None if throw_if_not_existing => Err(SelectError::ColumnNotFound {
                key: key.to_string(),
            }),
            None => Ok(-1),
        }
    }

    /// Union several selections by route, keeping the first occurrence's
    /// alias and appending columns not seen before to the end.
    #[must_use]
    pub fn merge(selections: &[Self]) -> Self {
        let mut seen_routes = BTreeSet::new();
        let mut columns = Vec::new();
        for selection in selections {
            for column in &selection.columns {
                if seen_routes.insert(column.route.clone()) {
                    columns.push(column.clone());
                }
            }
        }
        // A merge of already-valid selections cannot reintroduce a
        // duplicate or malformed alias: routes are deduplicated above and
        // each source selection already enforced alias uniqueness on its
        // own columns.
        Self { columns }
    }
}
