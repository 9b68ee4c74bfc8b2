// SPDX-License-Identifier: Apache-2.0
//! A single selected column.

use layercake_hash::{calc_hash, ContentHash};
use layercake_storage::ColumnType;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// `{ key, route, alias, titleShort, titleLong, type, _hash }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// A stable, caller-assigned identifier independent of alias/route.
    pub key: String,
    /// The flat route text this column draws its value from, e.g.
    /// `/carGeneralLayer/carGeneral/brand`.
    pub route: String,
    /// The lower-camel-case name this column is addressed by in a join's
    /// output (`columnIndex`, filters, sorts, `setValue`).
    pub alias: String,
    /// A short display title.
    pub title_short: String,
    /// A long display title.
    pub title_long: String,
    /// The column's declared value type.
    pub column_type: ColumnType,
}

impl Column {
    /// Build a column, deriving `key`/`alias`/titles from the route's
    /// trailing property key when not given explicitly.
    #[must_use]
    pub fn new(route: impl Into<String>, alias: impl Into<String>, column_type: ColumnType) -> Self {
        let route = route.into();
        let alias = alias.into();
        Self {
            key: alias.clone(),
            title_short: alias.clone(),
            title_long: alias.clone(),
            route,
            alias,
            column_type,
        }
    }

    /// This column's stable index hash: `calcHash(route)`.
    #[must_use]
    pub fn route_hash(&self) -> ContentHash {
        calc_hash(&json!(self.route))
    }
}
