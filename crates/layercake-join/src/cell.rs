// SPDX-License-Identifier: Apache-2.0
//! A single materialized join cell and the row/table shapes built from it.

use std::collections::BTreeMap;

use serde_json::Value;

/// One column's value for one `SliceId`: the value read from storage,
/// plus an optional override attached by `setValue`. `value` is never
/// mutated in place — overrides always go through `insert`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinCell {
    /// The value resolved from storage at materialization time, or at
    /// the time this cell was last rebuilt by a process. `None` if the
    /// owning `SliceId` isn't covered by the column's layer.
    pub value: Option<Value>,
    /// A `setValue` override, taking precedence over `value` when
    /// present.
    pub insert: Option<Value>,
}

impl JoinCell {
    /// A cell with only a source value.
    #[must_use]
    pub fn from_value(value: Option<Value>) -> Self {
        Self { value, insert: None }
    }

    /// The value this cell presents to queries: `insert ?? value`.
    #[must_use]
    pub fn effective(&self) -> Option<&Value> {
        self.insert.as_ref().or(self.value.as_ref())
    }

    /// How many override paths this cell carries (0 or 1 in this
    /// implementation, since `insert` is a single `Option`). Exposed so
    /// `setValue` can apply its "zero or more than one path is ambiguous"
    /// rule uniformly even though this representation can only ever
    /// report 0 or 1.
    #[must_use]
    pub fn insert_path_count(&self) -> usize {
        usize::from(self.insert.is_some())
    }
}

/// One materialized row: one [`JoinCell`] per column, in column order.
pub type JoinRow = Vec<JoinCell>;

/// All materialized rows, keyed by `SliceId`. A `BTreeMap` so iteration
/// order is deterministic without a separately tracked row order; ordered
/// row listings ([`crate::Join::rows`]) lay this out against an explicit
/// slice-id order instead of relying on map iteration.
pub type JoinRows = BTreeMap<String, JoinRow>;
