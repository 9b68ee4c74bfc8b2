// SPDX-License-Identifier: Apache-2.0
//! Insert-history rows and the `<table>InsertHistory` naming/shape
//! convention.

use layercake_hash::{compare_time_ids, split_time_id};
use layercake_storage::Row;
use serde_json::{json, Value};

/// One row of a `<table>InsertHistory` table: `{ timeId, <table>Ref,
/// route, previous?, origin?, acknowledged? }`.
///
/// The `<table>Ref` field name is only known at runtime (it's the table
/// name plus `"Ref"`), so this type is hand-serialized via [`Self::to_row`]
/// / [`Self::from_row`] rather than `#[derive(Serialize, Deserialize)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertHistoryRow {
    /// This row's monotonically-increasing-per-writer identifier.
    pub time_id: String,
    /// The base table name this row records an insert into, e.g.
    /// `carGeneral`. Stored on the wire as `"<table>Ref"`.
    pub table: String,
    /// The hash of the inserted row, rendered as hex.
    pub hash_hex: String,
    /// The flat route text the insert was addressed to.
    pub route: String,
    /// `timeId`s this row supersedes; empty/absent means a root insert.
    pub previous: Option<Vec<String>>,
    /// The writer's origin token, when known.
    pub origin: Option<String>,
    /// Whether this row has been acknowledged by its sync peers.
    pub acknowledged: Option<bool>,
}

impl InsertHistoryRow {
    /// The `<table>InsertHistory` table name for `table`.
    #[must_use]
    pub fn history_table_name(table: &str) -> String {
        format!("{table}InsertHistory")
    }

    /// The `"<table>Ref"` field name this row's hash is stored under.
    #[must_use]
    pub fn ref_field_name(&self) -> String {
        format!("{}Ref", self.table)
    }

    /// Convert to the generic [`Row`] shape storage expects. Optional
    /// fields absent rather than emitted as JSON `null`, so hashing and
    /// dedup over history rows stay well-defined.
    #[must_use]
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("timeId".to_owned(), json!(self.time_id));
        row.insert(self.ref_field_name(), json!(self.hash_hex));
        row.insert("route".to_owned(), json!(self.route));
        if let Some(previous) = &self.previous {
            row.insert("previous".to_owned(), json!(previous));
        }
        if let Some(origin) = &self.origin {
            row.insert("origin".to_owned(), json!(origin));
        }
        if let Some(acknowledged) = self.acknowledged {
            row.insert("acknowledged".to_owned(), json!(acknowledged));
        }
        row
    }

    /// Parse back from a generic [`Row`] plus the table name this history
    /// entry belongs to (the `<table>Ref` key is the only place the table
    /// name is recoverable from, and it's cheaper for the caller to pass
    /// it than to search every key for a `Ref` suffix).
    #[must_use]
    pub fn from_row(table: &str, row: &Row) -> Option<Self> {
        let time_id = row.get("timeId")?.as_str()?.to_owned();
        let hash_hex = row.get(&format!("{table}Ref"))?.as_str()?.to_owned();
        let route = row.get("route")?.as_str()?.to_owned();
        let previous = row.get("previous").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        });
        let origin = row
            .get("origin")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let acknowledged = row.get("acknowledged").and_then(Value::as_bool);
        Some(Self {
            time_id,
            table: table.to_owned(),
            hash_hex,
            route,
            previous,
            origin,
            acknowledged,
        })
    }
}

/// Sort a set of history rows by the numeric prefix of `timeId`, not the
/// string's lexicographic order.
pub fn sort_by_time_id(rows: &mut [InsertHistoryRow], ascending: bool) {
    rows.sort_by(|a, b| {
        let ord = compare_time_ids(&a.time_id, &b.time_id);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

/// The rows in `rows` that are not listed in any other row's `previous` —
/// the DAG "tips".
#[must_use]
pub fn tips(rows: &[InsertHistoryRow]) -> Vec<&InsertHistoryRow> {
    let superseded: std::collections::BTreeSet<&str> = rows
        .iter()
        .filter_map(|r| r.previous.as_ref())
        .flat_map(|p| p.iter().map(String::as_str))
        .collect();
    rows.iter()
        .filter(|r| !superseded.contains(r.time_id.as_str()))
        .collect()
}

/// `true` if `split_time_id` recognizes `s`; exposed here so callers don't
/// need a separate `layercake-hash` import just to validate a `timeId`
/// before a history lookup.
#[must_use]
pub fn is_well_formed_time_id(s: &str) -> bool {
    split_time_id(s).is_some()
}
