// SPDX-License-Identifier: Apache-2.0
//! Generic table model: `TableCfg`, `ContentKind`, `Rljson`, rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single stored record. Rows are JSON objects; this core does not
/// validate shape against `TableCfg` (JSON shape validation is an external
/// collaborator's concern).
pub type Row = Map<String, Value>;

/// Equality-match filter passed to `readRows`: column name -> required
/// value.
pub type Where = BTreeMap<String, Value>;

/// The declared content kind of a table, controlling which `Db` controller
/// resolves reads/inserts against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// Immutable hashed component rows.
    Components,
    /// `sliceId -> componentHash` layers.
    Layers,
    /// `layerName -> layerHash` cakes.
    Cakes,
    /// Append-only ordered slice-id sets.
    SliceIds,
    /// Per-table insert-history log.
    InsertHistory,
    /// DAG of multi-edit chain heads anchored to a cake revision.
    EditHistory,
    /// Singly-linked list of edits.
    MultiEdit,
    /// A single replayable edit.
    Edit,
    /// Reserved for a not-yet-specified future content type; recognized so
    /// `contentType()` round-trips for tables declared with it, but no
    /// operation in this core reads or writes `trees` rows.
    Trees,
}

/// A declared column's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    /// UTF-8 string.
    String,
    /// IEEE-754 double.
    Number,
    /// Boolean.
    Boolean,
    /// Arbitrary JSON object.
    Json,
    /// Arbitrary JSON array.
    JsonArray,
    /// Any JSON value (object, array, or scalar).
    JsonValue,
}

/// A declared table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCfg {
    /// Column name.
    pub name: String,
    /// Column value type.
    pub column_type: ColumnType,
}

/// A table's declared schema: its content kind plus typed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCfg {
    /// Table name (lower-camel-case, e.g. `carGeneral`, `carGeneralInsertHistory`).
    pub table_name: String,
    /// What kind of content this table stores.
    pub content_kind: ContentKind,
    /// Declared columns, in declaration order.
    pub columns: Vec<ColumnCfg>,
}

impl TableCfg {
    /// Build a table config with no declared columns beyond the implicit
    /// content-kind-specific ones the core manages.
    #[must_use]
    pub fn new(table_name: impl Into<String>, content_kind: ContentKind) -> Self {
        Self {
            table_name: table_name.into(),
            content_kind,
            columns: Vec::new(),
        }
    }

    /// Builder-style column addition.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnCfg {
            name: name.into(),
            column_type,
        });
        self
    }
}

/// One table's dumped contents: its content kind plus every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// The table's content kind.
    #[serde(rename = "_type")]
    pub content_kind: ContentKind,
    /// The table's rows, in storage order.
    #[serde(rename = "_data")]
    pub data: Vec<Row>,
}

impl TableData {
    /// An empty payload for a table of the given content kind.
    #[must_use]
    pub fn empty(content_kind: ContentKind) -> Self {
        Self {
            content_kind,
            data: Vec::new(),
        }
    }
}

/// The generic dump/read payload shape: `{ [table]: { _type, _data } }`.
pub type Rljson = BTreeMap<String, TableData>;
