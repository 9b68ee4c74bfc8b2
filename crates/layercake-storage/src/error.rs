// SPDX-License-Identifier: Apache-2.0
//! Storage gateway error taxonomy.

use thiserror::Error;

/// Errors a [`crate::StorageGateway`] implementation can raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A table name was not declared via `createOrExtendTable`.
    #[error("table not found: {table}")]
    TableNotFound {
        /// The offending table name.
        table: String,
    },
    /// A `createOrExtendTable` call tried to change a table's content kind.
    #[error("table {table} already exists with content kind {existing:?}, cannot redeclare as {requested:?}")]
    ContentKindMismatch {
        /// The offending table name.
        table: String,
        /// The table's existing content kind.
        existing: crate::model::ContentKind,
        /// The content kind the caller tried to declare.
        requested: crate::model::ContentKind,
    },
}
