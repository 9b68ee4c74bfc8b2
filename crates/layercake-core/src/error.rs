// SPDX-License-Identifier: Apache-2.0
//! Db core error taxonomy.

use layercake_hash::HashError;
use layercake_storage::StorageError;
use thiserror::Error;

/// Errors raised by [`crate::Db`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A route string failed to parse.
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] HashError),
    /// A storage gateway call failed or named an undeclared table.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A route segment's ref (hash or `timeId`) did not resolve to any row.
    #[error("ref not found: route {route:?}, ref {reference:?}")]
    RefNotFound {
        /// The route being resolved.
        route: String,
        /// The unresolved ref text.
        reference: String,
    },
    /// An insert targeted a content kind this core does not know how to
    /// write (currently only `trees`, which is reserved and unused).
    #[error("unsupported content kind: {kind:?}")]
    UnsupportedKind {
        /// The offending content kind, rendered for display.
        kind: String,
    },
    /// A nested insert value was missing the field its route segment
    /// expected (`insertSpec.value` must nest a field named after the
    /// next segment's table key).
    #[error("insert value for route {route:?} is missing nested field {field:?}")]
    MissingChildValue {
        /// The route being inserted.
        route: String,
        /// The expected nested field name.
        field: String,
    },
    /// An insert's top-level value, or a nested child value, was not a
    /// JSON object.
    #[error("insert value for route {route:?} must be a JSON object")]
    InsertValueNotAnObject {
        /// The route being inserted.
        route: String,
    },
}
