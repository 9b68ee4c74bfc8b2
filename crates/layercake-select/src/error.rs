// SPDX-License-Identifier: Apache-2.0
//! Column selection error taxonomy.

use thiserror::Error;

/// Errors raised while building or querying a [`crate::ColumnSelection`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// An alias was not lower-camel-case.
    #[error("alias {alias:?} is not lower-camel-case")]
    InvalidAlias {
        /// The offending alias.
        alias: String,
    },
    /// Two columns in the same selection declared the same alias.
    #[error("duplicate alias {alias:?}")]
    DuplicateAlias {
        /// The offending alias.
        alias: String,
    },
    /// A route string could not be parsed as a column route.
    #[error("invalid column route {route:?}: {reason}")]
    InvalidRoute {
        /// The offending route text.
        route: String,
        /// Why it was rejected.
        reason: String,
    },
    /// [`crate::ColumnSelection::column_index`] was asked to fail on a
    /// miss and didn't find a match.
    #[error("column not found: {key}")]
    ColumnNotFound {
        /// A display rendering of the lookup key that missed.
        key: String,
    },
}
