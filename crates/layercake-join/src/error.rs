// SPDX-License-Identifier: Apache-2.0
//! Join engine error taxonomy.

use layercake_core::CoreError;
use layercake_select::SelectError;
use layercake_storage::StorageError;
use thiserror::Error;

/// Errors raised while materializing or operating on a join.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The underlying storage gateway failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The Db core failed (surfaced by `Join::insert`).
    #[error(transparent)]
    Core(#[from] CoreError),
    /// A column route failed to parse or resolve.
    #[error(transparent)]
    Select(#[from] SelectError),
    /// A column route failed to parse.
    #[error(transparent)]
    InvalidRoute(#[from] layercake_hash::HashError),
    /// `cakeRef` did not resolve to a cake row.
    #[error("cake not found: table {table:?}, ref {cake_ref:?}")]
    CakeNotFound {
        /// The cake table name.
        table: String,
        /// The hex hash that failed to resolve.
        cake_ref: String,
    },
    /// A column's route named a layer the cake does not reference.
    #[error("layer {layer:?} is not referenced by this cake")]
    LayerNotInCake {
        /// The offending layer table name.
        layer: String,
    },
    /// A filter referenced a route not present in the join's selection.
    #[error("filter route not in join: {route:?}")]
    FilterRouteNotInJoin {
        /// The offending route text.
        route: String,
    },
    /// A `setValue` targeted a cell that carries zero or more than one
    /// override path.
    #[error("setValue is ambiguous for route {route:?}: {reason}")]
    SetValueAmbiguous {
        /// The `setValue`'s target route.
        route: String,
        /// Why the target was ambiguous.
        reason: String,
    },
    /// `cakeRoute()` was asked for a route that isn't unique (never
    /// actually reachable in this implementation, since a `Join` always
    /// materializes over exactly one cake revision — kept for parity
    /// with the source API).
    #[error("cake route is not unique")]
    AmbiguousCakeRoute,
}
