// SPDX-License-Identifier: Apache-2.0
//! Multi-edit chain error taxonomy.

use layercake_core::CoreError;
use layercake_join::JoinError;
use layercake_select::SelectError;
use layercake_storage::StorageError;
use thiserror::Error;

/// Errors raised while building, replaying, or publishing a multi-edit
/// chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The underlying storage gateway failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The Db core failed (surfaced by publishing a chain).
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The join engine failed while replaying or publishing an edit.
    #[error(transparent)]
    Join(#[from] JoinError),
    /// A column selection failed to build while decoding a `selection`
    /// edit.
    #[error(transparent)]
    Select(#[from] SelectError),
    /// A route embedded in an edit failed to parse.
    #[error(transparent)]
    InvalidRoute(#[from] layercake_hash::HashError),
    /// An edit's first entry was not a `selection`, so no join could be
    /// opened to apply the rest of the chain against.
    #[error("the first edit in a chain must be a selection")]
    ChainMustOpenWithSelection,
    /// An edit's JSON action payload carried an unrecognized `type`, or a
    /// `data` shape that didn't match its declared `type`.
    #[error("malformed edit action: {reason}")]
    MalformedAction {
        /// Why the action payload was rejected.
        reason: String,
    },
    /// `MultiEditManager::edit` was called with a `cakeRef` when a head
    /// already exists, or without one when there is no head yet.
    #[error("{0}")]
    CakeRefRequirement(&'static str),
    /// An `editHistoryRef` lookup named a hash with no matching
    /// `EditHistory` row.
    #[error("edit history not found: {hash}")]
    EditHistoryNotFound {
        /// The hex hash that failed to resolve.
        hash: String,
    },
    /// An `editHistoryRef` lookup's predecessor chain did not resolve
    /// unambiguously (more rows than expected matched a hash).
    #[error("ambiguous edit history for hash {hash}")]
    AmbiguousEditHistory {
        /// The hex hash whose lookup was ambiguous.
        hash: String,
    },
    /// An `EditHistory` row names more than one predecessor — a DAG
    /// merge — which this core detects but refuses to resolve
    /// automatically.
    #[error("merge of {count} edit-history predecessors is not supported")]
    MergeNotSupported {
        /// How many predecessors the merge row named.
        count: usize,
    },
    /// A `MultiEdit` row named a hash with no matching row.
    #[error("multi-edit not found: {hash}")]
    MultiEditNotFound {
        /// The hex hash that failed to resolve.
        hash: String,
    },
    /// A `MultiEdit` link named an `Edit` hash with no matching row.
    #[error("edit not found: {hash}")]
    EditNotFound {
        /// The hex hash that failed to resolve.
        hash: String,
    },
}
