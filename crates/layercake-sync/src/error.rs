// SPDX-License-Identifier: Apache-2.0
//! Sync connector error taxonomy.

use thiserror::Error;

/// Errors raised while sending, receiving, or tearing down a sync
/// connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The underlying catalog core failed.
    #[error(transparent)]
    Core(#[from] layercake_core::CoreError),
    /// A route embedded in a connector payload failed to parse.
    #[error(transparent)]
    InvalidRoute(#[from] layercake_hash::HashError),
    /// `sendWithAck` didn't see a matching `AckPayload` before
    /// `ackTimeoutMs` elapsed.
    #[error("no ack for ref {r} within the configured timeout")]
    AckTimeout {
        /// The ref that was never acknowledged.
        r: String,
    },
    /// A connector payload couldn't be decoded off the wire.
    #[error("malformed sync payload: {reason}")]
    MalformedPayload {
        /// Why decoding failed.
        reason: String,
    },
    /// An operation was attempted on a connector that already tore
    /// down.
    #[error("connector has already torn down")]
    TornDown,
}
