// SPDX-License-Identifier: Apache-2.0
//! Error taxonomy for hashing and route parsing.

use thiserror::Error;

/// Errors raised while parsing or validating a [`crate::Route`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// A route string was empty, malformed, or used a `propertyKey` on a
    /// non-terminal segment.
    #[error("invalid route {route:?}: {reason}")]
    InvalidRoute {
        /// The offending flat route text.
        route: String,
        /// Human-readable reason.
        reason: String,
    },
}
