// SPDX-License-Identifier: Apache-2.0
//! Per-connector sync tuning.

/// Tuning knobs for a [`crate::Connector`]. Every field defaults to the
/// conservative, opt-in behavior: causal ordering and
/// acks are off until a caller asks for them, dedup memory is bounded
/// at 10000 refs per generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Attach a `seq` and causal-predecessor `p` list to outgoing
    /// payloads, and track per-sender sequence gaps on the way in.
    pub causal_ordering: bool,
    /// Require peers to emit an `AckPayload` before `sendWithAck`
    /// resolves.
    pub require_ack: bool,
    /// How long `sendWithAck` waits for a matching ack before failing
    /// with [`crate::SyncError::AckTimeout`].
    pub ack_timeout_ms: u64,
    /// Attach this connector's opaque client-identity token (`c`) to
    /// outgoing payloads. Required for gap-fill requests to be
    /// addressable back to the sender whose stream had a gap.
    pub include_client_identity: bool,
    /// How many refs each dedup generation holds before rotating.
    pub max_dedup_set_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            causal_ordering: false,
            require_ack: false,
            ack_timeout_ms: 10_000,
            include_client_identity: false,
            max_dedup_set_size: 10_000,
        }
    }
}
