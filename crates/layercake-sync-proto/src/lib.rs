// SPDX-License-Identifier: Apache-2.0
//! Wire payloads for the peer-to-peer sync protocol.
//!
//! Every payload is a plain JSON object. Optional fields use
//! `#[serde(skip_serializing_if = "Option::is_none")]` so an absent field is
//! omitted from the wire form rather than emitted as `null` — dedup and
//! hash calculations elsewhere in this system depend on an object's
//! canonical form, and a stray `null` would change it.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use serde::{Deserialize, Serialize};

/// The payload broadcast on a ref event: `{ o, r, c?, t?, seq?, p? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorPayload {
    /// The sender's stable origin token.
    pub o: String,
    /// The resource hash being advertised.
    pub r: String,
    /// The sender's client id, present only when `includeClientIdentity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    /// A send-time timestamp in epoch millis, present only when
    /// `includeClientIdentity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<i64>,
    /// Monotonically increasing per-sender sequence number, present only
    /// when `causalOrdering`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Predecessor `timeId`s from the insert-history row, present only
    /// when `causalOrdering` and the row has predecessors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<Vec<String>>,
}

impl ConnectorPayload {
    /// A bare payload with no causal-ordering or identity fields attached.
    #[must_use]
    pub fn new(origin: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            o: origin.into(),
            r: reference.into(),
            c: None,
            t: None,
            seq: None,
            p: None,
        }
    }
}

/// `{ r, ok, receivedBy?, totalClients? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    /// The ref being acknowledged.
    pub r: String,
    /// Whether the ack represents a success.
    pub ok: bool,
    /// How many peers have received the ref so far, if tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by: Option<u32>,
    /// The total number of clients expected to ack, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_clients: Option<u32>,
}

/// `{ route, afterSeq }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapFillRequest {
    /// The flat route the gap was observed on.
    pub route: String,
    /// The last sequence number the requester has contiguous coverage of.
    pub after_seq: u64,
    /// The client id whose sequence has a gap, if identity is tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// One entry in a [`GapFillResponse`]: `{ o, r, seq }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapFillEntry {
    /// The original sender's origin token.
    pub o: String,
    /// The resource hash.
    pub r: String,
    /// The sequence number this ref was originally sent at.
    pub seq: u64,
}

/// `{ route, refs }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapFillResponse {
    /// The flat route the gap-fill covers.
    pub route: String,
    /// The missed refs, in original send order.
    pub refs: Vec<GapFillEntry>,
}

/// `{ type:'dagBranch', table, branches, detectedAt }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// The conflict kind. Always `"dagBranch"` — the only kind this
    /// protocol version detects.
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    /// The table the conflicting insert-history rows belong to.
    pub table: String,
    /// The `timeId`s of the tips that share a `previous` set.
    pub branches: Vec<String>,
    /// When the conflict was detected, epoch millis.
    pub detected_at: i64,
}

/// The kind of conflict a [`Conflict`] payload reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
    /// Two or more insert-history tips share an identical `previous` set.
    DagBranch,
}

/// The event names a connector derives from a route's flat text. Kept here,
/// next to the payloads, since both crates that use a route-derived event
/// name (sync and any test harness) need the same derivation.
#[must_use]
pub fn event_names(route_flat: &str) -> EventNames {
    EventNames {
        data: route_flat.to_owned(),
        ack: format!("{route_flat}:ack"),
        ack_client: format!("{route_flat}:ack:client"),
        gapfill_req: format!("{route_flat}:gapfill:req"),
        gapfill_res: format!("{route_flat}:gapfill:res"),
        bootstrap: format!("{route_flat}:bootstrap"),
    }
}

/// The six event names a route derives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    /// `<route>`.
    pub data: String,
    /// `<route>:ack`.
    pub ack: String,
    /// `<route>:ack:client`.
    pub ack_client: String,
    /// `<route>:gapfill:req`.
    pub gapfill_req: String,
    /// `<route>:gapfill:res`.
    pub gapfill_res: String,
    /// `<route>:bootstrap`.
    pub bootstrap: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn connector_payload_omits_absent_optionals() {
        let payload = ConnectorPayload::new("client_abc", "deadbeef");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("\"seq\""));
        assert!(!json.contains("\"c\""));
        assert!(!json.contains("\"p\""));
    }

    #[test]
    fn connector_payload_round_trips_with_causal_fields() {
        let mut payload = ConnectorPayload::new("client_abc", "deadbeef");
        payload.seq = Some(3);
        payload.p = Some(vec!["1700000000000:Ab3Z".to_owned()]);
        let json = serde_json::to_string(&payload).unwrap();
        let back: ConnectorPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn event_names_derive_from_route() {
        let names = event_names("/carCake");
        assert_eq!(names.ack, "/carCake:ack");
        assert_eq!(names.gapfill_req, "/carCake:gapfill:req");
        assert_eq!(names.bootstrap, "/carCake:bootstrap");
    }

    #[test]
    fn conflict_serializes_type_as_dag_branch() {
        let conflict = Conflict {
            kind: ConflictKind::DagBranch,
            table: "sharedTree".to_owned(),
            branches: vec!["B".to_owned(), "C".to_owned()],
            detected_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["type"], "dagBranch");
    }
}
