// SPDX-License-Identifier: Apache-2.0
//! Peer-to-peer sync over a [`Socket`] transport.
//!
//! A [`Connector`] binds one `Db` table to one route: every local
//! insert on that route is forwarded to peers as a [`ConnectorPayload`]-
//! shaped ref; every inbound ref is deduplicated, checked for sequence
//! gaps (when causal ordering is on), and handed to registered ref
//! listeners. DAG-branch conflicts — two insert-history tips sharing a
//! predecessor set — are surfaced to conflict observers rather than
//! resolved; this store never merges automatically.
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

mod config;
mod connector;
mod dedup;
mod error;
mod socket;

pub use config::SyncConfig;
pub use connector::Connector;
pub use error::SyncError;
pub use layercake_sync_proto::{
    event_names, AckPayload, Conflict, ConflictKind, ConnectorPayload, EventNames, GapFillEntry, GapFillRequest,
    GapFillResponse,
};
pub use socket::{ListenerId, LoopbackSocket, Socket};
