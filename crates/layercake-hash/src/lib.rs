// SPDX-License-Identifier: Apache-2.0
//! Content hashing, canonical JSON form, and route parsing for `layercake`.
//!
//! This crate covers C1 of the core design: deterministic content hashing
//! over JSON-shaped records (`_hash` fields, `rmhsh`/rehash round-trips) and
//! parsing/composing the route strings that address a record inside the
//! catalog (`/cake/layer/component@ref(sliceId,...)/propertyKey`).
//!
//! # Hash Domain
//!
//! Hashing is content-only: `BLAKE3(canonical_json_bytes)` with no domain
//! prefix. Two records with identical non-hash fields collapse to the same
//! hash and are therefore the same row — deduplication is a feature of the
//! content-addressed model, not a bug.
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

mod error;
mod hash;
mod route;
mod time_id;

pub use error::HashError;
pub use hash::{calc_hash, rmhsh, with_hash, ContentHash, HASH_FIELD};
pub use route::{Route, RouteRef, RouteSegment};
pub use time_id::{compare_time_ids, generate_time_id, is_time_id, split_time_id, time_id_at};
