// SPDX-License-Identifier: Apache-2.0
//! Storage gateway contract and in-memory reference implementation.
//!
//! This crate covers C2 of the core design: the typed table storage the
//! core reads and writes through, kept deliberately dumb (no hashing, no
//! route parsing, no content-kind-specific semantics beyond a name) so any
//! backend can implement it.
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
mod gateway;
mod memory;
mod model;

pub use error::StorageError;
pub use gateway::StorageGateway;
pub use memory::MemoryGateway;
pub use model::{
    ColumnCfg, ColumnType, ContentKind, Rljson, Row, TableCfg, TableData, Where,
};
