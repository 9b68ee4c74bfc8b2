// SPDX-License-Identifier: Apache-2.0
//! The catalog store core: content model, content-kind controllers,
//! insert-history, observer notification, and the query cache.
//!
//! This crate sits directly on [`layercake_storage`] (the typed table
//! contract) and [`layercake_notify`] (the observer bus); it knows nothing
//! about joins, column selection, or sync — those build on top of it.
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

mod controller;
mod db;
mod error;
mod history;
mod origin;

pub use controller::{controller_for, Controller};
pub use db::{Db, InsertResult, InsertSpec};
pub use error::CoreError;
pub use history::{is_well_formed_time_id, sort_by_time_id, tips, InsertHistoryRow};
pub use origin::{generate_origin, is_valid_origin};
