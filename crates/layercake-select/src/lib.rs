// SPDX-License-Identifier: Apache-2.0
//! Column selection model: the ordered, alias-unique list of columns
//! a join materializes and that filters/sorts/`setValue` address by
//! alias, route, or route hash.
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

mod column;
mod error;
mod selection;

pub use column::Column;
pub use error::SelectError;
pub use selection::{ColumnKey, ColumnSelection};
