// SPDX-License-Identifier: Apache-2.0
//! Join materialization and column selection processing: reading a
//! cake revision's layered components into a flat table, then filtering,
//! sorting, projecting, and overriding that table before committing any
//! overrides back through [`layercake_core::Db`].
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

mod cell;
mod error;
mod filter;
mod join;
mod setvalue;
mod sort;

pub use cell::{JoinCell, JoinRow, JoinRows};
pub use error::JoinError;
pub use filter::{apply_row_filter, ColumnFilter, FilterOperator, RowFilter, RowFilterOperator};
pub use join::{Join, JoinProcess};
pub use setvalue::{apply_set_value, SetValue};
pub use sort::{RowSort, SortDirection};
