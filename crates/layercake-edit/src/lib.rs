// SPDX-License-Identifier: Apache-2.0
//! Replayable multi-edit chains over a cake revision.
//!
//! An [`Edit`] names one operation (`selection`/`filter`/`setValue`/
//! `sort`); a [`MultiEdit`] links edits into a singly-linked list; an
//! [`EditHistoryRow`] anchors a chain link to the cake revision it
//! applies against and to its predecessor chain head, forming a DAG of
//! published revisions. [`EditProcessor`] replays a chain against a
//! [`layercake_join::Join`]; [`MultiEditManager`] owns the current head
//! per cake key and resolves any `EditHistory` hash back into a
//! processor, walking `previous` iteratively rather than recursively so
//! a long chain doesn't grow the call stack.
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

mod edit;
mod edit_history;
mod error;
mod manager;
mod multi_edit;
mod processor;

pub use edit::{rmhsh_row, Edit, EditAction};
pub use edit_history::EditHistoryRow;
pub use error::EditError;
pub use manager::MultiEditManager;
pub use multi_edit::MultiEdit;
pub use processor::{EditProcessor, PublishResult};
