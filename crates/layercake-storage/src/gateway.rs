// SPDX-License-Identifier: Apache-2.0
//! The storage gateway contract.
//!
//! This trait is the seam between the core and a storage backend. The core
//! only ever calls through it; a production deployment swaps in a durable,
//! remote, or multi-tier implementation without the core changing at all —
//! the storage driver itself is an external collaborator.
//! [`MemoryGateway`](crate::MemoryGateway) is the reference
//! implementation used for tests and embedding.

use crate::error::StorageError;
use crate::model::{ContentKind, Rljson, TableCfg, Where};

/// Typed table CRUD the core depends on.
pub trait StorageGateway {
    /// Declare a table, or extend its declared columns if it already
    /// exists with the same content kind.
    ///
    /// # Errors
    /// Returns [`StorageError::ContentKindMismatch`] if the table already
    /// exists under a different content kind.
    fn create_or_extend_table(&mut self, cfg: TableCfg) -> Result<(), StorageError>;

    /// Write rows into one or more tables. Idempotent by hash: writing a
    /// row whose `_hash` already exists in the table is a no-op. Rows
    /// without a `_hash` field (insert-history rows, keyed by `timeId`
    /// instead) are always appended.
    ///
    /// # Errors
    /// Returns [`StorageError::TableNotFound`] if `data` names a table that
    /// was never declared.
    fn write(&mut self, data: &Rljson) -> Result<(), StorageError>;

    /// Dump every declared table.
    fn dump(&self) -> Rljson;

    /// Dump a single table.
    ///
    /// # Errors
    /// Returns [`StorageError::TableNotFound`] if `table` was never
    /// declared.
    fn dump_table(&self, table: &str) -> Result<Rljson, StorageError>;

    /// Read every row in `table` whose columns equal-match every entry in
    /// `where_`. An empty `where_` matches every row.
    ///
    /// # Errors
    /// Returns [`StorageError::TableNotFound`] if `table` was never
    /// declared.
    fn read_rows(&self, table: &str, where_: &Where) -> Result<Rljson, StorageError>;

    /// The declared content kind of `table`.
    ///
    /// # Errors
    /// Returns [`StorageError::TableNotFound`] if `table` was never
    /// declared.
    fn content_type(&self, table: &str) -> Result<ContentKind, StorageError>;

    /// `true` if `table` has been declared.
    fn table_exists(&self, table: &str) -> bool;

    /// Every declared table's configuration.
    fn raw_table_cfgs(&self) -> Vec<TableCfg>;
}
