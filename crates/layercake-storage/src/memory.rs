// SPDX-License-Identifier: Apache-2.0
//! In-memory [`StorageGateway`] reference implementation.
//!
//! Each table is an ordered `Vec<Row>` plus a `_hash -> index` map, the same
//! dedup-by-hash shape `echo-cas`'s `MemoryTier` uses for blobs, adapted here
//! to typed tables instead of raw byte blobs: writing a row whose hash is
//! already present is a no-op, which is what makes `write()` safe to call
//! repeatedly with overlapping data.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::StorageError;
use crate::gateway::StorageGateway;
use crate::model::{ContentKind, Rljson, Row, TableCfg, TableData, Where};
use layercake_hash::HASH_FIELD;

#[derive(Debug, Clone)]
struct Table {
    cfg: TableCfg,
    rows: Vec<Row>,
    hash_index: BTreeMap<String, usize>,
}

impl Table {
    fn new(cfg: TableCfg) -> Self {
        Self {
            cfg,
            rows: Vec::new(),
            hash_index: BTreeMap::new(),
        }
    }
}

/// An in-memory [`StorageGateway`], suitable for tests and for embedding a
/// full catalog store in a single process.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    tables: BTreeMap<String, Table>,
}

impl MemoryGateway {
    /// An empty gateway with no declared tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> Result<&Table, StorageError> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound {
                table: name.to_owned(),
            })
    }

    fn row_matches(row: &Row, where_: &Where) -> bool {
        where_
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }

    fn dump_one(table: &Table) -> TableData {
        TableData {
            content_kind: table.cfg.content_kind,
            data: table.rows.clone(),
        }
    }
}

impl StorageGateway for MemoryGateway {
    fn create_or_extend_table(&mut self, cfg: TableCfg) -> Result<(), StorageError> {
        match self.tables.get_mut(&cfg.table_name) {
            None => {
                self.tables.insert(cfg.table_name.clone(), Table::new(cfg));
                Ok(())
            }
            Some(existing) if existing.cfg.content_kind == cfg.content_kind => {
                for column in cfg.columns {
                    if !existing.cfg.columns.iter().any(|c| c.name == column.name) {
                        existing.cfg.columns.push(column);
                    }
                }
                Ok(())
            }
            Some(existing) => Err(StorageError::ContentKindMismatch {
                table: cfg.table_name,
                existing: existing.cfg.content_kind,
                requested: cfg.content_kind,
            }),
        }
    }

    fn write(&mut self, data: &Rljson) -> Result<(), StorageError> {
        for (table_name, table_data) in data {
            let table = self
                .tables
                .get_mut(table_name)
                .ok_or_else(|| StorageError::TableNotFound {
                    table: table_name.clone(),
                })?;
            for row in &table_data.data {
                let hash = row.get(HASH_FIELD).and_then(Value::as_str);
                if let Some(hash) = hash {
                    if table.hash_index.contains_key(hash) {
                        continue;
                    }
                    table.hash_index.insert(hash.to_owned(), table.rows.len());
                }
                table.rows.push(row.clone());
            }
        }
        Ok(())
    }

    fn dump(&self) -> Rljson {
        self.tables
            .iter()
            .map(|(name, table)| (name.clone(), Self::dump_one(table)))
            .collect()
    }

    fn dump_table(&self, table: &str) -> Result<Rljson, StorageError> {
        let t = self.table(table)?;
        let mut out = Rljson::new();
        out.insert(table.to_owned(), Self::dump_one(t));
        Ok(out)
    }

    fn read_rows(&self, table: &str, where_: &Where) -> Result<Rljson, StorageError> {
        let t = self.table(table)?;
        let matched: Vec<Row> = t
            .rows
            .iter()
            .filter(|row| Self::row_matches(row, where_))
            .cloned()
            .collect();
        let mut out = Rljson::new();
        out.insert(
            table.to_owned(),
            TableData {
                content_kind: t.cfg.content_kind,
                data: matched,
            },
        );
        Ok(out)
    }

    fn content_type(&self, table: &str) -> Result<ContentKind, StorageError> {
        Ok(self.table(table)?.cfg.content_kind)
    }

    fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn raw_table_cfgs(&self) -> Vec<TableCfg> {
        self.tables.values().map(|t| t.cfg.clone()).collect()
    }
}
