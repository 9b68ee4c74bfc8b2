// SPDX-License-Identifier: Apache-2.0
//! Owns the chain head per cake key, persisting every edit as an
//! `Edit`/`MultiEdit`/`EditHistory` triple and resolving incoming
//! `editHistoryRef`s into a replayed [`EditProcessor`].

use std::collections::BTreeMap;
use std::rc::Rc;

use layercake_core::{Db, InsertSpec};
use layercake_hash::{generate_time_id, ContentHash, Route, HASH_FIELD};
use layercake_storage::{ContentKind, Row, StorageGateway, TableCfg, Where};
use serde_json::{json, Value};

use crate::edit::Edit;
use crate::edit_history::EditHistoryRow;
use crate::error::EditError;
use crate::multi_edit::MultiEdit;
use crate::processor::EditProcessor;

#[derive(Clone)]
struct ManagedChain<G: StorageGateway> {
    processor: EditProcessor<G>,
    multi_edit_ref: ContentHash,
}

/// The replayable chain-head registry for one cake key.
///
/// Every successful [`Self::edit`] call appends one `Edit`, one
/// `MultiEdit` link, and one `EditHistory` row, then promotes that
/// `EditHistory` row's hash to the new head. [`Self::edit_history_ref`]
/// rebuilds (and caches) the processor for any `EditHistory` hash the
/// manager hasn't seen yet, walking its `previous` chain iteratively
/// rather than recursively so an arbitrarily long chain doesn't grow the
/// call stack.
pub struct MultiEditManager<G: StorageGateway> {
    db: Rc<Db<G>>,
    cake_key: String,
    processors: std::cell::RefCell<BTreeMap<ContentHash, ManagedChain<G>>>,
    head: std::cell::RefCell<Option<ContentHash>>,
    head_listeners: std::cell::RefCell<Vec<Box<dyn FnMut(ContentHash)>>>,
}

impl<G: StorageGateway + 'static> MultiEditManager<G> {
    /// Build a manager over `cake_key`'s chain, with no head yet.
    #[must_use]
    pub fn new(db: Rc<Db<G>>, cake_key: impl Into<String>) -> Self {
        Self {
            db,
            cake_key: cake_key.into(),
            processors: std::cell::RefCell::new(BTreeMap::new()),
            head: std::cell::RefCell::new(None),
            head_listeners: std::cell::RefCell::new(Vec::new()),
        }
    }

    fn edit_table(&self) -> String {
        format!("{}Edit", self.cake_key)
    }

    fn multi_edit_table(&self) -> String {
        format!("{}MultiEdit", self.cake_key)
    }

    fn history_table(&self) -> String {
        format!("{}EditHistory", self.cake_key)
    }

    /// Declare the `<cakeKey>Edit`/`MultiEdit`/`EditHistory` tables and
    /// register an observer on `<cakeKey>EditHistory`: incoming
    /// insert-history notifications on that route (this manager's own
    /// writes, or a sync peer replaying into the same `Db`) trigger
    /// [`Self::edit_history_ref`].
    ///
    /// # Errors
    /// Returns a propagated [`layercake_storage::StorageError`] if a
    /// table is already declared under a different content kind.
    pub fn init(this: &Rc<Self>) -> Result<(), EditError> {
        {
            let storage = this.db.storage();
            let mut storage = storage.borrow_mut();
            storage.create_or_extend_table(TableCfg::new(this.edit_table(), ContentKind::Edit))?;
            storage.create_or_extend_table(TableCfg::new(this.multi_edit_table(), ContentKind::MultiEdit))?;
            storage.create_or_extend_table(TableCfg::new(this.history_table(), ContentKind::EditHistory))?;
        }

        let history_table = this.history_table();
        let ref_field = format!("{history_table}Ref");
        let manager = Rc::clone(this);
        this.db.register_observer(
            history_table,
            Box::new(move |_route, payload| {
                let Some(hash_hex) = payload.get(&ref_field).and_then(Value::as_str) else {
                    return Ok(());
                };
                let Some(hash) = ContentHash::from_hex(hash_hex) else {
                    return Ok(());
                };
                manager.edit_history_ref(hash).map(|_| ()).map_err(|e| e.to_string())
            }),
        );
        Ok(())
    }

    /// Register a callback invoked with the new head hash after every
    /// promotion (by [`Self::edit`] or by [`Self::edit_history_ref`]
    /// resolving an externally-sourced head).
    pub fn register_head_listener(&self, listener: Box<dyn FnMut(ContentHash)>) {
        self.head_listeners.borrow_mut().push(listener);
    }

    fn notify_head_listeners(&self, head: ContentHash) {
        for listener in self.head_listeners.borrow_mut().iter_mut() {
            listener(head);
        }
    }

    /// The current chain head's `EditHistory` hash, if any edit has been
    /// applied yet.
    #[must_use]
    pub fn head(&self) -> Option<ContentHash> {
        *self.head.borrow()
    }

    /// Extend the chain with `edit`.
    ///
    /// `cake_ref` is required exactly when there is no head yet (opening
    /// a new chain root) and forbidden otherwise.
    ///
    /// # Errors
    /// Returns [`EditError::CakeRefRequirement`] if `cake_ref`'s
    /// presence doesn't match the no-head/has-head rule, or any error
    /// from applying the edit or persisting the chain rows.
    pub fn edit(&self, edit: Edit, cake_ref: Option<ContentHash>) -> Result<ContentHash, EditError> {
        let current_head = *self.head.borrow();

        let (mut processor, prev_multi_edit_ref, prev_history_ref) = match current_head {
            None => {
                let cake_ref = cake_ref
                    .ok_or(EditError::CakeRefRequirement("a new chain root requires a cakeRef"))?;
                (
                    EditProcessor::new(Rc::clone(&self.db), self.cake_key.clone(), cake_ref),
                    None,
                    None,
                )
            }
            Some(head_ref) => {
                if cake_ref.is_some() {
                    return Err(EditError::CakeRefRequirement(
                        "cakeRef is only allowed when starting a new chain",
                    ));
                }
                let managed = self
                    .processors
                    .borrow()
                    .get(&head_ref)
                    .cloned()
                    .ok_or_else(|| EditError::EditHistoryNotFound {
                        hash: head_ref.to_string(),
                    })?;
                (managed.processor.clone_processor(), Some(managed.multi_edit_ref), Some(head_ref))
            }
        };

        let edit_hash = edit.hash();
        processor.apply(edit.clone())?;

        self.db.insert(InsertSpec::new(
            Route::from_flat(&format!("/{}", self.edit_table()))?,
            Value::Object(edit.to_row()),
        ))?;

        let multi_edit = match prev_multi_edit_ref {
            Some(prev) => MultiEdit::extending(edit_hash, prev),
            None => MultiEdit::root(edit_hash),
        };
        let multi_edit_hash = multi_edit.hash();
        self.db.insert(InsertSpec::new(
            Route::from_flat(&format!("/{}", self.multi_edit_table()))?,
            Value::Object(multi_edit.to_row()),
        ))?;

        let history_row = EditHistoryRow {
            time_id: generate_time_id(),
            data_ref: processor.cake_ref(),
            multi_edit_ref: multi_edit_hash,
            previous: prev_history_ref.map(|h| vec![h]),
        };
        let insert_result = self.db.insert(InsertSpec::new(
            Route::from_flat(&format!("/{}", self.history_table()))?,
            Value::Object(history_row.to_row()),
        ))?;
        let history_hash = insert_result.hash;

        self.processors.borrow_mut().insert(
            history_hash,
            ManagedChain {
                processor,
                multi_edit_ref: multi_edit_hash,
            },
        );
        *self.head.borrow_mut() = Some(history_hash);
        self.notify_head_listeners(history_hash);
        Ok(history_hash)
    }

    /// Resolve `history_ref` to its replayed processor, caching every
    /// intermediate step discovered along the way.
    ///
    /// # Errors
    /// Returns [`EditError::EditHistoryNotFound`] if `history_ref` (or a
    /// predecessor it names) has no matching row, or
    /// [`EditError::MergeNotSupported`] if a row in the chain names more
    /// than one predecessor.
    pub fn edit_history_ref(&self, history_ref: ContentHash) -> Result<EditProcessor<G>, EditError> {
        if let Some(managed) = self.processors.borrow().get(&history_ref) {
            return Ok(managed.processor.clone());
        }

        let mut pending: Vec<(ContentHash, EditHistoryRow, Edit)> = Vec::new();
        let mut cursor = history_ref;
        let mut base: Option<ManagedChain<G>> = None;
        loop {
            if let Some(managed) = self.processors.borrow().get(&cursor) {
                base = Some(managed.clone());
                break;
            }
            let row = self.read_edit_history_row(cursor)?;
            let edit = self.resolve_edit_for(&row)?;
            let previous_single = match &row.previous {
                None => None,
                Some(v) if v.len() == 1 => Some(v[0]),
                Some(v) => {
                    return Err(EditError::MergeNotSupported { count: v.len() });
                }
            };
            pending.push((cursor, row, edit));
            match previous_single {
                Some(p) => cursor = p,
                None => break,
            }
        }
        pending.reverse();

        let mut processor = match &base {
            Some(managed) => managed.processor.clone_processor(),
            None => {
                let (_, first_row, _) = pending.first().ok_or_else(|| EditError::EditHistoryNotFound {
                    hash: history_ref.to_string(),
                })?;
                EditProcessor::new(Rc::clone(&self.db), self.cake_key.clone(), first_row.data_ref)
            }
        };

        for (hash, row, edit) in pending {
            processor.apply(edit)?;
            self.processors.borrow_mut().insert(
                hash,
                ManagedChain {
                    processor: processor.clone_processor(),
                    multi_edit_ref: row.multi_edit_ref,
                },
            );
        }

        self.processors
            .borrow()
            .get(&history_ref)
            .map(|m| m.processor.clone())
            .ok_or(EditError::EditHistoryNotFound {
                hash: history_ref.to_string(),
            })
    }

    fn resolve_edit_for(&self, row: &EditHistoryRow) -> Result<Edit, EditError> {
        let multi_edit_row = self.read_row_by_hash(&self.multi_edit_table(), row.multi_edit_ref, |hash| {
            EditError::MultiEditNotFound { hash }
        })?;
        let multi_edit = MultiEdit::from_row(&multi_edit_row)?;
        let edit_row = self.read_row_by_hash(&self.edit_table(), multi_edit.edit, |hash| {
            EditError::EditNotFound { hash }
        })?;
        Edit::from_row(&edit_row)
    }

    fn read_edit_history_row(&self, hash: ContentHash) -> Result<EditHistoryRow, EditError> {
        let row = self.read_row_by_hash(&self.history_table(), hash, |hash| EditError::EditHistoryNotFound { hash })?;
        EditHistoryRow::from_row(&row)
    }

    fn read_row_by_hash(
        &self,
        table: &str,
        hash: ContentHash,
        not_found: impl FnOnce(String) -> EditError,
    ) -> Result<Row, EditError> {
        let storage = self.db.storage();
        let storage = storage.borrow();
        let mut where_ = Where::new();
        where_.insert(HASH_FIELD.to_owned(), json!(hash.to_string()));
        let found = storage.read_rows(table, &where_)?;
        found
            .get(table)
            .and_then(|td| td.data.first().cloned())
            .ok_or_else(|| not_found(hash.to_string()))
    }
}
