// SPDX-License-Identifier: Apache-2.0
//! Replays an edit chain against a cake revision, keeping a
//! [`Join`] open as the current materialized view.

use std::rc::Rc;

use layercake_core::{Db, InsertResult};
use layercake_hash::{ContentHash, Route};
use layercake_join::Join;
use layercake_storage::StorageGateway;

use crate::edit::{Edit, EditAction};
use crate::error::EditError;

/// The outcome of [`EditProcessor::publish`].
pub struct PublishResult<G: StorageGateway> {
    /// Every insert written while materializing the overrides (component
    /// rows, then layer rows, then the cake row) — empty if the chain
    /// carried no `setValue` overrides.
    pub inserts: Vec<InsertResult>,
    /// The cake revision the published state now lives at. Equal to the
    /// processor's prior anchor if `inserts` is empty.
    pub cake_ref: ContentHash,
    /// A fresh processor anchored on `cake_ref`, with no edits applied
    /// yet, anchored on the written cake ref.
    pub processor: EditProcessor<G>,
}

/// Replays a chain of [`Edit`]s: the first must be a `selection`, which
/// opens a [`Join`]; every subsequent edit dispatches into that join.
pub struct EditProcessor<G: StorageGateway> {
    db: Rc<Db<G>>,
    cake_table: String,
    cake_ref: ContentHash,
    edits: Vec<Edit>,
    join: Option<Join<G>>,
}

impl<G: StorageGateway> Clone for EditProcessor<G> {
    fn clone(&self) -> Self {
        Self {
            db: Rc::clone(&self.db),
            cake_table: self.cake_table.clone(),
            cake_ref: self.cake_ref,
            edits: self.edits.clone(),
            join: self.join.clone(),
        }
    }
}

impl<G: StorageGateway> EditProcessor<G> {
    /// Start a processor anchored on `cake_ref`, with no edits applied
    /// yet. The next call to [`Self::apply`] must carry a `selection`.
    #[must_use]
    pub fn new(db: Rc<Db<G>>, cake_table: impl Into<String>, cake_ref: ContentHash) -> Self {
        Self {
            db,
            cake_table: cake_table.into(),
            cake_ref,
            edits: Vec::new(),
            join: None,
        }
    }

    /// Build a processor by replaying `edits` in order (oldest/root
    /// first) against `cake_ref`.
    ///
    /// # Errors
    /// Returns [`EditError::ChainMustOpenWithSelection`] if `edits` is
    /// non-empty and its first entry isn't a `selection`, or any error
    /// [`Self::apply`] raises while replaying a later edit.
    pub fn replay(
        db: Rc<Db<G>>,
        cake_table: impl Into<String>,
        cake_ref: ContentHash,
        edits: Vec<Edit>,
    ) -> Result<Self, EditError> {
        let mut processor = Self::new(db, cake_table, cake_ref);
        for edit in edits {
            processor.apply(edit)?;
        }
        Ok(processor)
    }

    /// This processor's cake table.
    #[must_use]
    pub fn cake_table(&self) -> &str {
        &self.cake_table
    }

    /// The cake revision this processor is anchored on.
    #[must_use]
    pub fn cake_ref(&self) -> ContentHash {
        self.cake_ref
    }

    /// Every edit applied so far, oldest first.
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// The processor's current materialized join, if a `selection` has
    /// opened one yet.
    #[must_use]
    pub fn join(&self) -> Option<&Join<G>> {
        self.join.as_ref()
    }

    /// Apply one more edit, extending the chain.
    ///
    /// # Errors
    /// Returns [`EditError::ChainMustOpenWithSelection`] if this is the
    /// first edit applied and it isn't a `selection`, or a propagated
    /// [`layercake_join::JoinError`] from materializing or dispatching
    /// into the join.
    pub fn apply(&mut self, edit: Edit) -> Result<(), EditError> {
        match (&mut self.join, &edit.action) {
            (None, EditAction::Selection(selection)) => {
                let join = Join::materialize(self.db.storage(), selection.clone(), &self.cake_table, &self.cake_ref)?;
                self.join = Some(join);
            }
            (None, _) => return Err(EditError::ChainMustOpenWithSelection),
            (Some(join), EditAction::Selection(selection)) => join.select(selection.clone())?,
            (Some(join), EditAction::Filter(filter)) => join.filter(filter.clone())?,
            (Some(join), EditAction::SetValue(set_value)) => join.set_value(set_value.clone())?,
            (Some(join), EditAction::Sort(sort)) => join.sort(sort.clone())?,
        }
        self.edits.push(edit);
        Ok(())
    }

    /// Share this processor's db/table/anchor while duplicating its edit
    /// list and join stack independently.
    #[must_use]
    pub fn clone_processor(&self) -> Self {
        self.clone()
    }

    /// Materialize every pending `setValue` override back into the
    /// store via [`Join::insert`], then start a new processor anchored
    /// on the result.
    ///
    /// # Errors
    /// Returns [`EditError::ChainMustOpenWithSelection`] if no join has
    /// been opened yet, or a propagated insert error.
    pub fn publish(&self) -> Result<PublishResult<G>, EditError> {
        let join = self.join.as_ref().ok_or(EditError::ChainMustOpenWithSelection)?;
        let inserts = join.insert(&self.db)?;
        let cake_ref = inserts.last().map_or(self.cake_ref, |r| r.hash);
        let processor = Self::new(Rc::clone(&self.db), self.cake_table.clone(), cake_ref);
        Ok(PublishResult {
            inserts,
            cake_ref,
            processor,
        })
    }

    /// This processor's cake route at its current anchor, e.g.
    /// `/cake@<hash>`.
    #[must_use]
    pub fn cake_route(&self) -> String {
        Route::from_flat(&format!("/{}", self.cake_table))
            .map(|r| r.flat())
            .unwrap_or_else(|_| format!("/{}", self.cake_table))
            + "@"
            + &self.cake_ref.to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::cell::RefCell;

    use layercake_core::InsertSpec;
    use layercake_hash::Route;
    use layercake_join::SetValue;
    use layercake_select::ColumnSelection;
    use layercake_storage::{ColumnType, ContentKind, MemoryGateway, TableCfg};
    use serde_json::json;

    use super::*;

    fn declare(db: &Db<MemoryGateway>, table: &str, kind: ContentKind) {
        db.storage()
            .borrow_mut()
            .create_or_extend_table(TableCfg::new(table, kind).with_column("value", ColumnType::JsonValue))
            .unwrap();
    }

    struct Fixture {
        db: Rc<Db<MemoryGateway>>,
        cake_hash: ContentHash,
    }

    fn build_fixture() -> Fixture {
        let db = Db::new(Rc::new(RefCell::new(MemoryGateway::new())));
        declare(&db, "component", ContentKind::Components);
        declare(&db, "layer", ContentKind::Layers);
        declare(&db, "cake", ContentKind::Cakes);
        declare(&db, "cakeSliceIds", ContentKind::SliceIds);

        let comp1 = db
            .insert(InsertSpec::new(Route::from_flat("/component").unwrap(), json!({"brand": "Porsche"})))
            .unwrap();
        let slice_ids = db
            .insert(InsertSpec::new(Route::from_flat("/cakeSliceIds").unwrap(), json!({"add": ["vin1"]})))
            .unwrap();
        let layer = db
            .insert(InsertSpec::new(
                Route::from_flat("/layer").unwrap(),
                json!({"mapping": {"vin1": comp1.hash.to_string()}, "sliceIdsRef": slice_ids.hash.to_string()}),
            ))
            .unwrap();
        let cake = db
            .insert(InsertSpec::new(
                Route::from_flat("/cake").unwrap(),
                json!({"layers": {"layer": layer.hash.to_string()}, "sliceIdsRef": slice_ids.hash.to_string()}),
            ))
            .unwrap();

        Fixture {
            db: Rc::new(db),
            cake_hash: cake.hash,
        }
    }

    #[test]
    fn first_non_selection_edit_is_rejected() {
        let fixture = build_fixture();
        let mut processor = EditProcessor::new(Rc::clone(&fixture.db), "cake", fixture.cake_hash);
        let edit = Edit::new(
            "bad",
            EditAction::SetValue(SetValue {
                route: "/layer/component/brand".to_owned(),
                value: json!("x"),
            }),
        );
        let err = processor.apply(edit).unwrap_err();
        assert!(matches!(err, EditError::ChainMustOpenWithSelection));
    }

    #[test]
    fn selection_then_set_value_then_publish_writes_new_cake() {
        let fixture = build_fixture();
        let mut processor = EditProcessor::new(Rc::clone(&fixture.db), "cake", fixture.cake_hash);
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        processor.apply(Edit::new("pick brand", EditAction::Selection(selection))).unwrap();
        processor
            .apply(Edit::new(
                "rename",
                EditAction::SetValue(SetValue {
                    route: "/layer/component/brand".to_owned(),
                    value: json!("Porsche 911"),
                }),
            ))
            .unwrap();

        let published = processor.publish().unwrap();
        assert_ne!(published.cake_ref, fixture.cake_hash);
        assert!(published.processor.join().is_none());
        assert!(published.processor.edits().is_empty());
    }

    #[test]
    fn clone_processor_duplicates_edits_independently() {
        let fixture = build_fixture();
        let mut processor = EditProcessor::new(Rc::clone(&fixture.db), "cake", fixture.cake_hash);
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        processor.apply(Edit::new("pick brand", EditAction::Selection(selection))).unwrap();

        let mut cloned = processor.clone_processor();
        cloned
            .apply(Edit::new(
                "rename",
                EditAction::SetValue(SetValue {
                    route: "/layer/component/brand".to_owned(),
                    value: json!("Audi"),
                }),
            ))
            .unwrap();

        assert_eq!(processor.edits().len(), 1);
        assert_eq!(cloned.edits().len(), 2);
    }
}
