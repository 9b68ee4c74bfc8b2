// SPDX-License-Identifier: Apache-2.0
//! Join materialization, the process stack, and `Join::insert`.
//!
//! Materialization reads a cake row's `layers` map, each layer's
//! `sliceId -> componentHash` mapping and `sliceIdsRef`, and the components
//! those mappings point to. This is a different addressing scheme from
//! [`layercake_core::Db::get`]'s route/child-ref walk — a join resolves
//! through a `SliceId`-keyed mapping, not a nested child-ref chain — so it
//! talks to [`StorageGateway`] directly rather than going through `Db::get`.
//! A cake/layer row's companion slice-id set lives in a table named
//! `{owner}SliceIds`, mirroring the `{table}InsertHistory` naming
//! convention already used for insert history.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use layercake_core::{Db, InsertResult, InsertSpec};
use layercake_hash::{rmhsh, ContentHash, Route, HASH_FIELD};
use layercake_select::ColumnSelection;
use layercake_storage::{Row, StorageGateway, Where};
use serde_json::{json, Value};

use crate::cell::{JoinCell, JoinRows};
use crate::error::JoinError;
use crate::filter::{apply_row_filter, RowFilter};
use crate::setvalue::{apply_set_value, SetValue};
use crate::sort::RowSort;

/// One operation pushed onto a [`Join`]'s process stack.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinProcess {
    /// A row filter.
    Filter(RowFilter),
    /// A column projection/reorder.
    Select(ColumnSelection),
    /// A cell override.
    SetValue(SetValue),
    /// A row sort.
    Sort(RowSort),
}

#[derive(Debug, Clone)]
struct JoinFrame {
    process: JoinProcess,
    column_selection: ColumnSelection,
    slice_order: Vec<String>,
    rows: JoinRows,
}

#[derive(Debug, Clone)]
struct JoinBase {
    cake_table: String,
    cake_row: Row,
    cake_hash: ContentHash,
    layer_hashes: BTreeMap<String, ContentHash>,
    layer_rows: BTreeMap<String, Row>,
    column_selection: ColumnSelection,
    slice_order: Vec<String>,
    rows: JoinRows,
}

/// A materialized, column-selected view over one cake revision, plus an
/// ordered stack of filter/select/setValue/sort operations applied to it.
///
/// `data`/`columnSelection`-equivalent accessors ([`Self::rows`],
/// [`Self::column_count`], ...) resolve against the top of the stack, or
/// the base materialization if the stack is empty. [`Self::clone`]
/// duplicates the stack, not the base.
pub struct Join<G: StorageGateway> {
    storage: Rc<RefCell<G>>,
    base: JoinBase,
    stack: Vec<JoinFrame>,
}

impl<G: StorageGateway> Clone for Join<G> {
    fn clone(&self) -> Self {
        Self {
            storage: Rc::clone(&self.storage),
            base: self.base.clone(),
            stack: self.stack.clone(),
        }
    }
}

fn read_row_by_hash<G: StorageGateway>(
    storage: &Rc<RefCell<G>>,
    table: &str,
    hash: &ContentHash,
) -> Result<Option<Row>, JoinError> {
    let storage = storage.borrow();
    if !storage.table_exists(table) {
        return Ok(None);
    }
    let mut where_ = Where::new();
    where_.insert(HASH_FIELD.to_owned(), json!(hash.to_string()));
    let found = storage.read_rows(table, &where_)?;
    Ok(found.get(table).and_then(|td| td.data.first().cloned()))
}

fn resolve_slice_ids<G: StorageGateway>(
    storage: &Rc<RefCell<G>>,
    owner_table: &str,
    owner_row: &Row,
) -> Result<Vec<String>, JoinError> {
    let Some(ref_hex) = owner_row.get("sliceIdsRef").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };
    let Some(hash) = ContentHash::from_hex(ref_hex) else {
        return Ok(Vec::new());
    };
    let slice_ids_table = format!("{owner_table}SliceIds");
    let Some(row) = read_row_by_hash(storage, &slice_ids_table, &hash)? else {
        return Ok(Vec::new());
    };
    Ok(row
        .get("add")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(ToOwned::to_owned).collect())
        .unwrap_or_default())
}

fn column_index_map(selection: &ColumnSelection) -> HashMap<&str, usize> {
    selection
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.route.as_str(), i))
        .collect()
}

struct ColumnRoute<'a> {
    layer: &'a str,
    component: Option<&'a str>,
    property: &'a str,
}

fn split_column_route(route: &Route) -> ColumnRoute<'_> {
    let segments = route.segments();
    let property = route.property_key().unwrap_or_default();
    if segments.len() == 1 {
        ColumnRoute {
            layer: segments[0].table_key(),
            component: None,
            property,
        }
    } else {
        ColumnRoute {
            layer: segments[0].table_key(),
            component: Some(segments[1].table_key()),
            property,
        }
    }
}

impl<G: StorageGateway> Join<G> {
    /// Materialize a join over `cake_ref`, restricted to `column_selection`.
    ///
    /// # Errors
    /// Returns [`JoinError::CakeNotFound`] if `cake_ref` doesn't resolve
    /// against `cake_table`, [`JoinError::LayerNotInCake`] if a column's
    /// route names a layer the cake's `layers` map doesn't carry, or a
    /// propagated storage/route error.
    pub fn materialize(
        storage: Rc<RefCell<G>>,
        column_selection: ColumnSelection,
        cake_table: &str,
        cake_ref: &ContentHash,
    ) -> Result<Self, JoinError> {
        let cake_row = read_row_by_hash(&storage, cake_table, cake_ref)?.ok_or_else(|| JoinError::CakeNotFound {
            table: cake_table.to_owned(),
            cake_ref: cake_ref.to_string(),
        })?;

        let layers = cake_row
            .get("layers")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let mut layer_hashes = BTreeMap::new();
        for (name, hash_val) in &layers {
            if let Some(hash) = hash_val.as_str().and_then(ContentHash::from_hex) {
                layer_hashes.insert(name.clone(), hash);
            }
        }

        let mut layer_rows = BTreeMap::new();
        for (name, hash) in &layer_hashes {
            if let Some(row) = read_row_by_hash(&storage, name, hash)? {
                layer_rows.insert(name.clone(), row);
            }
        }

        let slice_order = resolve_slice_ids(&storage, cake_table, &cake_row)?;

        let mut rows: JoinRows = slice_order.iter().map(|s| (s.clone(), Vec::new())).collect();
        let mut component_cache: BTreeMap<String, Row> = BTreeMap::new();

        for column in column_selection.columns() {
            let route = Route::from_flat_with_property(&column.route)?;
            let split = split_column_route(&route);

            let Some(component_table) = split.component else {
                let value = layer_rows.get(split.layer).and_then(|r| r.get(split.property)).cloned();
                for slice_id in &slice_order {
                    rows.entry(slice_id.clone()).or_default().push(JoinCell::from_value(value.clone()));
                }
                continue;
            };

            if !layer_hashes.contains_key(split.layer) {
                return Err(JoinError::LayerNotInCake {
                    layer: split.layer.to_owned(),
                });
            }
            let mapping = layer_rows
                .get(split.layer)
                .and_then(|r| r.get("mapping"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            for slice_id in &slice_order {
                let value = match mapping.get(slice_id).and_then(Value::as_str) {
                    Some(hash_hex) => {
                        if !component_cache.contains_key(hash_hex) {
                            if let Some(hash) = ContentHash::from_hex(hash_hex) {
                                if let Some(row) = read_row_by_hash(&storage, component_table, &hash)? {
                                    component_cache.insert(hash_hex.to_owned(), row);
                                }
                            }
                        }
                        component_cache.get(hash_hex).and_then(|r| r.get(split.property)).cloned()
                    }
                    None => None,
                };
                rows.entry(slice_id.clone()).or_default().push(JoinCell::from_value(value));
            }
        }

        let base = JoinBase {
            cake_table: cake_table.to_owned(),
            cake_row,
            cake_hash: *cake_ref,
            layer_hashes,
            layer_rows,
            column_selection,
            slice_order,
            rows,
        };
        Ok(Self {
            storage,
            base,
            stack: Vec::new(),
        })
    }

    fn top(&self) -> (&ColumnSelection, &[String], &JoinRows) {
        self.stack.last().map_or(
            (&self.base.column_selection, self.base.slice_order.as_slice(), &self.base.rows),
            |frame| (&frame.column_selection, frame.slice_order.as_slice(), &frame.rows),
        )
    }

    /// Push a row filter onto the process stack.
    ///
    /// # Errors
    /// Returns [`JoinError::FilterRouteNotInJoin`] if the filter names a
    /// route not in the current column selection.
    pub fn filter(&mut self, row_filter: RowFilter) -> Result<(), JoinError> {
        let (new_order, new_rows, column_selection) = {
            let (col_sel, slice_order, rows) = self.top();
            let index = column_index_map(col_sel);
            let survivors = apply_row_filter(&row_filter, slice_order, rows, &index)?;
            let new_order: Vec<String> = survivors.into_iter().map(str::to_owned).collect();
            let new_rows: JoinRows = new_order
                .iter()
                .filter_map(|s| rows.get(s).map(|r| (s.clone(), r.clone())))
                .collect();
            (new_order, new_rows, col_sel.clone())
        };
        self.stack.push(JoinFrame {
            process: JoinProcess::Filter(row_filter),
            column_selection,
            slice_order: new_order,
            rows: new_rows,
        });
        Ok(())
    }

    /// Push a column projection onto the process stack. Every column in
    /// `new_selection` must already be addressable in the current
    /// selection (a `select` projects/reorders materialized columns, it
    /// doesn't introduce new ones).
    ///
    /// # Errors
    /// Returns [`JoinError::Select`] if a requested route isn't present in
    /// the current selection.
    pub fn select(&mut self, new_selection: ColumnSelection) -> Result<(), JoinError> {
        let (new_rows, slice_order) = {
            let (col_sel, slice_order, rows) = self.top();
            let mut mapping = Vec::with_capacity(new_selection.len());
            for column in new_selection.columns() {
                let idx = col_sel.column_index(&layercake_select::ColumnKey::Route(&column.route), true)?;
                mapping.push(idx as usize);
            }
            let mut new_rows = JoinRows::new();
            for slice_id in slice_order {
                if let Some(row) = rows.get(slice_id) {
                    let new_row = mapping.iter().map(|&i| row[i].clone()).collect();
                    new_rows.insert(slice_id.clone(), new_row);
                }
            }
            (new_rows, slice_order.to_vec())
        };
        self.stack.push(JoinFrame {
            process: JoinProcess::Select(new_selection.clone()),
            column_selection: new_selection,
            slice_order,
            rows: new_rows,
        });
        Ok(())
    }

    /// Push a single-cell override onto the process stack.
    ///
    /// # Errors
    /// Returns [`JoinError::Select`] if `set_value.route` isn't in the
    /// current selection, or [`JoinError::SetValueAmbiguous`] if a
    /// targeted cell already carries an override.
    pub fn set_value(&mut self, set_value: SetValue) -> Result<(), JoinError> {
        let (new_rows, slice_order, column_selection) = {
            let (col_sel, slice_order, rows) = self.top();
            let idx = col_sel.column_index(&layercake_select::ColumnKey::Route(&set_value.route), true)?;
            let mut new_rows = rows.clone();
            apply_set_value(&mut new_rows, idx as usize, &set_value)?;
            (new_rows, slice_order.to_vec(), col_sel.clone())
        };
        self.stack.push(JoinFrame {
            process: JoinProcess::SetValue(set_value),
            column_selection,
            slice_order,
            rows: new_rows,
        });
        Ok(())
    }

    /// Apply several overrides in sequence, each pushing its own frame.
    ///
    /// # Errors
    /// Returns the first [`JoinError`] any individual `setValue` raises.
    pub fn set_values(&mut self, values: &[SetValue]) -> Result<(), JoinError> {
        for value in values {
            self.set_value(value.clone())?;
        }
        Ok(())
    }

    /// Push a row sort onto the process stack.
    ///
    /// # Errors
    /// Returns [`JoinError::FilterRouteNotInJoin`] if a sort key names a
    /// route not in the current column selection.
    pub fn sort(&mut self, row_sort: RowSort) -> Result<(), JoinError> {
        let (new_order, rows, column_selection) = {
            let (col_sel, slice_order, rows) = self.top();
            let index = column_index_map(col_sel);
            let new_order = row_sort.apply_to(slice_order, rows, &index)?;
            (new_order, rows.clone(), col_sel.clone())
        };
        self.stack.push(JoinFrame {
            process: JoinProcess::Sort(row_sort),
            column_selection,
            slice_order: new_order,
            rows,
        });
        Ok(())
    }

    /// The ordered stack of filter/select/setValue/sort operations applied
    /// so far, oldest first.
    #[must_use]
    pub fn process_stack(&self) -> Vec<&JoinProcess> {
        self.stack.iter().map(|frame| &frame.process).collect()
    }

    /// The number of rows currently visible (after any pushed filter).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.top().1.len()
    }

    /// The number of columns currently selected.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.top().0.len()
    }

    /// The current row order's indices, `0..row_count()`.
    #[must_use]
    pub fn row_indices(&self) -> std::ops::Range<usize> {
        0..self.row_count()
    }

    /// The raw cell row for a single `SliceId`, if still present.
    #[must_use]
    pub fn row(&self, slice_id: &str) -> Option<&[JoinCell]> {
        self.top().2.get(slice_id).map(Vec::as_slice)
    }

    /// Every visible row's effective cell values, dense and in current row
    /// order (`null`/`None` for a cell the underlying layer never covered).
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<Option<Value>>> {
        let (_, slice_order, rows) = self.top();
        let column_count = self.column_count();
        slice_order
            .iter()
            .map(|slice_id| {
                let row = rows.get(slice_id);
                (0..column_count)
                    .map(|i| row.and_then(|r| r.get(i)).and_then(JoinCell::effective).cloned())
                    .collect()
            })
            .collect()
    }

    /// Every unique `(layerTable, componentTable)` pair named by a
    /// two-segment column route, in route order.
    #[must_use]
    pub fn layer_routes(&self) -> Vec<(String, String)> {
        let (col_sel, _, _) = self.top();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for column in col_sel.columns() {
            if let Ok(route) = Route::from_flat_with_property(&column.route) {
                let split = split_column_route(&route);
                if let Some(component) = split.component {
                    let key = (split.layer.to_owned(), component.to_owned());
                    if seen.insert(key.clone()) {
                        out.push(key);
                    }
                }
            }
        }
        out
    }

    /// Every unique component-table route (`/layerTable/componentTable`,
    /// upper-cased) a two-segment column names.
    #[must_use]
    pub fn component_routes(&self) -> Vec<String> {
        self.layer_routes()
            .into_iter()
            .map(|(layer, component)| format!("/{layer}/{component}").to_uppercase())
            .collect()
    }

    /// This join's cake route. Always `Ok` in this implementation — a
    /// `Join` is always materialized over exactly one cake revision — but
    /// kept fallible for parity with the source API.
    ///
    /// # Errors
    /// Never returns `Err` in this implementation.
    pub fn cake_route(&self) -> Result<String, JoinError> {
        Ok(format!("/{}@{}", self.base.cake_table, self.base.cake_hash))
    }

    /// Rebuild and commit every component/layer/cake row touched by a
    /// `setValue` override, via `db`. Returns every new insert, in the
    /// order component rows, then layer rows, then the cake row — empty if
    /// no cell carries an override.
    ///
    /// # Errors
    /// Returns a propagated [`CoreError`](layercake_core::CoreError) if any
    /// insert fails, or [`JoinError::InvalidRoute`] if a column's route
    /// can't be re-parsed.
    pub fn insert(&self, db: &Db<G>) -> Result<Vec<InsertResult>, JoinError> {
        let (col_sel, slice_order, rows) = self.top();

        let mut column_routes = Vec::with_capacity(col_sel.len());
        for column in col_sel.columns() {
            column_routes.push(Route::from_flat_with_property(&column.route)?);
        }

        let mut results = Vec::new();
        let mut layer_mapping_updates: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        for slice_id in slice_order {
            let Some(row) = rows.get(slice_id) else { continue };
            for (idx, route) in column_routes.iter().enumerate() {
                let split = split_column_route(route);
                let Some(component_table) = split.component else { continue };
                let Some(cell) = row.get(idx) else { continue };
                let Some(override_value) = &cell.insert else { continue };

                let mapping = self
                    .base
                    .layer_rows
                    .get(split.layer)
                    .and_then(|r| r.get("mapping"))
                    .and_then(Value::as_object);
                let Some(orig_hash_hex) = mapping.and_then(|m| m.get(slice_id)).and_then(Value::as_str) else {
                    continue;
                };
                let Some(orig_hash) = ContentHash::from_hex(orig_hash_hex) else {
                    continue;
                };
                let Some(orig_row) = read_row_by_hash(&self.storage, component_table, &orig_hash)? else {
                    continue;
                };

                let mut new_value = rmhsh(&Value::Object(orig_row));
                if let Value::Object(map) = &mut new_value {
                    map.insert(split.property.to_owned(), override_value.clone());
                }
                let component_route = Route::from_flat(&format!("/{component_table}"))?;
                let insert_result = db.insert(InsertSpec::new(component_route, new_value))?;
                layer_mapping_updates
                    .entry(split.layer.to_owned())
                    .or_default()
                    .insert(slice_id.clone(), insert_result.hash.to_string());
                results.push(insert_result);
            }
        }

        if layer_mapping_updates.is_empty() {
            return Ok(results);
        }

        let mut cake_layers_update: BTreeMap<String, String> = BTreeMap::new();
        for (layer_name, updates) in &layer_mapping_updates {
            let layer_row = self.base.layer_rows.get(layer_name).cloned().unwrap_or_default();
            let mut mapping = layer_row
                .get("mapping")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for (slice_id, hash_hex) in updates {
                mapping.insert(slice_id.clone(), json!(hash_hex));
            }
            let slice_ids_ref = layer_row.get("sliceIdsRef").cloned().unwrap_or(Value::Null);
            let new_layer_value = json!({ "mapping": Value::Object(mapping), "sliceIdsRef": slice_ids_ref });
            let layer_route = Route::from_flat(&format!("/{layer_name}"))?;
            let insert_result = db.insert(InsertSpec::new(layer_route, new_layer_value))?;
            cake_layers_update.insert(layer_name.clone(), insert_result.hash.to_string());
            results.push(insert_result);
        }

        let mut layers = self
            .base
            .cake_row
            .get("layers")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (name, hash_hex) in &cake_layers_update {
            layers.insert(name.clone(), json!(hash_hex));
        }
        let cake_slice_ids_ref = self.base.cake_row.get("sliceIdsRef").cloned().unwrap_or(Value::Null);
        let new_cake_value = json!({ "layers": Value::Object(layers), "sliceIdsRef": cake_slice_ids_ref });
        let cake_route = Route::from_flat(&format!("/{}", self.base.cake_table))?;
        let cake_insert = db.insert(InsertSpec::new(cake_route, new_cake_value))?;
        results.push(cake_insert);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use layercake_select::ColumnSelection;
    use layercake_storage::{ColumnType, ContentKind, MemoryGateway, TableCfg};

    fn declare(db: &Db<MemoryGateway>, table: &str, kind: ContentKind) {
        db.storage()
            .borrow_mut()
            .create_or_extend_table(TableCfg::new(table, kind).with_column("value", ColumnType::JsonValue))
            .unwrap();
    }

    struct Fixture {
        db: Db<MemoryGateway>,
        cake_hash: ContentHash,
    }

    fn build_fixture() -> Fixture {
        let db = Db::new(Rc::new(RefCell::new(MemoryGateway::new())));
        declare(&db, "component", ContentKind::Components);
        declare(&db, "layer", ContentKind::Layers);
        declare(&db, "cake", ContentKind::Cakes);
        declare(&db, "cakeSliceIds", ContentKind::SliceIds);

        let comp1 = db
            .insert(InsertSpec::new(
                Route::from_flat("/component").unwrap(),
                json!({"brand": "Porsche"}),
            ))
            .unwrap();
        let comp2 = db
            .insert(InsertSpec::new(
                Route::from_flat("/component").unwrap(),
                json!({"brand": "Audi"}),
            ))
            .unwrap();
        let slice_ids = db
            .insert(InsertSpec::new(
                Route::from_flat("/cakeSliceIds").unwrap(),
                json!({"add": ["vin1", "vin2"]}),
            ))
            .unwrap();
        let layer = db
            .insert(InsertSpec::new(
                Route::from_flat("/layer").unwrap(),
                json!({
                    "mapping": {"vin1": comp1.hash.to_string(), "vin2": comp2.hash.to_string()},
                    "sliceIdsRef": slice_ids.hash.to_string(),
                }),
            ))
            .unwrap();
        let cake = db
            .insert(InsertSpec::new(
                Route::from_flat("/cake").unwrap(),
                json!({
                    "layers": {"layer": layer.hash.to_string()},
                    "sliceIdsRef": slice_ids.hash.to_string(),
                }),
            ))
            .unwrap();

        Fixture { db, cake_hash: cake.hash }
    }

    #[test]
    fn materializes_rows_for_every_slice_id() {
        let fixture = build_fixture();
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let join = Join::materialize(fixture.db.storage(), selection, "cake", &fixture.cake_hash).unwrap();

        assert_eq!(join.row_count(), 2);
        assert_eq!(join.column_count(), 1);
        assert_eq!(join.row("vin1").unwrap()[0].effective(), Some(&json!("Porsche")));
        assert_eq!(join.row("vin2").unwrap()[0].effective(), Some(&json!("Audi")));
    }

    #[test]
    fn filter_then_sort_narrows_and_orders_rows() {
        let fixture = build_fixture();
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let mut join = Join::materialize(fixture.db.storage(), selection, "cake", &fixture.cake_hash).unwrap();

        join.sort(RowSort::new(vec![("/layer/component/brand".to_owned(), crate::sort::SortDirection::Asc)]))
            .unwrap();
        let rows = join.rows();
        assert_eq!(rows, vec![vec![Some(json!("Audi"))], vec![Some(json!("Porsche"))]]);
        assert!(matches!(join.process_stack().as_slice(), [JoinProcess::Sort(_)]));
    }

    #[test]
    fn set_value_then_insert_writes_new_component_layer_and_cake_rows() {
        let fixture = build_fixture();
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let mut join = Join::materialize(fixture.db.storage(), selection, "cake", &fixture.cake_hash).unwrap();

        join.set_value(SetValue {
            route: "/layer/component/brand".to_owned(),
            value: json!("Porsche 911"),
        })
        .unwrap();
        assert_eq!(join.row("vin1").unwrap()[0].effective(), Some(&json!("Porsche 911")));

        let results = join.insert(&fixture.db).unwrap();
        // One new component row, one new layer row, one new cake row.
        assert_eq!(results.len(), 3);
        assert_ne!(results.last().unwrap().hash, fixture.cake_hash);

        let new_cake_hash = results.last().unwrap().hash;
        let reselected = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let rejoined = Join::materialize(fixture.db.storage(), reselected, "cake", &new_cake_hash).unwrap();
        assert_eq!(rejoined.row("vin1").unwrap()[0].effective(), Some(&json!("Porsche 911")));
        assert_eq!(rejoined.row("vin2").unwrap()[0].effective(), Some(&json!("Audi")));

        // The original cake revision is untouched.
        let original = Join::materialize(
            fixture.db.storage(),
            ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap(),
            "cake",
            &fixture.cake_hash,
        )
        .unwrap();
        assert_eq!(original.row("vin1").unwrap()[0].effective(), Some(&json!("Porsche")));
    }

    #[test]
    fn unreferenced_layer_is_rejected() {
        let fixture = build_fixture();
        let selection = ColumnSelection::from_routes(&["/otherLayer/component/brand"], ColumnType::String).unwrap();
        let err = Join::materialize(fixture.db.storage(), selection, "cake", &fixture.cake_hash).unwrap_err();
        assert!(matches!(err, JoinError::LayerNotInCake { .. }));
    }

    #[test]
    fn cake_route_reports_table_and_hash() {
        let fixture = build_fixture();
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let join = Join::materialize(fixture.db.storage(), selection, "cake", &fixture.cake_hash).unwrap();
        assert_eq!(join.cake_route().unwrap(), format!("/cake@{}", fixture.cake_hash));
    }
}
