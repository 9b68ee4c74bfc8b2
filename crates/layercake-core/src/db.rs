// SPDX-License-Identifier: Apache-2.0
//! The catalog store core: `get`, `insert`, observer registration,
//! insert-history queries, and the query cache.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use layercake_hash::{generate_time_id, ContentHash, Route, RouteRef};
use layercake_notify::{NotifyBus, Observer, SubscriptionId};
use layercake_storage::{ContentKind, Rljson, StorageGateway, TableCfg, TableData, Where};
use serde_json::{json, Map, Value};

use crate::controller::controller_for;
use crate::error::CoreError;
use crate::history::InsertHistoryRow;

/// Everything an `insert` call needs beyond the target route.
#[derive(Debug, Clone)]
pub struct InsertSpec {
    /// Where to insert. A multi-segment route nests child inserts; see
    /// the module docs on [`layercake_hash::Route`] for the traversal
    /// direction.
    pub route: Route,
    /// The value to insert. Nested child records are addressed by a field
    /// named after the next segment's table key.
    pub value: Value,
    /// The writer's origin token, recorded on the insert-history row.
    pub origin: Option<String>,
    /// Whether this insert should be marked acknowledged immediately
    /// (used by sync replay, which applies already-acked remote inserts).
    pub acknowledged: Option<bool>,
    /// Explicit predecessors this insert supersedes. Not auto-filled from
    /// the latest tip — callers that want a non-empty chain must supply
    /// either this field or a route-level `@timeId` ref.
    pub previous: Option<Vec<String>>,
}

impl InsertSpec {
    /// A bare insert with no origin, ack, or explicit predecessors.
    #[must_use]
    pub fn new(route: Route, value: Value) -> Self {
        Self {
            route,
            value,
            origin: None,
            acknowledged: None,
            previous: None,
        }
    }
}

/// The outcome of a successful [`Db::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertResult {
    /// The hash of the row written at the insert's target segment (the
    /// outermost/root table of the route, after every nested child has
    /// been written and substituted in).
    pub hash: ContentHash,
    /// The `timeId` of the insert-history row written for the root
    /// segment.
    pub time_id: String,
}

type CacheKey = (String, String);

/// The catalog store itself, generic over its storage backend.
///
/// `!Send`/`!Sync` by construction: internals are `Rc<RefCell<_>>`, not
/// `Arc<Mutex<_>>>`, matching the single-threaded cooperative concurrency
/// model this core is specified against.
pub struct Db<G: StorageGateway> {
    storage: Rc<RefCell<G>>,
    notify: NotifyBus,
    cache: RefCell<BTreeMap<CacheKey, Rljson>>,
    origin: String,
}

impl<G: StorageGateway> Db<G> {
    /// Build a `Db` over `storage` with a freshly generated origin token.
    #[must_use]
    pub fn new(storage: Rc<RefCell<G>>) -> Self {
        Self::with_origin(storage, crate::origin::generate_origin())
    }

    /// Build a `Db` with a caller-supplied origin token (sync replay uses
    /// this to resume a peer's identity across restarts).
    #[must_use]
    pub fn with_origin(storage: Rc<RefCell<G>>, origin: String) -> Self {
        Self {
            storage,
            notify: NotifyBus::new(),
            cache: RefCell::new(BTreeMap::new()),
            origin,
        }
    }

    /// This instance's origin token.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Share the underlying storage handle, e.g. to build another `Db` or
    /// a `Connector` over the same backend.
    #[must_use]
    pub fn storage(&self) -> Rc<RefCell<G>> {
        Rc::clone(&self.storage)
    }

    /// Replace the whole query cache. Spec.md §9 calls for an explicit
    /// `setCache` rather than a process-wide singleton, mainly so tests
    /// can seed or inspect it.
    pub fn set_cache(&self, cache: BTreeMap<CacheKey, Rljson>) {
        *self.cache.borrow_mut() = cache;
    }

    /// Subscribe to inserts on `route_flat` (and, implicitly, on every
    /// ancestor-equivalent prefix route that gets its own insert-history
    /// row — see [`Self::insert`]).
    pub fn register_observer(&self, route_flat: impl Into<String>, observer: Observer) -> SubscriptionId {
        self.notify.register(route_flat, observer)
    }

    /// Remove a previously registered observer.
    pub fn unregister_observer(&self, id: SubscriptionId) {
        self.notify.unregister(id);
    }

    /// Resolve `route` against `where_`, walking outermost segment first
    /// and recursing into named children (see the route traversal-
    /// direction note in [`layercake_hash::route`]).
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if a named table doesn't exist, or
    /// [`CoreError::RefNotFound`] if a segment's `@timeId` ref doesn't
    /// resolve.
    pub fn get(&self, route: &Route, where_: &Where) -> Result<Rljson, CoreError> {
        let cache_key = (
            route.flat(),
            serde_json::to_string(where_).unwrap_or_default(),
        );
        if let Some(cached) = self.cache.borrow().get(&cache_key) {
            return Ok(cached.clone());
        }
        let result = self.get_at(route, 0, where_.clone())?;
        self.cache.borrow_mut().insert(cache_key, result.clone());
        Ok(result)
    }

    fn get_at(&self, route: &Route, depth: usize, where_: Where) -> Result<Rljson, CoreError> {
        let segments = route.segments();
        let current = &segments[depth];
        let table = current.table_key();

        let mut combined_where = where_;
        if let Some(route_ref) = current.route_ref() {
            let hash_hex = match route_ref {
                RouteRef::Hash(h) => h.to_string(),
                RouteRef::TimeId(t) => self.resolve_time_id(table, t)?,
            };
            combined_where.insert(layercake_hash::HASH_FIELD.to_owned(), json!(hash_hex));
        }

        let read = {
            let storage = self.storage.borrow();
            storage.read_rows(table, &combined_where)?
        };

        let mut merged = read.clone();
        if depth + 1 < segments.len() {
            let child_table = segments[depth + 1].table_key();
            if let Some(table_data) = read.get(table) {
                for row in &table_data.data {
                    let Some(hash) = row.get(layercake_hash::HASH_FIELD).and_then(Value::as_str)
                    else {
                        continue;
                    };
                    let mut child_where = Where::new();
                    child_where.insert(format!("{child_table}Ref"), json!(hash));
                    let child_result = self.get_at(route, depth + 1, child_where)?;
                    merge_rljson(&mut merged, child_result);
                }
            }
        }
        Ok(merged)
    }

    fn resolve_time_id(&self, table: &str, time_id: &str) -> Result<String, CoreError> {
        let history_table = InsertHistoryRow::history_table_name(table);
        let mut where_ = Where::new();
        where_.insert("timeId".to_owned(), json!(time_id));
        let not_found = || CoreError::RefNotFound {
            route: table.to_owned(),
            reference: time_id.to_owned(),
        };
        let found = {
            let storage = self.storage.borrow();
            if !storage.table_exists(&history_table) {
                return Err(not_found());
            }
            storage.read_rows(&history_table, &where_)?
        };
        let rows = found.get(&history_table).map(|td| td.data.clone()).unwrap_or_default();
        let last = rows.last().ok_or_else(not_found)?;
        last.get(format!("{table}Ref"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(not_found)
    }

    /// Insert `spec.value` at `spec.route`, recursing into nested child
    /// records first. Returns the hash written at the route's outermost
    /// (root) segment.
    ///
    /// # Errors
    /// Returns [`CoreError::InsertValueNotAnObject`]/
    /// [`CoreError::MissingChildValue`] if `spec.value` doesn't nest a
    /// field for every non-leaf segment, [`CoreError::UnsupportedKind`] if
    /// a segment names a `trees` table, or a propagated storage error.
    pub fn insert(&self, spec: InsertSpec) -> Result<InsertResult, CoreError> {
        let hash = self.insert_at(
            &spec.route,
            0,
            spec.value,
            spec.origin.as_deref(),
            spec.acknowledged,
            spec.previous,
        )?;
        // Stored rows are immutable, so a stale cache entry is never wrong,
        // only incomplete. Evicting on every insert keeps it compact rather
        // than tracking which keys the new write could have affected.
        self.cache.borrow_mut().clear();
        let root_table = spec.route.root().table_key();
        let history_table = InsertHistoryRow::history_table_name(root_table);
        let time_id = self
            .last_time_id_for_hash(&history_table, root_table, &hash.to_string())
            .unwrap_or_default();
        Ok(InsertResult { hash, time_id })
    }

    fn last_time_id_for_hash(&self, history_table: &str, table: &str, hash_hex: &str) -> Option<String> {
        let storage = self.storage.borrow();
        let mut where_ = Where::new();
        where_.insert(format!("{table}Ref"), json!(hash_hex));
        let found = storage.read_rows(history_table, &where_).ok()?;
        found
            .get(history_table)?
            .data
            .last()?
            .get("timeId")?
            .as_str()
            .map(ToOwned::to_owned)
    }

    fn insert_at(
        &self,
        full_route: &Route,
        depth: usize,
        value: Value,
        origin: Option<&str>,
        acknowledged: Option<bool>,
        previous: Option<Vec<String>>,
    ) -> Result<ContentHash, CoreError> {
        let segments = full_route.segments();
        let table = segments[depth].table_key();

        let value = if depth + 1 < segments.len() {
            let child_table = segments[depth + 1].table_key();
            let mut obj = match value {
                Value::Object(map) => map,
                _ => {
                    return Err(CoreError::InsertValueNotAnObject {
                        route: full_route.flat(),
                    })
                }
            };
            let child_value = obj.remove(child_table).ok_or_else(|| CoreError::MissingChildValue {
                route: full_route.flat(),
                field: child_table.to_owned(),
            })?;

            let child_kind = {
                let storage = self.storage.borrow();
                storage.content_type(child_table)?
            };

            // A layer segment with a further child beyond it addresses a
            // fan-out: the field named after the layer isn't one nested
            // record, it's a sliceId -> leaf-value map. Each entry recurses
            // straight to the leaf segment, and this call synthesizes the
            // layer (and its slice-id set) from the results, rather than
            // expecting the caller to have built the layer row by hand.
            if child_kind == ContentKind::Layers && depth + 2 < segments.len() {
                let slice_map = match child_value {
                    Value::Object(map) => map,
                    _ => {
                        return Err(CoreError::InsertValueNotAnObject {
                            route: full_route.flat(),
                        })
                    }
                };
                let mut mapping = Map::new();
                let mut slice_ids = Vec::with_capacity(slice_map.len());
                for (slice_id, leaf_value) in slice_map {
                    let leaf_hash = self.insert_at(full_route, depth + 2, leaf_value, origin, None, None)?;
                    mapping.insert(slice_id.clone(), json!(leaf_hash.to_string()));
                    slice_ids.push(Value::String(slice_id));
                }

                let slice_ids_table = format!("{table}SliceIds");
                let slice_ids_hash = self.write_side_table(&slice_ids_table, json!({ "add": slice_ids }), origin)?;

                let layer_value = json!({
                    "mapping": Value::Object(mapping),
                    "sliceIdsRef": slice_ids_hash.to_string(),
                });
                let layer_hash = self.finish_write(full_route, depth + 1, layer_value, origin, None, None)?;

                let layers_entry = obj
                    .entry("layers".to_owned())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(layers_map) = layers_entry else {
                    return Err(CoreError::InsertValueNotAnObject {
                        route: full_route.flat(),
                    });
                };
                layers_map.insert(child_table.to_owned(), json!(layer_hash.to_string()));
                obj.entry("sliceIdsRef".to_owned())
                    .or_insert_with(|| json!(slice_ids_hash.to_string()));
            } else {
                let child_hash = self.insert_at(full_route, depth + 1, child_value, origin, None, None)?;
                obj.insert(format!("{child_table}Ref"), json!(child_hash.to_string()));
            }
            Value::Object(obj)
        } else {
            value
        };

        self.finish_write(full_route, depth, value, origin, acknowledged, previous)
    }

    /// Validate, hash, and write the row named by `full_route.segments()[depth]`,
    /// recording its insert-history row and notifying its own prefix route
    /// plus the full insert route.
    fn finish_write(
        &self,
        full_route: &Route,
        depth: usize,
        value: Value,
        origin: Option<&str>,
        acknowledged: Option<bool>,
        previous: Option<Vec<String>>,
    ) -> Result<ContentHash, CoreError> {
        let segments = full_route.segments();
        let current = &segments[depth];
        let table = current.table_key();

        let kind = {
            let storage = self.storage.borrow();
            storage.content_type(table)?
        };
        if kind == ContentKind::Trees {
            return Err(CoreError::UnsupportedKind {
                kind: "trees".to_owned(),
            });
        }
        let controller = controller_for(kind);
        let row = controller.prepare_row(&full_route.flat(), value)?;
        let hash_hex = row
            .get(layercake_hash::HASH_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let hash = ContentHash::from_hex(&hash_hex).unwrap_or_else(|| ContentHash::from_bytes([0; 32]));

        {
            let mut storage = self.storage.borrow_mut();
            let mut write_data = Rljson::new();
            write_data.insert(table.to_owned(), TableData { content_kind: kind, data: vec![row] });
            storage.write(&write_data)?;
        }

        let resolved_previous = previous.or_else(|| match current.route_ref() {
            Some(RouteRef::TimeId(t)) => Some(vec![t.clone()]),
            _ => None,
        });
        let time_id = generate_time_id();
        let history_row = InsertHistoryRow {
            time_id,
            table: table.to_owned(),
            hash_hex,
            route: full_route.flat(),
            previous: resolved_previous,
            origin: origin.map(ToOwned::to_owned),
            acknowledged,
        };
        let history_table = InsertHistoryRow::history_table_name(table);
        {
            let mut storage = self.storage.borrow_mut();
            storage.create_or_extend_table(TableCfg::new(history_table.clone(), ContentKind::InsertHistory))?;
            let mut hwrite = Rljson::new();
            hwrite.insert(
                history_table,
                TableData {
                    content_kind: ContentKind::InsertHistory,
                    data: vec![history_row.to_row()],
                },
            );
            storage.write(&hwrite)?;
        }

        let payload = Value::Object(history_row.to_row());
        let mut notified_routes = BTreeSet::new();
        if let Ok(own_route) = Route::new(segments[0..=depth].to_vec(), None) {
            notified_routes.insert(own_route.flat());
        }
        notified_routes.insert(full_route.flat());
        for route_flat in notified_routes {
            self.notify.notify(&route_flat, &payload);
        }

        Ok(hash)
    }

    /// Write a row for a table not addressed by any route segment — the
    /// `{owner}SliceIds` side table synthesized while fanning a layer's
    /// components out. Gets its own insert-history row, but only notifies
    /// observers on its own route, since it isn't part of the caller's
    /// insert route.
    fn write_side_table(&self, table: &str, value: Value, origin: Option<&str>) -> Result<ContentHash, CoreError> {
        let kind = {
            let storage = self.storage.borrow();
            storage.content_type(table)?
        };
        let route_flat = format!("/{table}");
        let controller = controller_for(kind);
        let row = controller.prepare_row(&route_flat, value)?;
        let hash_hex = row
            .get(layercake_hash::HASH_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let hash = ContentHash::from_hex(&hash_hex).unwrap_or_else(|| ContentHash::from_bytes([0; 32]));

        {
            let mut storage = self.storage.borrow_mut();
            let mut write_data = Rljson::new();
            write_data.insert(table.to_owned(), TableData { content_kind: kind, data: vec![row] });
            storage.write(&write_data)?;
        }

        let history_row = InsertHistoryRow {
            time_id: generate_time_id(),
            table: table.to_owned(),
            hash_hex,
            route: route_flat.clone(),
            previous: None,
            origin: origin.map(ToOwned::to_owned),
            acknowledged: None,
        };
        let history_table = InsertHistoryRow::history_table_name(table);
        {
            let mut storage = self.storage.borrow_mut();
            storage.create_or_extend_table(TableCfg::new(history_table.clone(), ContentKind::InsertHistory))?;
            let mut hwrite = Rljson::new();
            hwrite.insert(
                history_table,
                TableData {
                    content_kind: ContentKind::InsertHistory,
                    data: vec![history_row.to_row()],
                },
            );
            storage.write(&hwrite)?;
        }

        self.notify.notify(&route_flat, &Value::Object(history_row.to_row()));
        Ok(hash)
    }

    /// Every insert-history row for `table`, optionally sorted by the
    /// numeric prefix of `timeId`.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if `table`'s history table doesn't
    /// exist.
    pub fn get_insert_history(
        &self,
        table: &str,
        sorted: bool,
        ascending: bool,
    ) -> Result<Vec<InsertHistoryRow>, CoreError> {
        let history_table = InsertHistoryRow::history_table_name(table);
        let storage = self.storage.borrow();
        let dumped = storage.dump_table(&history_table)?;
        drop(storage);
        let mut rows: Vec<InsertHistoryRow> = dumped
            .get(&history_table)
            .map(|td| td.data.iter().filter_map(|r| InsertHistoryRow::from_row(table, r)).collect())
            .unwrap_or_default();
        if sorted {
            crate::history::sort_by_time_id(&mut rows, ascending);
        }
        Ok(rows)
    }

    /// Every insert-history row recording an insert of `ref_hash`.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if `table`'s history table doesn't
    /// exist.
    pub fn get_insert_history_rows_by_ref(
        &self,
        table: &str,
        ref_hash: &str,
    ) -> Result<Vec<InsertHistoryRow>, CoreError> {
        Ok(self
            .get_insert_history(table, false, true)?
            .into_iter()
            .filter(|r| r.hash_hex == ref_hash)
            .collect())
    }

    /// The insert-history row for a specific `timeId`, if any.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if `table`'s history table doesn't
    /// exist.
    pub fn get_insert_history_row_by_time_id(
        &self,
        table: &str,
        time_id: &str,
    ) -> Result<Option<InsertHistoryRow>, CoreError> {
        Ok(self
            .get_insert_history(table, false, true)?
            .into_iter()
            .find(|r| r.time_id == time_id))
    }

    /// Every `timeId` that recorded an insert of `ref_hash`.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if `table`'s history table doesn't
    /// exist.
    pub fn get_time_ids_for_ref(&self, table: &str, ref_hash: &str) -> Result<Vec<String>, CoreError> {
        Ok(self
            .get_insert_history_rows_by_ref(table, ref_hash)?
            .into_iter()
            .map(|r| r.time_id)
            .collect())
    }

    /// The hash a specific `timeId` recorded an insert of, if any.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] if `table`'s history table doesn't
    /// exist.
    pub fn get_ref_of_time_id(&self, table: &str, time_id: &str) -> Result<Option<String>, CoreError> {
        Ok(self
            .get_insert_history_row_by_time_id(table, time_id)?
            .map(|r| r.hash_hex))
    }
}

fn merge_rljson(into: &mut Rljson, other: Rljson) {
    for (table, data) in other {
        into.entry(table)
            .and_modify(|existing| existing.data.extend(data.data.clone()))
            .or_insert(data);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use layercake_storage::{ColumnType, MemoryGateway};
    use serde_json::json;

    fn new_db() -> Db<MemoryGateway> {
        Db::new(Rc::new(RefCell::new(MemoryGateway::new())))
    }

    fn declare(db: &Db<MemoryGateway>, table: &str, kind: ContentKind) {
        db.storage()
            .borrow_mut()
            .create_or_extend_table(TableCfg::new(table, kind).with_column("value", ColumnType::JsonValue))
            .unwrap();
    }

    #[test]
    fn insert_then_get_round_trips() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);

        let route = Route::from_flat("/carGeneral").unwrap();
        let result = db
            .insert(InsertSpec::new(route.clone(), json!({"brand": "Porsche"})))
            .unwrap();

        let found = db.get(&route, &Where::new()).unwrap();
        let rows = &found["carGeneral"].data;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("_hash").and_then(Value::as_str),
            Some(result.hash.to_string().as_str())
        );
    }

    #[test]
    fn insert_writes_history_row() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        let route = Route::from_flat("/carGeneral").unwrap();
        db.insert(InsertSpec::new(route, json!({"brand": "Audi"}))).unwrap();

        let history = db.get_insert_history("carGeneral", true, true).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].table, "carGeneral");
    }

    #[test]
    fn nested_insert_substitutes_child_hash() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        declare(&db, "carGeneralLayer", ContentKind::Layers);

        let route = Route::from_flat("/carGeneralLayer/carGeneral").unwrap();
        let value = json!({
            "carGeneral": {"brand": "Porsche"},
            "sliceId": "VIN1",
        });
        db.insert(InsertSpec::new(route.clone(), value)).unwrap();

        let found = db.get(&route, &Where::new()).unwrap();
        let layer_row = &found["carGeneralLayer"].data[0];
        assert!(layer_row.contains_key("carGeneralRef"));
        assert!(!layer_row.contains_key("carGeneral"));
    }

    #[test]
    fn nested_fan_out_insert_builds_layer_from_multiple_components() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        declare(&db, "carGeneralLayer", ContentKind::Layers);
        declare(&db, "carCake", ContentKind::Cakes);
        declare(&db, "carCakeSliceIds", ContentKind::SliceIds);

        let route = Route::from_flat("/carCake/carGeneralLayer/carGeneral").unwrap();
        let value = json!({
            "carGeneralLayer": {
                "VIN5": {"brand": "Porsche", "doors": 2, "type": "911 Carrera 4S"},
                "VIN6": {"brand": "Mercedes Benz", "doors": 4, "type": "EQE 350+"},
            },
        });

        let notify_count = Rc::new(RefCell::new(0usize));
        let notify_count_clone = Rc::clone(&notify_count);
        db.register_observer(
            route.flat(),
            Box::new(move |_route, _payload| {
                *notify_count_clone.borrow_mut() += 1;
                Ok(())
            }),
        );

        db.insert(InsertSpec::new(route, value)).unwrap();
        // Two components, one layer, one cake: four writes on the insert
        // route. The synthesized sliceIds write doesn't count — it isn't
        // one of the route's own segments.
        assert_eq!(*notify_count.borrow(), 4);

        let dumped = db.storage().borrow().dump();
        let components = &dumped["carGeneral"].data;
        assert_eq!(components.len(), 2);

        let layer_row = &dumped["carGeneralLayer"].data[0];
        let mapping = layer_row.get("mapping").and_then(Value::as_object).unwrap();
        assert_eq!(mapping.len(), 2);
        let component_hashes: std::collections::BTreeSet<&str> =
            components.iter().filter_map(|r| r.get("_hash").and_then(Value::as_str)).collect();
        assert_eq!(mapping.get("VIN5").and_then(Value::as_str).map(|h| component_hashes.contains(h)), Some(true));
        assert_eq!(mapping.get("VIN6").and_then(Value::as_str).map(|h| component_hashes.contains(h)), Some(true));

        let slice_ids_row = &dumped["carCakeSliceIds"].data[0];
        let add = slice_ids_row.get("add").and_then(Value::as_array).unwrap();
        let add_ids: Vec<&str> = add.iter().filter_map(Value::as_str).collect();
        assert_eq!(add_ids, vec!["VIN5", "VIN6"]);

        let cake_row = &dumped["carCake"].data[0];
        let layer_hash = layer_row.get("_hash").and_then(Value::as_str).unwrap();
        let cake_layers = cake_row.get("layers").and_then(Value::as_object).unwrap();
        assert_eq!(cake_layers.get("carGeneralLayer").and_then(Value::as_str), Some(layer_hash));
        assert_eq!(cake_row.get("sliceIdsRef").and_then(Value::as_str), Some(slice_ids_row.get("_hash").and_then(Value::as_str).unwrap()));
    }

    #[test]
    fn duplicate_content_collapses_to_one_row() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        let route = Route::from_flat("/carGeneral").unwrap();
        let a = db
            .insert(InsertSpec::new(route.clone(), json!({"brand": "Porsche"})))
            .unwrap();
        let b = db
            .insert(InsertSpec::new(route.clone(), json!({"brand": "Porsche"})))
            .unwrap();
        assert_eq!(a.hash, b.hash);

        let found = db.get(&route, &Where::new()).unwrap();
        assert_eq!(found["carGeneral"].data.len(), 1);
    }

    #[test]
    fn observer_fires_on_insert() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        let route = Route::from_flat("/carGeneral").unwrap();

        let fired = Rc::new(RefCell::new(false));
        let fired_clone = Rc::clone(&fired);
        db.register_observer(
            route.flat(),
            Box::new(move |_route, _payload| {
                *fired_clone.borrow_mut() = true;
                Ok(())
            }),
        );
        db.insert(InsertSpec::new(route, json!({"brand": "Audi"}))).unwrap();
        assert!(*fired.borrow());
    }

    #[test]
    fn unknown_table_is_not_found() {
        let db = new_db();
        let route = Route::from_flat("/carGeneral").unwrap();
        let err = db.insert(InsertSpec::new(route, json!({"brand": "Audi"}))).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn time_id_ref_resolves_through_history() {
        let db = new_db();
        declare(&db, "carGeneral", ContentKind::Components);
        let route = Route::from_flat("/carGeneral").unwrap();
        let result = db.insert(InsertSpec::new(route, json!({"brand": "Audi"}))).unwrap();

        let ref_route = Route::from_flat(&format!("/carGeneral@{}", result.time_id)).unwrap();
        let found = db.get(&ref_route, &Where::new()).unwrap();
        assert_eq!(found["carGeneral"].data.len(), 1);
    }
}
