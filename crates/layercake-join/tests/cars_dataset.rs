// SPDX-License-Identifier: Apache-2.0
//! End-to-end join behavior over an eight-row, four-brand dataset:
//! filtering down to one brand, and sorting the whole set descending.
#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use layercake_core::{Db, InsertSpec};
use layercake_hash::{ContentHash, Route};
use layercake_join::{ColumnFilter, FilterOperator, Join, RowFilter, RowFilterOperator, RowSort, SortDirection};
use layercake_select::ColumnSelection;
use layercake_storage::{ColumnType, ContentKind, MemoryGateway, TableCfg};
use serde_json::json;

fn declare(db: &Db<MemoryGateway>, table: &str, kind: ContentKind) {
    db.storage()
        .borrow_mut()
        .create_or_extend_table(TableCfg::new(table, kind).with_column("value", ColumnType::JsonValue))
        .unwrap();
}

const CARS: &[(&str, &str, i64)] = &[
    ("vin1", "Audi", 4),
    ("vin2", "Audi", 2),
    ("vin3", "BMW", 4),
    ("vin4", "BMW", 2),
    ("vin5", "Tesla", 4),
    ("vin6", "Tesla", 2),
    ("vin7", "Volkswagen", 4),
    ("vin8", "Volkswagen", 2),
];

fn build_cake() -> (Db<MemoryGateway>, ContentHash) {
    let db = Db::new(Rc::new(RefCell::new(MemoryGateway::new())));
    declare(&db, "carGeneral", ContentKind::Components);
    declare(&db, "carGeneralLayer", ContentKind::Layers);
    declare(&db, "carCake", ContentKind::Cakes);
    declare(&db, "carCakeSliceIds", ContentKind::SliceIds);

    let mut mapping = serde_json::Map::new();
    for (vin, brand, doors) in CARS {
        let result = db
            .insert(InsertSpec::new(
                Route::from_flat("/carGeneral").unwrap(),
                json!({"brand": brand, "doors": doors}),
            ))
            .unwrap();
        mapping.insert((*vin).to_owned(), json!(result.hash.to_string()));
    }

    let slice_ids = db
        .insert(InsertSpec::new(
            Route::from_flat("/carCakeSliceIds").unwrap(),
            json!({"add": CARS.iter().map(|(vin, _, _)| *vin).collect::<Vec<_>>()}),
        ))
        .unwrap();

    let layer = db
        .insert(InsertSpec::new(
            Route::from_flat("/carGeneralLayer").unwrap(),
            json!({"mapping": mapping, "sliceIdsRef": slice_ids.hash.to_string()}),
        ))
        .unwrap();

    let cake = db
        .insert(InsertSpec::new(
            Route::from_flat("/carCake").unwrap(),
            json!({
                "layers": {"carGeneralLayer": layer.hash.to_string()},
                "sliceIdsRef": slice_ids.hash.to_string(),
            }),
        ))
        .unwrap();

    (db, cake.hash)
}

#[test]
fn filtering_by_brand_keeps_only_matching_rows() {
    let (db, cake_hash) = build_cake();
    let selection =
        ColumnSelection::from_routes(&["/carGeneralLayer/carGeneral/brand"], ColumnType::String).unwrap();
    let mut join = Join::materialize(db.storage(), selection, "carCake", &cake_hash).unwrap();

    join.filter(RowFilter {
        column_filters: vec![ColumnFilter {
            route: "/carGeneralLayer/carGeneral/brand".to_owned(),
            operator: FilterOperator::Equals,
            operand: json!("Audi"),
        }],
        operator: RowFilterOperator::And,
    })
    .unwrap();

    let rows = join.rows();
    assert_eq!(rows, vec![vec![Some(json!("Audi"))], vec![Some(json!("Audi"))]]);
    assert_eq!(join.row_count(), 2);
}

#[test]
fn sorting_descending_orders_every_brand_group() {
    let (db, cake_hash) = build_cake();
    let selection =
        ColumnSelection::from_routes(&["/carGeneralLayer/carGeneral/brand"], ColumnType::String).unwrap();
    let mut join = Join::materialize(db.storage(), selection, "carCake", &cake_hash).unwrap();

    join.sort(RowSort::new(vec![(
        "/carGeneralLayer/carGeneral/brand".to_owned(),
        SortDirection::Desc,
    )]))
    .unwrap();

    let brands: Vec<_> = join.rows().into_iter().map(|row| row[0].clone()).collect();
    assert_eq!(
        brands,
        vec![
            Some(json!("Volkswagen")),
            Some(json!("Volkswagen")),
            Some(json!("Tesla")),
            Some(json!("Tesla")),
            Some(json!("BMW")),
            Some(json!("BMW")),
            Some(json!("Audi")),
            Some(json!("Audi")),
        ]
    );
}
