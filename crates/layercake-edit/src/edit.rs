// SPDX-License-Identifier: Apache-2.0
//! A single replayable edit: `{ name, action:{ type, data }, _hash }`.
//!
//! [`Edit`] is hashed the same way every other content row is: drop any
//! stale `_hash`, canonicalize, stamp. The action payload's inner types
//! (`RowFilter`, `RowSort`, `SetValue`, `ColumnSelection`) don't derive
//! `serde::Serialize` themselves — like [`layercake_core::InsertHistoryRow`]
//! they're hand-encoded to/from `Value` here, since their shape is driven
//! by this one call site rather than a generic wire format.

use layercake_hash::{calc_hash, rmhsh, with_hash, ContentHash};
use layercake_join::{ColumnFilter, FilterOperator, RowFilter, RowFilterOperator, RowSort, SetValue, SortDirection};
use layercake_select::{Column, ColumnSelection};
use layercake_storage::Row;
use serde_json::{json, Map, Value};

use crate::error::EditError;

/// The four edit kinds a [`crate::EditProcessor`] can dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    /// Opens or reprojects the join's column selection.
    Selection(ColumnSelection),
    /// Narrows the join's visible rows.
    Filter(RowFilter),
    /// Overrides a single column's cells.
    SetValue(SetValue),
    /// Reorders the join's visible rows.
    Sort(RowSort),
}

impl EditAction {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Selection(_) => "selection",
            Self::Filter(_) => "filter",
            Self::SetValue(_) => "setValue",
            Self::Sort(_) => "sort",
        }
    }

    fn data(&self) -> Value {
        match self {
            Self::Selection(selection) => json!(selection.columns()),
            Self::Filter(filter) => encode_row_filter(filter),
            Self::SetValue(set_value) => json!({"route": set_value.route, "value": set_value.value}),
            Self::Sort(sort) => encode_row_sort(sort),
        }
    }

    fn to_value(&self) -> Value {
        json!({"type": self.type_name(), "data": self.data()})
    }

    fn from_value(value: &Value) -> Result<Self, EditError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("action is missing a \"type\" string"))?;
        let data = value
            .get("data")
            .ok_or_else(|| malformed("action is missing a \"data\" field"))?;
        match type_name {
            "selection" => {
                let columns: Vec<Column> =
                    serde_json::from_value(data.clone()).map_err(|e| malformed(&e.to_string()))?;
                Ok(Self::Selection(ColumnSelection::new(columns)?))
            }
            "filter" => Ok(Self::Filter(decode_row_filter(data)?)),
            "setValue" => {
                let route = data
                    .get("route")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("setValue data is missing \"route\""))?
                    .to_owned();
                let value = data
                    .get("value")
                    .cloned()
                    .ok_or_else(|| malformed("setValue data is missing \"value\""))?;
                Ok(Self::SetValue(SetValue { route, value }))
            }
            "sort" => Ok(Self::Sort(decode_row_sort(data)?)),
            other => Err(malformed(&format!("unrecognized edit type {other:?}"))),
        }
    }
}

fn malformed(reason: &str) -> EditError {
    EditError::MalformedAction {
        reason: reason.to_owned(),
    }
}

fn operator_name(operator: FilterOperator) -> &'static str {
    match operator {
        FilterOperator::Equals => "equals",
        FilterOperator::NotEquals => "notEquals",
        FilterOperator::LessThan => "lessThan",
        FilterOperator::LessOrEqual => "lessOrEqual",
        FilterOperator::GreaterThan => "greaterThan",
        FilterOperator::GreaterOrEqual => "greaterOrEqual",
        FilterOperator::StartsWith => "startsWith",
        FilterOperator::EndsWith => "endsWith",
        FilterOperator::Contains => "contains",
    }
}

fn operator_from_name(name: &str) -> Result<FilterOperator, EditError> {
    Ok(match name {
        "equals" => FilterOperator::Equals,
        "notEquals" => FilterOperator::NotEquals,
        "lessThan" => FilterOperator::LessThan,
        "lessOrEqual" => FilterOperator::LessOrEqual,
        "greaterThan" => FilterOperator::GreaterThan,
        "greaterOrEqual" => FilterOperator::GreaterOrEqual,
        "startsWith" => FilterOperator::StartsWith,
        "endsWith" => FilterOperator::EndsWith,
        "contains" => FilterOperator::Contains,
        other => return Err(malformed(&format!("unrecognized filter operator {other:?}"))),
    })
}

fn encode_row_filter(filter: &RowFilter) -> Value {
    let column_filters: Vec<Value> = filter
        .column_filters
        .iter()
        .map(|cf| json!({"route": cf.route, "operator": operator_name(cf.operator), "operand": cf.operand}))
        .collect();
    let operator = match filter.operator {
        RowFilterOperator::And => "and",
        RowFilterOperator::Or => "or",
    };
    json!({"columnFilters": column_filters, "operator": operator})
}

fn decode_row_filter(data: &Value) -> Result<RowFilter, EditError> {
    let column_filters = data
        .get("columnFilters")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("filter data is missing \"columnFilters\""))?;
    let mut decoded = Vec::with_capacity(column_filters.len());
    for cf in column_filters {
        let route = cf
            .get("route")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("column filter is missing \"route\""))?
            .to_owned();
        let operator = cf
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("column filter is missing \"operator\""))?;
        let operand = cf
            .get("operand")
            .cloned()
            .ok_or_else(|| malformed("column filter is missing \"operand\""))?;
        decoded.push(ColumnFilter {
            route,
            operator: operator_from_name(operator)?,
            operand,
        });
    }
    let operator = match data.get("operator").and_then(Value::as_str) {
        Some("and") | None => RowFilterOperator::And,
        Some("or") => RowFilterOperator::Or,
        Some(other) => return Err(malformed(&format!("unrecognized row filter operator {other:?}"))),
    };
    Ok(RowFilter {
        column_filters: decoded,
        operator,
    })
}

fn encode_row_sort(sort: &RowSort) -> Value {
    let keys: Vec<Value> = sort
        .keys()
        .iter()
        .map(|(route, direction)| {
            let direction = match direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            json!({"route": route, "direction": direction})
        })
        .collect();
    Value::Array(keys)
}

fn decode_row_sort(data: &Value) -> Result<RowSort, EditError> {
    let entries = data.as_array().ok_or_else(|| malformed("sort data must be an array"))?;
    let mut keys = Vec::with_capacity(entries.len());
    for entry in entries {
        let route = entry
            .get("route")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("sort key is missing \"route\""))?
            .to_owned();
        let direction = match entry.get("direction").and_then(Value::as_str) {
            Some("asc") | None => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(malformed(&format!("unrecognized sort direction {other:?}"))),
        };
        keys.push((route, direction));
    }
    Ok(RowSort::new(keys))
}

/// `{ name, action:{ type, data }, _hash }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    /// A caller-assigned display name for this edit.
    pub name: String,
    /// The operation this edit applies.
    pub action: EditAction,
}

impl Edit {
    /// Build an edit with the given name and action.
    #[must_use]
    pub fn new(name: impl Into<String>, action: EditAction) -> Self {
        Self { name: name.into(), action }
    }

    fn canonical(&self) -> Value {
        json!({"name": self.name, "action": self.action.to_value()})
    }

    /// This edit's content hash over its non-hash fields.
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        calc_hash(&self.canonical())
    }

    /// Convert to the row shape stored in a `CEdits` table.
    #[must_use]
    pub fn to_row(&self) -> Row {
        let hashed = with_hash(&self.canonical());
        match hashed {
            Value::Object(map) => map,
            _ => unreachable!("canonical() always produces an object"),
        }
    }

    /// Parse back from a stored row.
    ///
    /// # Errors
    /// Returns [`EditError::MalformedAction`] if the row's `action` field
    /// doesn't match a recognized edit type/data shape.
    pub fn from_row(row: &Row) -> Result<Self, EditError> {
        let name = row
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("edit row is missing \"name\""))?
            .to_owned();
        let action_value = row.get("action").ok_or_else(|| malformed("edit row is missing \"action\""))?;
        let action = EditAction::from_value(action_value)?;
        Ok(Self { name, action })
    }
}

/// `rmhsh` applied to a [`Map`] the way [`layercake_hash::rmhsh`] would a
/// whole [`Value`] — used by callers that already hold a row and want its
/// canonical, hash-free form without re-wrapping it in `Value::Object`
/// first.
#[must_use]
pub fn rmhsh_row(row: &Row) -> Map<String, Value> {
    match rmhsh(&Value::Object(row.clone())) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use layercake_storage::ColumnType;

    #[test]
    fn selection_edit_round_trips_through_a_row() {
        let selection = ColumnSelection::from_routes(&["/layer/component/brand"], ColumnType::String).unwrap();
        let edit = Edit::new("pick brand", EditAction::Selection(selection.clone()));
        let row = edit.to_row();
        let back = Edit::from_row(&row).unwrap();
        assert_eq!(edit, back);
        assert!(row.contains_key("_hash"));
    }

    #[test]
    fn filter_edit_round_trips_through_a_row() {
        let filter = RowFilter {
            column_filters: vec![ColumnFilter {
                route: "/layer/component/brand".to_owned(),
                operator: FilterOperator::Equals,
                operand: json!("Audi"),
            }],
            operator: RowFilterOperator::And,
        };
        let edit = Edit::new("only audi", EditAction::Filter(filter));
        let row = edit.to_row();
        let back = Edit::from_row(&row).unwrap();
        assert_eq!(edit, back);
    }

    #[test]
    fn sort_edit_round_trips_through_a_row() {
        let sort = RowSort::new(vec![("/layer/component/brand".to_owned(), SortDirection::Desc)]);
        let edit = Edit::new("sort brand desc", EditAction::Sort(sort));
        let row = edit.to_row();
        let back = Edit::from_row(&row).unwrap();
        assert_eq!(edit, back);
    }

    #[test]
    fn set_value_edit_round_trips_through_a_row() {
        let set_value = SetValue {
            route: "/layer/component/brand".to_owned(),
            value: json!("Porsche 911"),
        };
        let edit = Edit::new("rename", EditAction::SetValue(set_value));
        let row = edit.to_row();
        let back = Edit::from_row(&row).unwrap();
        assert_eq!(edit, back);
    }

    #[test]
    fn identical_edits_collapse_to_the_same_hash() {
        let a = Edit::new("x", EditAction::SetValue(SetValue { route: "/r".to_owned(), value: json!(1) }));
        let b = Edit::new("x", EditAction::SetValue(SetValue { route: "/r".to_owned(), value: json!(1) }));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn unrecognized_action_type_is_rejected() {
        let mut row = Row::new();
        row.insert("name".to_owned(), json!("bad"));
        row.insert("action".to_owned(), json!({"type": "unknown", "data": {}}));
        let err = Edit::from_row(&row).unwrap_err();
        assert!(matches!(err, EditError::MalformedAction { .. }));
    }
}
