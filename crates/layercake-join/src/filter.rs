// SPDX-License-Identifier: Apache-2.0
//! Row filtering.

use serde_json::Value;

use crate::cell::{JoinCell, JoinRow};
use crate::error::JoinError;

/// A single column's filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    /// The route of the column this filter applies to.
    pub route: String,
    /// The operator to apply.
    pub operator: FilterOperator,
    /// The operand to compare the cell's effective value against.
    pub operand: Value,
}

/// An operator, scoped by the value kind it's meaningful for. Applying
/// an operator to a value of the wrong kind never matches, rather than
/// erroring — a filter is a predicate, not a type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Numeric/string/boolean equality.
    Equals,
    /// Numeric/string/boolean inequality.
    NotEquals,
    /// Numeric `<`.
    LessThan,
    /// Numeric `<=`.
    LessOrEqual,
    /// Numeric `>`.
    GreaterThan,
    /// Numeric `>=`.
    GreaterOrEqual,
    /// String prefix match.
    StartsWith,
    /// String suffix match.
    EndsWith,
    /// String substring match.
    Contains,
}

impl FilterOperator {
    fn matches(self, actual: &Value, operand: &Value) -> bool {
        match self {
            Self::Equals => actual == operand,
            Self::NotEquals => actual != operand,
            Self::LessThan | Self::LessOrEqual | Self::GreaterThan | Self::GreaterOrEqual => {
                match (actual.as_f64(), operand.as_f64()) {
                    (Some(a), Some(b)) => match self {
                        Self::LessThan => a < b,
                        Self::LessOrEqual => a <= b,
                        Self::GreaterThan => a > b,
                        Self::GreaterOrEqual => a >= b,
                        _ => false,
                    },
                    _ => false,
                }
            }
            Self::StartsWith | Self::EndsWith | Self::Contains => {
                match (actual.as_str(), operand.as_str()) {
                    (Some(a), Some(b)) => match self {
                        Self::StartsWith => a.starts_with(b),
                        Self::EndsWith => a.ends_with(b),
                        Self::Contains => a.contains(b),
                        _ => false,
                    },
                    _ => false,
                }
            }
        }
    }
}

/// `{ columnFilters: [...], operator: 'and'|'or' }`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    /// The per-column predicates to evaluate.
    pub column_filters: Vec<ColumnFilter>,
    /// How column results combine.
    pub operator: RowFilterOperator,
}

/// How a [`RowFilter`]'s column filters combine into a row verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilterOperator {
    /// A row survives iff every column filter's cell matches.
    And,
    /// A row survives iff at least one column filter's cell matches.
    Or,
}

/// Evaluate `filter` against `rows`, given each filtered column's index
/// in the join's current selection.
///
/// # Errors
/// Returns [`JoinError::FilterRouteNotInJoin`] if a column filter names a
/// route not present in `column_index_by_route`.
pub fn apply_row_filter<'a>(
    filter: &RowFilter,
    slice_order: &'a [String],
    rows: &std::collections::BTreeMap<String, JoinRow>,
    column_index_by_route: &std::collections::HashMap<&str, usize>,
) -> Result<Vec<&'a str>, JoinError> {
    let mut resolved = Vec::with_capacity(filter.column_filters.len());
    for cf in &filter.column_filters {
        let idx = column_index_by_route
            .get(cf.route.as_str())
            .copied()
            .ok_or_else(|| JoinError::FilterRouteNotInJoin {
                route: cf.route.clone(),
            })?;
        resolved.push((idx, cf));
    }

    let cell_matches = |row: &JoinRow, idx: usize, cf: &ColumnFilter| -> bool {
        row.get(idx)
            .and_then(JoinCell::effective)
            .is_some_and(|actual| cf.operator.matches(actual, &cf.operand))
    };

    let survivors = slice_order
        .iter()
        .filter(|slice_id| {
            let Some(row) = rows.get(slice_id.as_str()) else {
                return false;
            };
            match filter.operator {
                RowFilterOperator::And => resolved.iter().all(|(idx, cf)| cell_matches(row, *idx, cf)),
                RowFilterOperator::Or => resolved.iter().any(|(idx, cf)| cell_matches(row, *idx, cf)),
            }
        })
        .map(String::as_str)
        .collect();
    Ok(survivors)
}
