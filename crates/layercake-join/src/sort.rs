// SPDX-License-Identifier: Apache-2.0
//! Row sorting.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::cell::{JoinCell, JoinRow};
use crate::error::JoinError;

/// A single sort key's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// A mapping from route to direction. Key order is primary/secondary/...
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSort {
    keys: Vec<(String, SortDirection)>,
}

impl RowSort {
    /// Build a sort from an ordered list of `(route, direction)` pairs.
    #[must_use]
    pub fn new(keys: Vec<(String, SortDirection)>) -> Self {
        Self { keys }
    }

    /// The sort's `(route, direction)` keys, primary first.
    #[must_use]
    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// Stable-sort `slice_order` by this sort's keys, resolving each key
    /// against `rows` via `column_index_by_route`.
    ///
    /// # Errors
    /// Returns [`JoinError::FilterRouteNotInJoin`] if a key names a route
    /// not present in `column_index_by_route` (the sort and filter
    /// "route not in join" failures share a kind: both are a column
    /// reference the current selection doesn't have).
    pub fn apply_to(
        &self,
        slice_order: &[String],
        rows: &std::collections::BTreeMap<String, JoinRow>,
        column_index_by_route: &HashMap<&str, usize>,
    ) -> Result<Vec<String>, JoinError> {
        let mut resolved = Vec::with_capacity(self.keys.len());
        for (route, direction) in &self.keys {
            let idx = column_index_by_route
                .get(route.as_str())
                .copied()
                .ok_or_else(|| JoinError::FilterRouteNotInJoin { route: route.clone() })?;
            resolved.push((idx, *direction));
        }

        let mut out: Vec<String> = slice_order.to_vec();
        out.sort_by(|a, b| {
            let row_a = rows.get(a);
            let row_b = rows.get(b);
            for (idx, direction) in &resolved {
                let va = row_a.and_then(|r| r.get(*idx)).and_then(JoinCell::effective);
                let vb = row_b.and_then(|r| r.get(*idx)).and_then(JoinCell::effective);
                let ord = compare_values(va, vb);
                let ord = match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(out)
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
                return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            }
            if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
                return a.cmp(b);
            }
            if let (Some(a), Some(b)) = (a.as_bool(), b.as_bool()) {
                return a.cmp(&b);
            }
            Ordering::Equal
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn row(brand: &str, doors: i64) -> JoinRow {
        vec![
            JoinCell::from_value(Some(json!(brand))),
            JoinCell::from_value(Some(json!(doors))),
        ]
    }

    #[test]
    fn sorts_ascending_by_single_key() {
        let mut rows = BTreeMap::new();
        rows.insert("vin1".to_owned(), row("Porsche", 4));
        rows.insert("vin2".to_owned(), row("Audi", 2));
        let slice_order = vec!["vin1".to_owned(), "vin2".to_owned()];
        let mut index = HashMap::new();
        index.insert("/brand", 0);

        let sort = RowSort::new(vec![("/brand".to_owned(), SortDirection::Asc)]);
        let sorted = sort.apply_to(&slice_order, &rows, &index).unwrap();
        assert_eq!(sorted, vec!["vin2", "vin1"]);
    }

    #[test]
    fn ties_fall_through_to_secondary_key() {
        let mut rows = BTreeMap::new();
        rows.insert("vin1".to_owned(), row("Porsche", 4));
        rows.insert("vin2".to_owned(), row("Porsche", 2));
        let slice_order = vec!["vin1".to_owned(), "vin2".to_owned()];
        let mut index = HashMap::new();
        index.insert("/brand", 0);
        index.insert("/doors", 1);

        let sort = RowSort::new(vec![
            ("/brand".to_owned(), SortDirection::Asc),
            ("/doors".to_owned(), SortDirection::Asc),
        ]);
        let sorted = sort.apply_to(&slice_order, &rows, &index).unwrap();
        assert_eq!(sorted, vec!["vin2", "vin1"]);
    }

    #[test]
    fn rows_tied_on_every_key_keep_their_original_relative_order() {
        let mut rows = BTreeMap::new();
        rows.insert("vin3".to_owned(), row("Porsche", 4));
        rows.insert("vin1".to_owned(), row("Porsche", 4));
        rows.insert("vin2".to_owned(), row("Porsche", 4));
        let slice_order = vec!["vin3".to_owned(), "vin1".to_owned(), "vin2".to_owned()];
        let mut index = HashMap::new();
        index.insert("/brand", 0);

        let sort = RowSort::new(vec![("/brand".to_owned(), SortDirection::Asc)]);
        let sorted = sort.apply_to(&slice_order, &rows, &index).unwrap();
        assert_eq!(sorted, slice_order);
    }
}
