// SPDX-License-Identifier: Apache-2.0
//! `setValue`/`setValues`.

use serde_json::Value;

use crate::cell::JoinRows;
use crate::error::JoinError;

/// `{ route, value }`: attach an override to every cell whose column's
/// route matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    /// The route of the column(s) to override.
    pub route: String,
    /// The override value.
    pub value: Value,
}

/// Apply `set_value` to every row in `rows`, writing to the cell at
/// `column_index` (the caller has already resolved `set_value.route` to
/// an index; doing it here would require the column selection, which the
/// process-stack frame already has at the call site).
///
/// # Errors
/// Returns [`JoinError::SetValueAmbiguous`] if a targeted cell already
/// carries an override — this representation allows at most one override
/// path per cell, so a pre-existing one makes the target ambiguous.
pub fn apply_set_value(rows: &mut JoinRows, column_index: usize, set_value: &SetValue) -> Result<(), JoinError> {
    for row in rows.values_mut() {
        let Some(cell) = row.get_mut(column_index) else {
            continue;
        };
        if cell.insert.is_some() {
            return Err(JoinError::SetValueAmbiguous {
                route: set_value.route.clone(),
                reason: "cell already carries an override".to_owned(),
            });
        }
        cell.insert = Some(set_value.value.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::cell::JoinCell;
    use serde_json::json;

    #[test]
    fn overrides_every_row_at_the_column() {
        let mut rows = JoinRows::new();
        rows.insert("vin1".to_owned(), vec![JoinCell::from_value(Some(json!(2)))]);
        rows.insert("vin2".to_owned(), vec![JoinCell::from_value(Some(json!(4)))]);

        let set_value = SetValue {
            route: "/doors".to_owned(),
            value: json!(6),
        };
        apply_set_value(&mut rows, 0, &set_value).unwrap();

        assert_eq!(rows["vin1"][0].effective(), Some(&json!(6)));
        assert_eq!(rows["vin2"][0].effective(), Some(&json!(6)));
    }

    #[test]
    fn rejects_double_override() {
        let mut rows = JoinRows::new();
        rows.insert("vin1".to_owned(), vec![JoinCell::from_value(Some(json!(2)))]);
        let set_value = SetValue {
            route: "/doors".to_owned(),
            value: json!(6),
        };
        apply_set_value(&mut rows, 0, &set_value).unwrap();
        let err = apply_set_value(&mut rows, 0, &set_value).unwrap_err();
        assert!(matches!(err, JoinError::SetValueAmbiguous { .. }));
    }

    #[test]
    fn leaves_other_columns_untouched() {
        let mut rows = JoinRows::new();
        rows.insert(
            "vin1".to_owned(),
            vec![JoinCell::from_value(Some(json!("Audi"))), JoinCell::from_value(Some(json!(2)))],
        );
        rows.insert(
            "vin2".to_owned(),
            vec![JoinCell::from_value(Some(json!("BMW"))), JoinCell::from_value(Some(json!(4)))],
        );

        let set_value = SetValue {
            route: "/doors".to_owned(),
            value: json!(6),
        };
        apply_set_value(&mut rows, 1, &set_value).unwrap();

        assert_eq!(rows["vin1"][0].effective(), Some(&json!("Audi")));
        assert_eq!(rows["vin2"][0].effective(), Some(&json!("BMW")));
        assert_eq!(rows["vin1"][1].effective(), Some(&json!(6)));
        assert_eq!(rows["vin2"][1].effective(), Some(&json!(6)));
    }
}
