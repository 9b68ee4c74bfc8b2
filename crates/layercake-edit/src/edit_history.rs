// SPDX-License-Identifier: Apache-2.0
//! `EditHistory` rows: `{ timeId, dataRef, multiEditRef, previous }`, a
//! DAG of chain heads anchored to a cake revision.

use layercake_hash::ContentHash;
use layercake_storage::Row;
use serde_json::{json, Value};

use crate::error::EditError;

/// One row of a `<cakeKey>EditHistory` table.
///
/// `previous` names the predecessor `EditHistory` row hashes: `None` at
/// a chain root, one entry for a linear child, more than one for a
/// merge (detected, never resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditHistoryRow {
    /// This row's `timeId`.
    pub time_id: String,
    /// The cake revision this chain head is anchored to.
    pub data_ref: ContentHash,
    /// The head `MultiEdit` link's hash.
    pub multi_edit_ref: ContentHash,
    /// Predecessor `EditHistory` row hashes.
    pub previous: Option<Vec<ContentHash>>,
}

impl EditHistoryRow {
    /// Convert to the generic row shape storage expects. `previous` is
    /// emitted as explicit JSON `null` at a chain root, not omitted —
    /// same reasoning as [`crate::MultiEdit::to_row`].
    #[must_use]
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("timeId".to_owned(), json!(self.time_id));
        row.insert("dataRef".to_owned(), json!(self.data_ref.to_string()));
        row.insert("multiEditRef".to_owned(), json!(self.multi_edit_ref.to_string()));
        row.insert(
            "previous".to_owned(),
            match &self.previous {
                Some(hashes) => json!(hashes.iter().map(ContentHash::to_string).collect::<Vec<_>>()),
                None => Value::Null,
            },
        );
        row
    }

    /// Parse back from a stored row.
    ///
    /// # Errors
    /// Returns [`EditError::MalformedAction`] if a required field is
    /// missing or not valid hash hex.
    pub fn from_row(row: &Row) -> Result<Self, EditError> {
        let time_id = row
            .get("timeId")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("edit history row is missing \"timeId\""))?
            .to_owned();
        let data_ref = parse_hash(row, "dataRef")?;
        let multi_edit_ref = parse_hash(row, "multiEditRef")?;
        let previous = match row.get("previous") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut hashes = Vec::with_capacity(items.len());
                for item in items {
                    let hex = item
                        .as_str()
                        .ok_or_else(|| malformed("edit history row's \"previous\" entry is not a string"))?;
                    hashes.push(
                        ContentHash::from_hex(hex)
                            .ok_or_else(|| malformed("edit history row's \"previous\" entry is not a valid hash"))?,
                    );
                }
                Some(hashes)
            }
            Some(_) => return Err(malformed("edit history row's \"previous\" must be an array or null")),
        };
        Ok(Self {
            time_id,
            data_ref,
            multi_edit_ref,
            previous,
        })
    }
}

fn parse_hash(row: &Row, field: &str) -> Result<ContentHash, EditError> {
    let hex = row
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(&format!("edit history row is missing \"{field}\"")))?;
    ContentHash::from_hex(hex).ok_or_else(|| malformed(&format!("edit history row's \"{field}\" is not a valid hash")))
}

fn malformed(reason: &str) -> EditError {
    EditError::MalformedAction {
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use layercake_hash::calc_hash;

    fn some_hash(seed: u8) -> ContentHash {
        calc_hash(&json!({ "seed": seed }))
    }

    #[test]
    fn root_row_serializes_previous_as_null() {
        let row = EditHistoryRow {
            time_id: "1:aaaa".to_owned(),
            data_ref: some_hash(1),
            multi_edit_ref: some_hash(2),
            previous: None,
        }
        .to_row();
        assert_eq!(row.get("previous"), Some(&Value::Null));
    }

    #[test]
    fn linear_child_round_trips_through_a_row() {
        let original = EditHistoryRow {
            time_id: "2:bbbb".to_owned(),
            data_ref: some_hash(1),
            multi_edit_ref: some_hash(2),
            previous: Some(vec![some_hash(3)]),
        };
        let row = original.to_row();
        let back = EditHistoryRow::from_row(&row).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn merge_row_names_multiple_predecessors() {
        let original = EditHistoryRow {
            time_id: "3:cccc".to_owned(),
            data_ref: some_hash(1),
            multi_edit_ref: some_hash(2),
            previous: Some(vec![some_hash(3), some_hash(4)]),
        };
        let row = original.to_row();
        let back = EditHistoryRow::from_row(&row).unwrap();
        assert_eq!(back.previous.unwrap().len(), 2);
    }
}
