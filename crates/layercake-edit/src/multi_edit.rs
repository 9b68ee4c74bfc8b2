// SPDX-License-Identifier: Apache-2.0
//! Singly-linked multi-edit chain link: `{ edit, previous, _hash }`.

use layercake_hash::{calc_hash, with_hash, ContentHash};
use layercake_storage::Row;
use serde_json::{json, Value};

use crate::error::EditError;

/// One link of a chain: the edit this link adds, plus the previous
/// link's hash (`None` at the chain root). Reconstructing the chain
/// means walking `previous` until it's `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiEdit {
    /// Hash of the [`crate::Edit`] this link applies.
    pub edit: ContentHash,
    /// Hash of the prior `MultiEdit` link, or `None` at the chain root.
    pub previous: Option<ContentHash>,
}

impl MultiEdit {
    /// Build a chain-root link.
    #[must_use]
    pub fn root(edit: ContentHash) -> Self {
        Self { edit, previous: None }
    }

    /// Build a link extending `previous`.
    #[must_use]
    pub fn extending(edit: ContentHash, previous: ContentHash) -> Self {
        Self {
            edit,
            previous: Some(previous),
        }
    }

    fn canonical(&self) -> Value {
        json!({
            "edit": self.edit.to_string(),
            "previous": self.previous.map(|h| h.to_string()),
        })
    }

    /// This link's content hash.
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        calc_hash(&self.canonical())
    }

    /// Convert to the row shape stored in a `<cakeKey>MultiEdit` table.
    /// `previous` is emitted as explicit JSON `null` at the root, not
    /// omitted: it's a content field this hashes over, unlike the
    /// omit-if-absent optional fields of a sync wire payload.
    #[must_use]
    pub fn to_row(&self) -> Row {
        match with_hash(&self.canonical()) {
            Value::Object(map) => map,
            _ => unreachable!("canonical() always produces an object"),
        }
    }

    /// Parse back from a stored row.
    ///
    /// # Errors
    /// Returns [`EditError::MalformedAction`] if `edit`/`previous` are
    /// missing or not valid hash hex.
    pub fn from_row(row: &Row) -> Result<Self, EditError> {
        let edit_hex = row
            .get("edit")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("multi-edit row is missing \"edit\""))?;
        let edit = ContentHash::from_hex(edit_hex)
            .ok_or_else(|| malformed("multi-edit row's \"edit\" is not a valid hash"))?;
        let previous = match row.get("previous") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                ContentHash::from_hex(s)
                    .ok_or_else(|| malformed("multi-edit row's \"previous\" is not a valid hash"))?,
            ),
            Some(_) => return Err(malformed("multi-edit row's \"previous\" must be a string or null")),
        };
        Ok(Self { edit, previous })
    }
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

    fn some_hash(seed: u8) -> ContentHash {
        calc_hash(&json!({ "seed": seed }))
    }

    #[test]
    fn root_link_serializes_previous_as_explicit_null() {
        let link = MultiEdit::root(some_hash(1));
        let row = link.to_row();
        assert_eq!(row.get("previous"), Some(&Value::Null));
    }

    #[test]
    fn root_link_round_trips_through_a_row() {
        let link = MultiEdit::root(some_hash(1));
        let row = link.to_row();
        let back = MultiEdit::from_row(&row).unwrap();
        assert_eq!(link, back);
    }

    #[test]
    fn extending_link_round_trips_through_a_row() {
        let link = MultiEdit::extending(some_hash(2), some_hash(1));
        let row = link.to_row();
        let back = MultiEdit::from_row(&row).unwrap();
        assert_eq!(link, back);
        assert_eq!(row.get("previous").and_then(Value::as_str), Some(some_hash(1).to_string().as_str()));
    }

    #[test]
    fn malformed_previous_is_rejected() {
        let mut row = Row::new();
        row.insert("edit".to_owned(), json!(some_hash(1).to_string()));
        row.insert("previous".to_owned(), json!(42));
        let err = MultiEdit::from_row(&row).unwrap_err();
        assert!(matches!(err, EditError::MalformedAction { .. }));
    }
}
