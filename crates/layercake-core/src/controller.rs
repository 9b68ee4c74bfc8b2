// SPDX-License-Identifier: Apache-2.0
//! Content-kind-keyed controllers: a lookup table keyed by content-kind.
//!
//! Every controller shares the same hashing contract — strip any stale
//! `_hash`, compute the canonical hash, stamp it back on — but a couple of
//! content kinds carry an extra invariant checked before that happens.

use layercake_hash::{rmhsh, with_hash};
use layercake_storage::{ContentKind, Row};
use serde_json::Value;

use crate::error::CoreError;

/// Turns an insert value into the row that gets written to storage.
pub trait Controller {
    /// Validate `value` and stamp it with its content hash, ready to
    /// write.
    ///
    /// # Errors
    /// Returns [`CoreError::InsertValueNotAnObject`] if `value` is not a
    /// JSON object, or a kind-specific validation error.
    fn prepare_row(&self, route: &str, value: Value) -> Result<Row, CoreError>;
}

struct DefaultController;

impl Controller for DefaultController {
    fn prepare_row(&self, route: &str, value: Value) -> Result<Row, CoreError> {
        object_or_err(route, value)
    }
}

struct SliceIdsController;

impl Controller for SliceIdsController {
    fn prepare_row(&self, route: &str, value: Value) -> Result<Row, CoreError> {
        let row = object_or_err(route, value)?;
        if !row.get("add").is_some_and(Value::is_array) {
            return Err(CoreError::MissingChildValue {
                route: route.to_owned(),
                field: "add".to_owned(),
            });
        }
        Ok(row)
    }
}

fn object_or_err(route: &str, value: Value) -> Result<Row, CoreError> {
    let hashed = with_hash(&rmhsh(&value));
    match hashed {
        Value::Object(map) => Ok(map),
        _ => Err(CoreError::InsertValueNotAnObject {
            route: route.to_owned(),
        }),
    }
}

/// Look up the controller for `kind`. Every kind the core writes rows for
/// (everything but `trees`, which is reserved) resolves to a controller;
/// call [`crate::error::CoreError::UnsupportedKind`] at the call site for
/// `trees`.
#[must_use]
pub fn controller_for(kind: ContentKind) -> Box<dyn Controller> {
    match kind {
        ContentKind::SliceIds => Box::new(SliceIdsController),
        _ => Box::new(DefaultController),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn default_controller_stamps_hash() {
        let controller = controller_for(ContentKind::Components);
        let row = controller.prepare_row("/carGeneral", json!({"name": "car"})).unwrap();
        assert!(row.contains_key("_hash"));
    }

    #[test]
    fn slice_ids_controller_requires_add_array() {
        let controller = controller_for(ContentKind::SliceIds);
        let err = controller.prepare_row("/carGeneral(sliceIds)", json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, CoreError::MissingChildValue { .. }));
    }

    #[test]
    fn slice_ids_controller_accepts_add_array() {
        let controller = controller_for(ContentKind::SliceIds);
        let row = controller
            .prepare_row("/carGeneral(sliceIds)", json!({"add": ["s1", "s2"]}))
            .unwrap();
        assert!(row.contains_key("_hash"));
    }

    #[test]
    fn non_object_value_is_rejected() {
        let controller = controller_for(ContentKind::Components);
        let err = controller.prepare_row("/carGeneral", json!([1, 2])).unwrap_err();
        assert!(matches!(err, CoreError::InsertValueNotAnObject { .. }));
    }
}
