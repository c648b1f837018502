//! Caller-side checks performed around the store.

use crate::forms::FormError;
use crate::forms::store::NestedFormStore;
use crate::services::{ServiceError, ServiceResult};

/// Ensures two top-level collections hold the same number of records,
/// e.g. footer items and their logo rows.
pub fn ensure_aligned(store: &NestedFormStore, left: &str, right: &str) -> ServiceResult<()> {
    let left_len = store.collection_len(left)?;
    let right_len = store.collection_len(right)?;
    if left_len != right_len {
        return Err(ServiceError::Misaligned {
            left: left.to_string(),
            left_len,
            right: right.to_string(),
            right_len,
        });
    }
    Ok(())
}

/// Downgrades a recoverable store error to a logged warning.
///
/// `MissingRequiredAttachment` is never downgraded.
pub fn apply_or_warn<T>(result: Result<T, FormError>) -> Result<Option<T>, FormError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            log::warn!("Ignoring form edit: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::document::AttachmentTarget;
    use crate::domain::schema::FormSchema;

    fn store() -> NestedFormStore {
        let schema = FormSchema::from_value(json!({
            "name": "departure city",
            "resource": "departure-cities",
            "fields": [
                {"name": "dates", "kind": "collection", "seed": [{}, {}], "record": [
                    {"name": "date", "kind": "date"}
                ]},
                {"name": "tourPrices", "kind": "collection", "seed": [{}, {}], "record": [
                    {"name": "price", "kind": "number"}
                ]}
            ]
        }))
        .unwrap();
        NestedFormStore::initialize(Arc::new(schema))
    }

    #[test]
    fn aligned_collections_pass() {
        assert!(ensure_aligned(&store(), "dates", "tourPrices").is_ok());
    }

    #[test]
    fn misaligned_collections_are_reported() {
        let mut store = store();
        store.append_default_record("dates").unwrap();

        let err = ensure_aligned(&store, "dates", "tourPrices").unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Misaligned { left_len: 3, right_len: 2, .. }
        ));
    }

    #[test]
    fn stale_index_is_downgraded() {
        let mut store = store();

        let outcome = apply_or_warn(store.remove_record("dates", 7)).unwrap();

        assert!(outcome.is_none());
        assert_eq!(store.collection_len("dates").unwrap(), 2);
    }

    #[test]
    fn missing_attachment_is_never_downgraded() {
        let err = FormError::MissingRequiredAttachment(AttachmentTarget::document("icon"));

        assert!(apply_or_warn::<()>(Err(err)).is_err());
    }
}
