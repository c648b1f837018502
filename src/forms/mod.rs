//! The nested form store and the errors it surfaces.

use thiserror::Error;

use crate::domain::document::AttachmentTarget;

pub mod hydrate;
mod serialize;
pub mod store;

#[derive(Debug, Error, Clone, PartialEq)]
/// Errors that can occur while editing or serializing a form document.
pub enum FormError {
    /// The remote representation does not fit the schema.
    #[error("remote record does not match the form: `{field}` should be {expected}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
    },

    /// A stale or invalid row index was passed by the caller.
    #[error("index {index} is out of range for `{collection}` (length {len})")]
    IndexOutOfRange {
        collection: String,
        index: usize,
        len: usize,
    },

    /// Blocks submission; shown to the user so the offending row can be highlighted.
    #[error("missing required attachment {0}")]
    MissingRequiredAttachment(AttachmentTarget),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// Positions are renumbered by the store and cannot be written directly.
    #[error("`{field}` holds the position of each `{collection}` record and cannot be set")]
    PositionField { collection: String, field: String },

    #[error("field `{field}` is a {actual} field, not a {expected} field")]
    FieldKindMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl FormError {
    /// Whether the caller may downgrade this error to a logged no-op.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FormError::MissingRequiredAttachment(_))
    }
}
