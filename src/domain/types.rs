//! Strongly-typed value objects used by the form schema and document tree.
//!
//! These wrappers enforce basic invariants (trimmed non-empty names, opaque
//! identifiers) so that once a value reaches the store it can be treated as
//! trusted.
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when attempting to construct a constrained value object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeConstraintError {
    /// Provided string contained no non-whitespace characters.
    #[error("value cannot be empty")]
    EmptyString,
    /// Provided value failed custom validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Trims `value`, rejecting strings with no visible characters.
fn trimmed_non_empty(value: String) -> Result<String, TypeConstraintError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TypeConstraintError::EmptyString);
    }
    Ok(trimmed.to_string())
}

/// Declares a trimmed, non-empty string name with serde validation.
macro_rules! non_empty_string_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
                trimmed_non_empty(value.into()).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

non_empty_string_newtype!(
    FieldName,
    "Name of a declared field on a document or record."
);

impl FieldName {
    /// Wraps a compile-time constant name.
    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }
}

non_empty_string_newtype!(
    UploadFieldName,
    "Multipart part name expected by the upload middleware (e.g. `logos`)."
);

non_empty_string_newtype!(
    DocumentId,
    "Opaque identifier assigned by the remote API after the first create."
);

/// REST resource path without leading or trailing slashes (e.g. `departure-cities`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Strips surrounding slashes and rejects empty paths or embedded whitespace.
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let value = value.into();
        let trimmed = value.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(TypeConstraintError::EmptyString);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TypeConstraintError::InvalidValue(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = TypeConstraintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourcePath> for String {
    fn from(value: ResourcePath) -> Self {
        value.0
    }
}

/// Ephemeral reference to a locally selected file, used only for previews.
///
/// Never persisted and never sent over the wire. The caller revokes it when
/// the attachment is replaced or detached, or when the document is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(Uuid);

impl PreviewRef {
    /// Generate a fresh preview reference.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// URI form handed to the rendering layer.
    pub fn uri(&self) -> String {
        format!("blob:preview/{}", self.0)
    }
}

impl Default for PreviewRef {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PreviewRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_is_trimmed_and_non_empty() {
        assert_eq!(FieldName::new("  basePrice ").unwrap().as_str(), "basePrice");
        assert_eq!(FieldName::new("   "), Err(TypeConstraintError::EmptyString));
    }

    #[test]
    fn field_name_deserialization_is_validated() {
        let ok: FieldName = serde_json::from_str("\"dates\"").unwrap();
        assert_eq!(&*ok, "dates");
        assert!(serde_json::from_str::<FieldName>("\"\"").is_err());
    }

    #[test]
    fn resource_path_strips_slashes() {
        let path = ResourcePath::new("/departure-cities/").unwrap();
        assert_eq!(path.as_str(), "departure-cities");
        assert!(ResourcePath::new("//").is_err());
        assert!(ResourcePath::new("hero banners").is_err());
    }

    #[test]
    fn preview_refs_are_unique() {
        let a = PreviewRef::new();
        let b = PreviewRef::new();
        assert_ne!(a, b);
        assert!(a.uri().starts_with("blob:preview/"));
    }
}
