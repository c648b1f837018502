//! Declarative description of an editable form.
//!
//! A [`FormSchema`] names every scalar field, string list, nested collection
//! and attachment slot of a document. Schemas are usually loaded from JSON so
//! that one generic store and one generic serializer serve every screen.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::domain::types::{FieldName, ResourcePath, TypeConstraintError, UploadFieldName};

/// Errors raised while loading or validating a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value: {0}")]
    TypeConstraint(#[from] TypeConstraintError),

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("position field `{position}` of collection `{collection}` must be a declared number field")]
    InvalidPosition {
        collection: String,
        position: String,
    },

    #[error("attachment `{0}` is nested too deep; attachments live on the document or top-level collection records")]
    NestedAttachment(String),

    #[error("seed record {index} of collection `{collection}` is malformed: {reason}")]
    InvalidSeed {
        collection: String,
        index: usize,
        reason: String,
    },
}

fn zero() -> Number {
    Number::from(0)
}

fn single_seed() -> Vec<Value> {
    vec![Value::Object(Default::default())]
}

fn default_id_field() -> FieldName {
    FieldName::from_static("_id")
}

/// What a single declared field holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        default: String,
    },
    /// Dates travel as strings; no calendar parsing happens in the store.
    Date {
        #[serde(default)]
        default: String,
    },
    Number {
        #[serde(default = "zero")]
        default: Number,
    },
    Boolean {
        #[serde(default)]
        default: bool,
    },
    /// Ordered list of strings, e.g. the sightseeing entries of an itinerary day.
    List {
        #[serde(default)]
        default: Vec<String>,
    },
    Collection(CollectionSchema),
    Attachment(AttachmentSlot),
}

impl FieldKind {
    /// Short label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Date { .. } => "date",
            FieldKind::Number { .. } => "number",
            FieldKind::Boolean { .. } => "boolean",
            FieldKind::List { .. } => "list",
            FieldKind::Collection(_) => "collection",
            FieldKind::Attachment(_) => "attachment",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::Text { .. }
                | FieldKind::Date { .. }
                | FieldKind::Number { .. }
                | FieldKind::Boolean { .. }
        )
    }
}

/// A nested ordered collection of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub record: RecordSchema,
    /// Seed records used by `initialize` and as the hydration fallback.
    /// Each entry is a partial record completed from the field defaults.
    #[serde(default = "single_seed")]
    pub seed: Vec<Value>,
    /// Number field holding the 1-based position of each record (e.g. `day`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<FieldName>,
}

/// A binary slot on the document or on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSlot {
    /// Part name the external upload middleware expects.
    pub upload: UploadFieldName,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: FieldName,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Ordered field declarations of a record (or of the document root).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSchema {
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        match self.field(name).map(|f| &f.kind) {
            Some(FieldKind::Collection(collection)) => Some(collection),
            _ => None,
        }
    }

    pub fn attachment(&self, name: &str) -> Option<&AttachmentSlot> {
        match self.field(name).map(|f| &f.kind) {
            Some(FieldKind::Attachment(slot)) => Some(slot),
            _ => None,
        }
    }

    fn validate(&self, depth: usize) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.to_string()));
            }
            match &field.kind {
                FieldKind::Attachment(_) if depth > 1 => {
                    return Err(SchemaError::NestedAttachment(field.name.to_string()));
                }
                FieldKind::Collection(collection) => {
                    if let Some(position) = &collection.position {
                        let is_number = matches!(
                            collection.record.field(position).map(|f| &f.kind),
                            Some(FieldKind::Number { .. })
                        );
                        if !is_number {
                            return Err(SchemaError::InvalidPosition {
                                collection: field.name.to_string(),
                                position: position.to_string(),
                            });
                        }
                    }
                    collection.record.validate(depth + 1)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Complete description of one editable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Human readable form name, used in log messages.
    pub name: String,
    /// REST resource the documents of this form live under.
    pub resource: ResourcePath,
    /// Field of the remote representation carrying the document identifier.
    #[serde(default = "default_id_field")]
    pub id_field: FieldName,
    pub fields: RecordSchema,
}

impl FormSchema {
    /// Builds a schema from declarations, validating its structure.
    pub fn new(
        name: impl Into<String>,
        resource: ResourcePath,
        fields: RecordSchema,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            name: name.into(),
            resource,
            id_field: default_id_field(),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_value(value)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reads and validates a schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks field uniqueness, position fields, attachment depth and seeds.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.fields.validate(0)?;
        crate::forms::hydrate::validate_seeds(&self.fields)
    }

    /// Looks up a top-level collection.
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.fields.collection(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn itinerary_schema() -> Value {
        json!({
            "name": "Itinerary tour",
            "resource": "itinerary-tours",
            "fields": [
                {"name": "title", "kind": "text"},
                {"name": "backgroundImage", "kind": "attachment", "upload": "backgroundImage"},
                {"name": "itinerary", "kind": "collection", "position": "day", "record": [
                    {"name": "day", "kind": "number", "default": 1},
                    {"name": "title", "kind": "text"},
                    {"name": "sightseeing", "kind": "list", "default": [""]},
                    {"name": "meals", "kind": "list"}
                ]}
            ]
        })
    }

    #[test]
    fn loads_declarative_schema() {
        let schema = FormSchema::from_value(itinerary_schema()).unwrap();

        assert_eq!(schema.resource.as_str(), "itinerary-tours");
        assert_eq!(schema.id_field.as_str(), "_id");
        let itinerary = schema.collection("itinerary").unwrap();
        assert_eq!(itinerary.seed.len(), 1);
        assert_eq!(itinerary.position.as_deref(), Some("day"));
        assert_eq!(
            itinerary.record.field("sightseeing").unwrap().kind,
            FieldKind::List {
                default: vec![String::new()]
            }
        );
    }

    #[test]
    fn rejects_duplicate_fields() {
        let result = FormSchema::from_value(json!({
            "name": "Hero",
            "resource": "hero",
            "fields": [
                {"name": "title", "kind": "text"},
                {"name": "title", "kind": "text"}
            ]
        }));

        assert!(matches!(result, Err(SchemaError::DuplicateField(name)) if name == "title"));
    }

    #[test]
    fn rejects_position_that_is_not_a_number_field() {
        let result = FormSchema::from_value(json!({
            "name": "Itinerary",
            "resource": "itinerary",
            "fields": [
                {"name": "itinerary", "kind": "collection", "position": "day", "record": [
                    {"name": "day", "kind": "text"}
                ]}
            ]
        }));

        assert!(matches!(result, Err(SchemaError::InvalidPosition { .. })));
    }

    #[test]
    fn rejects_attachments_below_first_collection_level() {
        let result = FormSchema::from_value(json!({
            "name": "Departure city",
            "resource": "departure-cities",
            "fields": [
                {"name": "dates", "kind": "collection", "record": [
                    {"name": "packages", "kind": "collection", "record": [
                        {"name": "image", "kind": "attachment", "upload": "images"}
                    ]}
                ]}
            ]
        }));

        assert!(matches!(result, Err(SchemaError::NestedAttachment(name)) if name == "image"));
    }

    #[test]
    fn rejects_malformed_seed() {
        let result = FormSchema::from_value(json!({
            "name": "Hotels",
            "resource": "hotels",
            "fields": [
                {"name": "hotels", "kind": "collection", "seed": ["not a record"], "record": [
                    {"name": "name", "kind": "text"}
                ]}
            ]
        }));

        assert!(matches!(result, Err(SchemaError::InvalidSeed { index: 0, .. })));
    }

    #[test]
    fn loads_schema_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), itinerary_schema().to_string()).unwrap();

        let schema = FormSchema::load(file.path()).unwrap();

        assert_eq!(schema.name, "Itinerary tour");
    }
}
