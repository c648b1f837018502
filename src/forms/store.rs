//! Path-addressed editing of a nested form document.
//!
//! A [`NestedFormStore`] owns one [`Document`] for as long as a form is open.
//! Every operation is a synchronous in-memory mutation; fetching the remote
//! record and submitting the payload belong to the caller.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::document::{
    Attachment, AttachmentTarget, Document, FieldValue, PendingFile, Record, Scalar,
};
use crate::domain::schema::{CollectionSchema, FieldKind, FormSchema, RecordSchema};
use crate::domain::types::{DocumentId, PreviewRef};
use crate::dto::payload::WirePayload;
use crate::forms::FormError;
use crate::forms::hydrate::{bool_from, default_record, hydrate_record, number_from, renumber};
use crate::forms::serialize::serialize_document;

/// Address of a record: `(collection, index)` steps from the document root.
type RecordPath<'a> = &'a [(&'a str, usize)];

/// Result of [`NestedFormStore::attach_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attached {
    /// Preview of the newly attached file.
    pub preview: PreviewRef,
    /// Preview of the pending file it replaced; the caller releases it.
    pub released: Option<PreviewRef>,
}

/// Editable document bound to its schema.
#[derive(Debug, Clone)]
pub struct NestedFormStore {
    schema: Arc<FormSchema>,
    document: Document,
}

impl PartialEq for NestedFormStore {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

fn field_schema<'s>(
    schema: &'s RecordSchema,
    name: &str,
) -> Result<&'s FieldKind, FormError> {
    schema
        .field(name)
        .map(|field| &field.kind)
        .ok_or_else(|| FormError::UnknownField(name.to_string()))
}

fn collection_schema<'s>(
    schema: &'s RecordSchema,
    name: &str,
) -> Result<&'s CollectionSchema, FormError> {
    match field_schema(schema, name)? {
        FieldKind::Collection(collection) => Ok(collection),
        other => Err(FormError::FieldKindMismatch {
            field: name.to_string(),
            expected: "collection",
            actual: other.label(),
        }),
    }
}

fn value_mut<'r>(record: &'r mut Record, name: &str) -> Result<&'r mut FieldValue, FormError> {
    record
        .get_mut(name)
        .ok_or_else(|| FormError::UnknownField(name.to_string()))
}

fn records_mut<'r>(record: &'r mut Record, name: &str) -> Result<&'r mut Vec<Record>, FormError> {
    match value_mut(record, name)? {
        FieldValue::Records(records) => Ok(records),
        _ => Err(FormError::FieldKindMismatch {
            field: name.to_string(),
            expected: "collection",
            actual: "non-collection",
        }),
    }
}

fn list_mut<'r>(record: &'r mut Record, name: &str) -> Result<&'r mut Vec<String>, FormError> {
    match value_mut(record, name)? {
        FieldValue::List(items) => Ok(items),
        _ => Err(FormError::FieldKindMismatch {
            field: name.to_string(),
            expected: "list",
            actual: "non-list",
        }),
    }
}

fn out_of_range(collection: &str, index: usize, len: usize) -> FormError {
    FormError::IndexOutOfRange {
        collection: collection.to_string(),
        index,
        len,
    }
}

/// Walks `path` down from `record`, returning the addressed record and its schema.
fn locate<'s, 'r>(
    mut schema: &'s RecordSchema,
    mut record: &'r mut Record,
    path: RecordPath<'_>,
) -> Result<(&'s RecordSchema, &'r mut Record), FormError> {
    for &(collection, index) in path {
        let collection_schema = collection_schema(schema, collection)?;
        let records = records_mut(record, collection)?;
        let len = records.len();
        record = records
            .get_mut(index)
            .ok_or_else(|| out_of_range(collection, index, len))?;
        schema = &collection_schema.record;
    }
    Ok((schema, record))
}

/// Position field of the collection holding the record at `path`, if any.
fn position_field<'s>(mut schema: &'s RecordSchema, path: RecordPath<'_>) -> Option<&'s str> {
    let mut position = None;
    for &(collection, _) in path {
        let collection = schema.collection(collection)?;
        position = collection.position.as_deref();
        schema = &collection.record;
    }
    position
}

/// Converts `value` to the declared kind; text is parsed the way form inputs send it.
fn coerce(kind: &FieldKind, field: &str, value: Scalar) -> Result<Scalar, FormError> {
    let rejected = |actual: &'static str| FormError::FieldKindMismatch {
        field: field.to_string(),
        expected: kind.label(),
        actual,
    };
    match (kind, value) {
        (FieldKind::Number { .. }, value @ Scalar::Number(_)) => Ok(value),
        (FieldKind::Number { default }, Scalar::Text(text)) => {
            number_from(&Value::String(text), default, field)
                .map(Scalar::Number)
                .map_err(|_| rejected("text"))
        }
        (FieldKind::Number { .. }, Scalar::Bool(_)) => Err(rejected("boolean")),
        (FieldKind::Boolean { .. }, value @ Scalar::Bool(_)) => Ok(value),
        (FieldKind::Boolean { .. }, Scalar::Text(text)) => bool_from(&Value::String(text), field)
            .map(Scalar::Bool)
            .map_err(|_| rejected("text")),
        (FieldKind::Boolean { .. }, Scalar::Number(_)) => Err(rejected("number")),
        (_, value) => Ok(value),
    }
}

/// Completes `template` with the defaults of every declared field it lacks.
fn complete_record(schema: &RecordSchema, template: Record) -> Record {
    let mut record = default_record(schema);
    for (name, value) in template.into_fields() {
        if schema.field(&name).is_some() {
            record.insert(name, value);
        } else {
            log::debug!("Dropping undeclared template field `{name}`");
        }
    }
    record
}

impl NestedFormStore {
    /// Blank document for the create flow, built from the schema defaults.
    pub fn initialize(schema: Arc<FormSchema>) -> Self {
        let root = default_record(&schema.fields);
        Self {
            schema,
            document: Document { id: None, root },
        }
    }

    /// Document for the edit flow, built from a fetched representation.
    pub fn hydrate(schema: Arc<FormSchema>, remote: &Value) -> Result<Self, FormError> {
        let Value::Object(fields) = remote else {
            return Err(FormError::ShapeMismatch {
                field: schema.name.clone(),
                expected: "an object",
            });
        };
        let root = hydrate_record(&schema.fields, fields, "")?;
        let id = fields
            .get(schema.id_field.as_str())
            .and_then(|value| match value {
                Value::String(id) => DocumentId::new(id.as_str()).ok(),
                Value::Number(id) => DocumentId::new(id.to_string()).ok(),
                _ => None,
            });
        log::debug!("Hydrated `{}` document {id:?}", schema.name);
        Ok(Self {
            schema,
            document: Document { id, root },
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn id(&self) -> Option<&DocumentId> {
        self.document.id.as_ref()
    }

    pub fn set_id(&mut self, id: DocumentId) {
        self.document.id = Some(id);
    }

    /// Number of records currently in a top-level collection.
    pub fn collection_len(&self, collection: &str) -> Result<usize, FormError> {
        collection_schema(&self.schema.fields, collection)?;
        self.document
            .root
            .records(collection)
            .map(<[Record]>::len)
            .ok_or_else(|| FormError::UnknownField(collection.to_string()))
    }

    fn set_field(
        &mut self,
        path: RecordPath<'_>,
        field: &str,
        value: Scalar,
    ) -> Result<(), FormError> {
        let (schema, record) = locate(&self.schema.fields, &mut self.document.root, path)?;
        let kind = field_schema(schema, field)?;
        if !kind.is_scalar() {
            return Err(FormError::FieldKindMismatch {
                field: field.to_string(),
                expected: "scalar",
                actual: kind.label(),
            });
        }
        if let Some(&(collection, _)) = path.last() {
            if position_field(&self.schema.fields, path) == Some(field) {
                return Err(FormError::PositionField {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        let value = coerce(kind, field, value)?;
        log::debug!("Setting `{field}` at {path:?}");
        record.insert(field, FieldValue::Scalar(value));
        Ok(())
    }

    fn append(
        &mut self,
        path: RecordPath<'_>,
        collection: &str,
        template: Record,
    ) -> Result<usize, FormError> {
        let (schema, record) = locate(&self.schema.fields, &mut self.document.root, path)?;
        let collection_schema = collection_schema(schema, collection)?;
        let records = records_mut(record, collection)?;
        records.push(complete_record(&collection_schema.record, template));
        renumber(collection_schema, records);
        Ok(records.len() - 1)
    }

    fn remove(
        &mut self,
        path: RecordPath<'_>,
        collection: &str,
        index: usize,
    ) -> Result<Record, FormError> {
        let (schema, record) = locate(&self.schema.fields, &mut self.document.root, path)?;
        let collection_schema = collection_schema(schema, collection)?;
        let records = records_mut(record, collection)?;
        if index >= records.len() {
            return Err(out_of_range(collection, index, records.len()));
        }
        let removed = records.remove(index);
        renumber(collection_schema, records);
        Ok(removed)
    }

    fn list_at(
        &mut self,
        path: RecordPath<'_>,
        list: &str,
    ) -> Result<&mut Vec<String>, FormError> {
        let (schema, record) = locate(&self.schema.fields, &mut self.document.root, path)?;
        match field_schema(schema, list)? {
            FieldKind::List { .. } => list_mut(record, list),
            other => Err(FormError::FieldKindMismatch {
                field: list.to_string(),
                expected: "list",
                actual: other.label(),
            }),
        }
    }

    /// Replaces one scalar field of the document.
    pub fn set_scalar(&mut self, field: &str, value: impl Into<Scalar>) -> Result<(), FormError> {
        self.set_field(&[], field, value.into())
    }

    /// Appends `template` (completed from defaults) and returns its index.
    ///
    /// A positional field, if declared, is set to the new length.
    pub fn append_record(&mut self, collection: &str, template: Record) -> Result<usize, FormError> {
        self.append(&[], collection, template)
    }

    pub fn append_default_record(&mut self, collection: &str) -> Result<usize, FormError> {
        self.append(&[], collection, Record::new())
    }

    /// Removes and returns the record at `index`, renumbering positions.
    ///
    /// Previews held by the removed record are the caller's to release.
    pub fn remove_record(&mut self, collection: &str, index: usize) -> Result<Record, FormError> {
        self.remove(&[], collection, index)
    }

    pub fn update_record_field(
        &mut self,
        collection: &str,
        index: usize,
        field: &str,
        value: impl Into<Scalar>,
    ) -> Result<(), FormError> {
        self.set_field(&[(collection, index)], field, value.into())
    }

    /// Sets `field` of record `sub_index` in sub-collection `sub` of `collection[index]`.
    pub fn update_nested_field(
        &mut self,
        collection: &str,
        index: usize,
        sub: &str,
        sub_index: usize,
        field: &str,
        value: impl Into<Scalar>,
    ) -> Result<(), FormError> {
        self.set_field(&[(collection, index), (sub, sub_index)], field, value.into())
    }

    /// Sets entry `item_index` of string list `list` of `collection[index]`.
    pub fn update_nested_item(
        &mut self,
        collection: &str,
        index: usize,
        list: &str,
        item_index: usize,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        let items = self.list_at(&[(collection, index)], list)?;
        let len = items.len();
        let item = items
            .get_mut(item_index)
            .ok_or_else(|| out_of_range(list, item_index, len))?;
        *item = value.into();
        Ok(())
    }

    pub fn append_list_item(
        &mut self,
        collection: &str,
        index: usize,
        list: &str,
        value: impl Into<String>,
    ) -> Result<usize, FormError> {
        let items = self.list_at(&[(collection, index)], list)?;
        items.push(value.into());
        Ok(items.len() - 1)
    }

    pub fn remove_list_item(
        &mut self,
        collection: &str,
        index: usize,
        list: &str,
        item_index: usize,
    ) -> Result<String, FormError> {
        let items = self.list_at(&[(collection, index)], list)?;
        if item_index >= items.len() {
            return Err(out_of_range(list, item_index, items.len()));
        }
        Ok(items.remove(item_index))
    }

    pub fn append_nested_record(
        &mut self,
        collection: &str,
        index: usize,
        sub: &str,
        template: Record,
    ) -> Result<usize, FormError> {
        self.append(&[(collection, index)], sub, template)
    }

    pub fn remove_nested_record(
        &mut self,
        collection: &str,
        index: usize,
        sub: &str,
        sub_index: usize,
    ) -> Result<Record, FormError> {
        self.remove(&[(collection, index)], sub, sub_index)
    }

    fn attachment_mut(&mut self, target: &AttachmentTarget) -> Result<&mut Attachment, FormError> {
        let (path, slot): (Vec<(&str, usize)>, &str) = match target {
            AttachmentTarget::Document { slot } => (Vec::new(), slot.as_str()),
            AttachmentTarget::Record {
                collection,
                index,
                slot,
            } => (vec![(collection.as_str(), *index)], slot.as_str()),
        };
        let (schema, record) = locate(&self.schema.fields, &mut self.document.root, &path)?;
        match field_schema(schema, slot)? {
            FieldKind::Attachment(_) => {}
            other => {
                return Err(FormError::FieldKindMismatch {
                    field: slot.to_string(),
                    expected: "attachment",
                    actual: other.label(),
                });
            }
        }
        match value_mut(record, slot)? {
            FieldValue::Attachment(attachment) => Ok(attachment),
            _ => Err(FormError::UnknownField(slot.to_string())),
        }
    }

    /// Current state of an attachment slot.
    pub fn attachment(&self, target: &AttachmentTarget) -> Result<&Attachment, FormError> {
        let record = match target {
            AttachmentTarget::Document { .. } => &self.document.root,
            AttachmentTarget::Record {
                collection, index, ..
            } => {
                let records = self
                    .document
                    .root
                    .records(collection)
                    .ok_or_else(|| FormError::UnknownField(collection.clone()))?;
                records
                    .get(*index)
                    .ok_or_else(|| out_of_range(collection, *index, records.len()))?
            }
        };
        record
            .attachment(target.slot())
            .ok_or_else(|| FormError::UnknownField(target.slot().to_string()))
    }

    /// Stores `file` as the pending upload for `target`.
    ///
    /// A previously pending file for the same slot is replaced; an existing
    /// remote reference stays until the submission succeeds.
    pub fn attach_file(
        &mut self,
        target: &AttachmentTarget,
        file: PendingFile,
    ) -> Result<Attached, FormError> {
        let attachment = self.attachment_mut(target)?;
        let (preview, released) = attachment.attach(file);
        log::debug!("Attached pending file to {target}");
        Ok(Attached { preview, released })
    }

    /// Clears the pending upload for `target`, returning its preview for release.
    pub fn detach_file(
        &mut self,
        target: &AttachmentTarget,
    ) -> Result<Option<PreviewRef>, FormError> {
        let attachment = self.attachment_mut(target)?;
        Ok(attachment.detach())
    }

    /// Every live preview reference in the document.
    pub fn previews(&self) -> Vec<PreviewRef> {
        self.document.root.previews()
    }

    /// Produces the multipart payload the external API expects.
    ///
    /// Fails with [`FormError::MissingRequiredAttachment`] when a required
    /// slot has neither a pending file nor a remote reference.
    pub fn serialize(&self) -> Result<WirePayload, FormError> {
        serialize_document(&self.schema, &self.document)
    }

    /// Drops the document, handing back every preview the caller must release.
    pub fn discard(self) -> Vec<PreviewRef> {
        self.previews()
    }
}
