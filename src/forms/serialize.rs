//! Turning a document into multipart parts.
//!
//! Scalars become text parts, collections become one JSON text part each,
//! and pending files become file parts under the slot's upload name.
//! Record-level files follow all text parts, in collection order.
//!
//! Inside the collection JSON an attachment slot holds a string when nothing
//! new is uploaded (the remote path, or `""`) and a number while a file is
//! pending: the position of that file among all parts named after the slot's
//! upload field.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::domain::document::{
    Attachment, AttachmentTarget, Document, FieldValue, PendingFile, Record,
};
use crate::domain::schema::{AttachmentSlot, FieldKind, FormSchema, RecordSchema};
use crate::dto::payload::{PartBody, WirePart, WirePayload};
use crate::forms::FormError;

/// Top-level row a nested value belongs to, for attachment errors.
struct Row<'a> {
    collection: &'a str,
    index: usize,
}

/// Record-level file parts, numbered per upload name.
#[derive(Default)]
struct RecordFiles {
    parts: Vec<WirePart>,
    next: HashMap<String, usize>,
}

impl RecordFiles {
    /// Starts numbering after the document-level files, which precede record files.
    fn after_document_files(schema: &FormSchema, document: &Document) -> Self {
        let mut files = Self::default();
        for field in &schema.fields.fields {
            let FieldKind::Attachment(slot) = &field.kind else {
                continue;
            };
            let pending = document
                .root
                .attachment(field.name.as_str())
                .is_some_and(|attachment| attachment.pending().is_some());
            if pending {
                *files.next.entry(slot.upload.to_string()).or_default() += 1;
            }
        }
        files
    }

    /// Queues `file` and returns its position among the parts named `upload`.
    fn push(&mut self, upload: &str, file: &PendingFile) -> usize {
        let next = self.next.entry(upload.to_string()).or_default();
        let position = *next;
        *next += 1;
        self.parts.push(WirePart {
            name: upload.to_string(),
            body: PartBody::File(file.clone()),
        });
        position
    }
}

fn check_required(
    slot: &AttachmentSlot,
    attachment: &Attachment,
    target: impl FnOnce() -> AttachmentTarget,
) -> Result<(), FormError> {
    if slot.required && !attachment.is_present() {
        return Err(FormError::MissingRequiredAttachment(target()));
    }
    Ok(())
}

fn record_json(
    schema: &RecordSchema,
    record: &Record,
    row: &Row<'_>,
    files: &mut RecordFiles,
) -> Result<Value, FormError> {
    let mut json = Map::new();
    for field in &schema.fields {
        let name = field.name.as_str();
        let value = match (&field.kind, record.get(name)) {
            (_, Some(FieldValue::Scalar(scalar))) => scalar.to_json(),
            (_, Some(FieldValue::List(items))) => Value::from(items.clone()),
            (FieldKind::Collection(collection), Some(FieldValue::Records(records))) => {
                Value::Array(
                    records
                        .iter()
                        .map(|nested| record_json(&collection.record, nested, row, files))
                        .collect::<Result<_, _>>()?,
                )
            }
            (FieldKind::Attachment(slot), Some(FieldValue::Attachment(attachment))) => {
                check_required(slot, attachment, || {
                    AttachmentTarget::record(row.collection, row.index, name)
                })?;
                match attachment.pending() {
                    Some(file) => Value::from(files.push(slot.upload.as_str(), file)),
                    None => Value::String(attachment.remote().unwrap_or_default().to_string()),
                }
            }
            (kind, _) => {
                log::warn!(
                    "Skipping `{name}`: stored value does not match its {} declaration",
                    kind.label()
                );
                continue;
            }
        };
        json.insert(name.to_string(), value);
    }
    Ok(Value::Object(json))
}

pub(crate) fn serialize_document(
    schema: &FormSchema,
    document: &Document,
) -> Result<WirePayload, FormError> {
    let mut payload = WirePayload::default();
    let mut files = RecordFiles::after_document_files(schema, document);

    for field in &schema.fields.fields {
        let name = field.name.as_str();
        match (&field.kind, document.root.get(name)) {
            (_, Some(FieldValue::Scalar(scalar))) => payload.push_text(name, scalar.to_wire_string()),
            (_, Some(FieldValue::List(items))) => {
                payload.push_text(name, Value::from(items.clone()).to_string());
            }
            (FieldKind::Collection(collection), Some(FieldValue::Records(records))) => {
                let rows = records
                    .iter()
                    .enumerate()
                    .map(|(index, record)| {
                        let row = Row {
                            collection: name,
                            index,
                        };
                        record_json(&collection.record, record, &row, &mut files)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                payload.push_text(name, Value::Array(rows).to_string());
            }
            (FieldKind::Attachment(slot), Some(FieldValue::Attachment(attachment))) => {
                check_required(slot, attachment, || AttachmentTarget::document(name))?;
                match (attachment.pending(), attachment.remote()) {
                    (Some(file), _) => payload.push_file(slot.upload.as_str(), file.clone()),
                    (None, Some(remote)) => payload.push_text(name, remote),
                    (None, None) => {}
                }
            }
            (kind, _) => {
                log::warn!(
                    "Skipping `{name}`: stored value does not match its {} declaration",
                    kind.label()
                );
            }
        }
    }

    payload.parts.extend(files.parts);
    log::debug!(
        "Serialized `{}` into {} parts ({} files)",
        schema.name,
        payload.parts.len(),
        payload.file_count()
    );
    Ok(payload)
}
