//! In-memory document tree edited by the form store.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::domain::types::{DocumentId, PreviewRef};

/// A single scalar value. Dates are carried as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    /// String form used for multipart text parts.
    pub fn to_wire_string(&self) -> String {
        match self {
            Scalar::Text(text) => text.clone(),
            Scalar::Number(number) => number.to_string(),
            Scalar::Bool(flag) => flag.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Text(text) => Value::String(text.clone()),
            Scalar::Number(number) => Value::Number(number.clone()),
            Scalar::Bool(flag) => Value::Bool(*flag),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(number) => number.as_i64(),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<f64> for Scalar {
    /// Non-finite floats have no JSON number form and are kept as text.
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(number) => Scalar::Number(number),
            None => Scalar::Text(value.to_string()),
        }
    }
}

impl From<Number> for Scalar {
    fn from(value: Number) -> Self {
        Scalar::Number(value)
    }
}

/// A file selected locally and not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing the content type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_content_type(&file_name);
        Ok(Self::new(file_name, content_type, bytes))
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Binary slot state: a persisted remote path, a pending local file, or both.
///
/// Equality ignores the preview reference.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    remote: Option<String>,
    pending: Option<PendingFile>,
    preview: Option<PreviewRef>,
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.remote == other.remote && self.pending == other.pending
    }
}

impl Attachment {
    /// An attachment already stored on the remote system.
    pub fn existing(remote: impl Into<String>) -> Self {
        Self {
            remote: Some(remote.into()),
            ..Self::default()
        }
    }

    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    pub fn pending(&self) -> Option<&PendingFile> {
        self.pending.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewRef> {
        self.preview.as_ref()
    }

    /// True when either a pending file or a remote reference exists.
    pub fn is_present(&self) -> bool {
        self.pending.is_some() || self.remote.is_some()
    }

    /// Stores `file` as pending, returning the new preview and the one it replaced.
    pub(crate) fn attach(&mut self, file: PendingFile) -> (PreviewRef, Option<PreviewRef>) {
        let preview = PreviewRef::new();
        self.pending = Some(file);
        let replaced = self.preview.replace(preview.clone());
        (preview, replaced)
    }

    /// Drops the pending file; the remote reference is untouched.
    pub(crate) fn detach(&mut self) -> Option<PreviewRef> {
        self.pending = None;
        self.preview.take()
    }
}

/// Either end of an attachment: the document itself or a top-level record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentTarget {
    Document {
        slot: String,
    },
    Record {
        collection: String,
        index: usize,
        slot: String,
    },
}

impl AttachmentTarget {
    pub fn document(slot: impl Into<String>) -> Self {
        AttachmentTarget::Document { slot: slot.into() }
    }

    pub fn record(collection: impl Into<String>, index: usize, slot: impl Into<String>) -> Self {
        AttachmentTarget::Record {
            collection: collection.into(),
            index,
            slot: slot.into(),
        }
    }

    pub fn slot(&self) -> &str {
        match self {
            AttachmentTarget::Document { slot } | AttachmentTarget::Record { slot, .. } => slot,
        }
    }
}

impl Display for AttachmentTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentTarget::Document { slot } => write!(f, "`{slot}`"),
            AttachmentTarget::Record {
                collection,
                index,
                slot,
            } => write!(f, "`{slot}` of `{collection}` row {index}"),
        }
    }
}

/// Value stored under a declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    List(Vec<String>),
    Records(Vec<Record>),
    Attachment(Attachment),
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        FieldValue::Scalar(value)
    }
}

/// A record: the document root or an element of a nested collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used to prepare templates for `append_record`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_scalar(self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with(name, FieldValue::Scalar(value.into()))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        match self.fields.get(name) {
            Some(FieldValue::Scalar(scalar)) => Some(scalar),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.fields.get(name) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn records(&self, name: &str) -> Option<&[Record]> {
        match self.fields.get(name) {
            Some(FieldValue::Records(records)) => Some(records),
            _ => None,
        }
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        match self.fields.get(name) {
            Some(FieldValue::Attachment(attachment)) => Some(attachment),
            _ => None,
        }
    }

    /// Every live preview reference held by this record and its sub-records.
    pub fn previews(&self) -> Vec<PreviewRef> {
        let mut previews = Vec::new();
        self.collect_previews(&mut previews);
        previews
    }

    fn collect_previews(&self, out: &mut Vec<PreviewRef>) {
        for value in self.fields.values() {
            match value {
                FieldValue::Attachment(attachment) => out.extend(attachment.preview().cloned()),
                FieldValue::Records(records) => {
                    records.iter().for_each(|record| record.collect_previews(out));
                }
                FieldValue::Scalar(_) | FieldValue::List(_) => {}
            }
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub(crate) fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }
}

/// The root editable entity of one form.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Absent until the first successful create.
    pub id: Option<DocumentId>,
    pub root: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_keep_integer_numbers() {
        assert_eq!(Scalar::from(1500).to_json(), serde_json::json!(1500));
        assert_eq!(Scalar::from(12.5).to_wire_string(), "12.5");
        assert_eq!(Scalar::from(f64::NAN), Scalar::Text("NaN".to_string()));
        assert_eq!(Scalar::from(true).to_wire_string(), "true");
    }

    #[test]
    fn attachment_equality_ignores_preview() {
        let file = PendingFile::new("flag.png", "image/png", vec![1, 2, 3]);
        let mut a = Attachment::existing("uploads/a.png");
        let mut b = Attachment::existing("uploads/a.png");
        a.attach(file.clone());
        b.attach(file);

        assert_ne!(a.preview(), b.preview());
        assert_eq!(a, b);
    }

    #[test]
    fn attach_replaces_pending_and_keeps_remote() {
        let mut attachment = Attachment::existing("uploads/logo.png");
        let (first, replaced) =
            attachment.attach(PendingFile::new("a.png", "image/png", vec![1]));
        assert!(replaced.is_none());

        let (second, replaced) =
            attachment.attach(PendingFile::new("b.png", "image/png", vec![2]));
        assert_eq!(replaced, Some(first));
        assert_eq!(attachment.preview(), Some(&second));
        assert_eq!(attachment.pending().unwrap().file_name, "b.png");
        assert_eq!(attachment.remote(), Some("uploads/logo.png"));

        assert_eq!(attachment.detach(), Some(second));
        assert!(attachment.pending().is_none());
        assert_eq!(attachment.remote(), Some("uploads/logo.png"));
    }

    #[test]
    fn pending_file_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Banner.MP4");
        std::fs::write(&path, b"video").unwrap();

        let file = PendingFile::from_path(&path).unwrap();

        assert_eq!(file.file_name, "Banner.MP4");
        assert_eq!(file.content_type, "video/mp4");
        assert_eq!(file.bytes, b"video");
    }

    #[test]
    fn target_display_names_row() {
        let target = AttachmentTarget::record("teams", 2, "flag");
        assert_eq!(target.to_string(), "`flag` of `teams` row 2");
        assert_eq!(target.slot(), "flag");
    }
}
