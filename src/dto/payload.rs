//! Multipart submission produced by [`crate::forms::store::NestedFormStore::serialize`].

use serde_json::Value;

use crate::domain::document::PendingFile;

/// Body of a single multipart part.
#[derive(Debug, Clone, PartialEq)]
pub enum PartBody {
    Text(String),
    File(PendingFile),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WirePart {
    pub name: String,
    pub body: PartBody,
}

/// Ordered multipart/form-data parts handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WirePayload {
    pub parts: Vec<WirePart>,
}

impl WirePayload {
    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(WirePart {
            name: name.into(),
            body: PartBody::Text(value.into()),
        });
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: PendingFile) {
        self.parts.push(WirePart {
            name: name.into(),
            body: PartBody::File(file),
        });
    }

    /// First text part with the given name.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match &part.body {
            PartBody::Text(text) if part.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    /// Text part decoded as JSON, for collection parts.
    pub fn json(&self, name: &str) -> Option<Value> {
        self.text(name)
            .and_then(|text| serde_json::from_str(text).ok())
    }

    /// File parts with the given name, in submission order.
    pub fn files(&self, name: &str) -> Vec<&PendingFile> {
        self.parts
            .iter()
            .filter(|part| part.name == name)
            .filter_map(|part| match &part.body {
                PartBody::File(file) => Some(file),
                PartBody::Text(_) => None,
            })
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part.body, PartBody::File(_)))
            .count()
    }
}
