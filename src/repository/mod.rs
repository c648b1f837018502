//! Access to the external content API.
//!
//! The API is the only persistence the dashboard has; every screen lists,
//! fetches, creates, updates and deletes entries of one REST resource.

use serde_json::Value;

use crate::domain::types::{DocumentId, ResourcePath};
use crate::dto::payload::WirePayload;
use crate::repository::errors::RepositoryResult;

pub mod errors;
pub mod http;
#[cfg(any(test, feature = "test-mocks"))]
pub mod mock;

pub use http::HttpRepository;

pub trait ContentReader {
    /// `GET <resource>`.
    fn list_entries(&self, resource: &ResourcePath) -> RepositoryResult<Vec<Value>>;
    /// `GET <resource>/<id>`.
    fn fetch_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<Value>;
}

pub trait ContentWriter {
    /// `POST <resource>` with a multipart body.
    fn create_entry(&self, resource: &ResourcePath, payload: WirePayload)
    -> RepositoryResult<Value>;
    /// `PUT <resource>/<id>` with a multipart body.
    fn update_entry(
        &self,
        resource: &ResourcePath,
        id: &DocumentId,
        payload: WirePayload,
    ) -> RepositoryResult<Value>;
    /// `DELETE <resource>/<id>`.
    fn delete_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<()>;
}
