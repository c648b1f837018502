//! Mock repository implementations for isolating services in tests.

use mockall::mock;
use serde_json::Value;

use crate::domain::types::{DocumentId, ResourcePath};
use crate::dto::payload::WirePayload;
use crate::repository::errors::RepositoryResult;
use crate::repository::{ContentReader, ContentWriter};

mock! {
    pub Repository {}

    impl ContentReader for Repository {
        fn list_entries(&self, resource: &ResourcePath) -> RepositoryResult<Vec<Value>>;
        fn fetch_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<Value>;
    }

    impl ContentWriter for Repository {
        fn create_entry(&self, resource: &ResourcePath, payload: WirePayload)
        -> RepositoryResult<Value>;
        fn update_entry(
            &self,
            resource: &ResourcePath,
            id: &DocumentId,
            payload: WirePayload,
        ) -> RepositoryResult<Value>;
        fn delete_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<()>;
    }
}
