use std::sync::Arc;

use serde_json::Value;

use crate::domain::schema::FormSchema;
use crate::domain::types::DocumentId;
use crate::forms::FormError;
use crate::forms::store::NestedFormStore;
use crate::repository::{ContentReader, ContentWriter};
use crate::services::ServiceResult;

/// Opens a blank form for the create flow.
pub fn open_create(schema: Arc<FormSchema>) -> NestedFormStore {
    log::debug!("Opening blank `{}` form", schema.name);
    NestedFormStore::initialize(schema)
}

/// Fetches an entry and opens it for editing.
///
/// A remote record that does not fit the schema is not fatal: the form opens
/// with defaults, still bound to `id`.
pub fn open_edit<R>(
    repo: &R,
    schema: Arc<FormSchema>,
    id: &DocumentId,
) -> ServiceResult<NestedFormStore>
where
    R: ContentReader + ?Sized,
{
    let remote = repo.fetch_entry(&schema.resource, id).map_err(|err| {
        log::error!("Failed to fetch `{}` {id}: {err}", schema.name);
        err
    })?;

    match NestedFormStore::hydrate(schema.clone(), &remote) {
        Ok(mut store) => {
            if store.id().is_none() {
                store.set_id(id.clone());
            }
            Ok(store)
        }
        Err(err @ FormError::ShapeMismatch { .. }) => {
            log::warn!("Cannot load `{}` {id} for editing, using defaults: {err}", schema.name);
            let mut store = NestedFormStore::initialize(schema);
            store.set_id(id.clone());
            Ok(store)
        }
        Err(err) => Err(err.into()),
    }
}

/// Serializes the form and sends it: create when it has no id yet, update otherwise.
///
/// The store is left untouched so a failed request can be retried; after a
/// successful submit the caller discards it and refetches the list.
pub fn submit<R>(repo: &R, store: &NestedFormStore) -> ServiceResult<Value>
where
    R: ContentWriter + ?Sized,
{
    let payload = store.serialize()?;
    let resource = &store.schema().resource;

    let response = match store.id() {
        Some(id) => repo.update_entry(resource, id, payload),
        None => repo.create_entry(resource, payload),
    }
    .map_err(|err| {
        log::error!("Failed to save `{}`: {err}", store.schema().name);
        err
    })?;

    log::info!("Saved `{}` {:?}", store.schema().name, store.id());
    Ok(response)
}

/// Deletes an entry after the user confirms.
///
/// Returns `false` without calling the API when the confirmation is declined.
pub fn delete_entry<R, F>(
    repo: &R,
    schema: &FormSchema,
    id: &DocumentId,
    confirm: F,
) -> ServiceResult<bool>
where
    R: ContentWriter + ?Sized,
    F: FnOnce(&str) -> bool,
{
    let prompt = format!("Are you sure you want to delete this {}?", schema.name);
    if !confirm(&prompt) {
        log::debug!("Deletion of `{}` {id} cancelled", schema.name);
        return Ok(false);
    }

    repo.delete_entry(&schema.resource, id).map_err(|err| {
        log::error!("Failed to delete `{}` {id}: {err}", schema.name);
        err
    })?;
    log::info!("Deleted `{}` {id}", schema.name);
    Ok(true)
}

/// Lists the entries of the schema's resource.
pub fn list_entries<R>(repo: &R, schema: &FormSchema) -> ServiceResult<Vec<Value>>
where
    R: ContentReader + ?Sized,
{
    let entries = repo.list_entries(&schema.resource).map_err(|err| {
        log::error!("Failed to list `{}`: {err}", schema.name);
        err
    })?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use serde_json::json;

    use super::*;
    use crate::domain::document::{AttachmentTarget, PendingFile};
    use crate::domain::types::ResourcePath;
    use crate::dto::payload::WirePayload;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use crate::services::ServiceError;

    fn schema() -> Arc<FormSchema> {
        Arc::new(
            FormSchema::from_value(json!({
                "name": "tournament",
                "resource": "tournaments",
                "fields": [
                    {"name": "title", "kind": "text"},
                    {"name": "teams", "kind": "collection", "record": [
                        {"name": "name", "kind": "text"},
                        {"name": "flag", "kind": "attachment", "upload": "teamFlags", "required": true}
                    ]}
                ]
            }))
            .unwrap(),
        )
    }

    fn id(value: &str) -> DocumentId {
        DocumentId::new(value).unwrap()
    }

    #[test]
    fn open_edit_hydrates_remote_record() {
        let mut repo = MockRepository::new();
        repo.expect_fetch_entry()
            .with(eq(ResourcePath::new("tournaments").unwrap()), eq(id("t1")))
            .times(1)
            .returning(|_, _| {
                Ok(json!({
                    "_id": "t1",
                    "title": "Asia Cup",
                    "teams": [{"name": "India", "flag": "uploads/in.png"}]
                }))
            });

        let store = open_edit(&repo, schema(), &id("t1")).unwrap();

        assert_eq!(store.id(), Some(&id("t1")));
        assert_eq!(store.collection_len("teams").unwrap(), 1);
    }

    #[test]
    fn open_edit_falls_back_to_defaults_on_shape_mismatch() {
        let mut repo = MockRepository::new();
        repo.expect_fetch_entry()
            .returning(|_, _| Ok(json!({"title": "Asia Cup", "teams": "India"})));

        let store = open_edit(&repo, schema(), &id("t1")).unwrap();

        assert_eq!(store.id(), Some(&id("t1")));
        let blank = open_create(schema());
        assert_eq!(store.document().root, blank.document().root);
    }

    #[test]
    fn open_edit_propagates_fetch_errors() {
        let mut repo = MockRepository::new();
        repo.expect_fetch_entry()
            .returning(|_, _| Err(RepositoryError::NotFound));

        let result = open_edit(&repo, schema(), &id("missing"));

        assert!(matches!(
            result,
            Err(ServiceError::Repository(RepositoryError::NotFound))
        ));
    }

    #[test]
    fn submit_creates_new_entries() {
        let mut store = open_create(schema());
        store.set_scalar("title", "World Cup").unwrap();
        store
            .attach_file(
                &AttachmentTarget::record("teams", 0, "flag"),
                PendingFile::new("in.png", "image/png", vec![1, 2]),
            )
            .unwrap();

        let mut repo = MockRepository::new();
        repo.expect_create_entry()
            .withf(|resource, payload: &WirePayload| {
                resource.as_str() == "tournaments"
                    && payload.text("title") == Some("World Cup")
                    && payload.files("teamFlags").len() == 1
            })
            .times(1)
            .returning(|_, _| Ok(json!({"_id": "new"})));
        repo.expect_update_entry().never();

        let response = submit(&repo, &store).unwrap();

        assert_eq!(response["_id"], "new");
    }

    #[test]
    fn submit_updates_existing_entries() {
        let store = NestedFormStore::hydrate(
            schema(),
            &json!({"_id": "t1", "teams": [{"name": "India", "flag": "uploads/in.png"}]}),
        )
        .unwrap();

        let mut repo = MockRepository::new();
        repo.expect_update_entry()
            .withf(|_, id, payload: &WirePayload| {
                id.as_str() == "t1"
                    && payload.json("teams")
                        == Some(json!([{"name": "India", "flag": "uploads/in.png"}]))
            })
            .times(1)
            .returning(|_, _, _| Ok(serde_json::Value::Null));
        repo.expect_create_entry().never();

        submit(&repo, &store).unwrap();
    }

    #[test]
    fn submit_is_blocked_by_missing_attachment() {
        let store = open_create(schema());
        let mut repo = MockRepository::new();
        repo.expect_create_entry().never();

        let result = submit(&repo, &store);

        assert!(matches!(
            result,
            Err(ServiceError::Form(FormError::MissingRequiredAttachment(_)))
        ));
    }

    #[test]
    fn delete_requires_confirmation() {
        let schema = schema();
        let mut repo = MockRepository::new();
        repo.expect_delete_entry()
            .with(eq(schema.resource.clone()), eq(id("t1")))
            .times(1)
            .returning(|_, _| Ok(()));

        let declined = delete_entry(&repo, &schema, &id("t1"), |_| false).unwrap();
        let confirmed = delete_entry(&repo, &schema, &id("t1"), |prompt| {
            prompt.contains("tournament")
        })
        .unwrap();

        assert!(!declined);
        assert!(confirmed);
    }

    #[test]
    fn list_entries_returns_remote_items() {
        let mut repo = MockRepository::new();
        repo.expect_list_entries()
            .times(1)
            .returning(|_| Ok(vec![json!({"_id": "a"}), json!({"_id": "b"})]));

        let entries = list_entries(&repo, &schema()).unwrap();

        assert_eq!(entries.len(), 2);
    }
}
