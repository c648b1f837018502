//! Blocking `reqwest` implementation of the content repository.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde_json::Value;

use crate::domain::types::{DocumentId, ResourcePath};
use crate::dto::payload::{PartBody, WirePayload};
use crate::models::config::ClientConfig;
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{ContentReader, ContentWriter};

#[derive(Clone, Debug)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
}

/// Converts the serialized form into a multipart body.
fn multipart_form(payload: WirePayload) -> RepositoryResult<Form> {
    payload
        .parts
        .into_iter()
        .try_fold(Form::new(), |form, part| match part.body {
            PartBody::Text(text) => Ok(form.text(part.name, text)),
            PartBody::File(file) => {
                let body = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.content_type)
                    .map_err(|e| RepositoryError::InvalidPayload(e.to_string()))?;
                Ok(form.part(part.name, body))
            }
        })
}

/// Accepts either a bare array or an object wrapping one under `data`.
fn entries_from(body: Value) -> RepositoryResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RepositoryError::UnexpectedResponse(
                "expected a list of entries".to_string(),
            )),
        },
        _ => Err(RepositoryError::UnexpectedResponse(
            "expected a list of entries".to_string(),
        )),
    }
}

impl HttpRepository {
    pub fn new(config: &ClientConfig) -> RepositoryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, resource: &ResourcePath, id: Option<&DocumentId>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, resource, id),
            None => format!("{}/{}", self.base_url, resource),
        }
    }

    fn send(&self, request: RequestBuilder) -> RepositoryResult<Response> {
        let response = request.send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::error!("Content API responded with {status}: {body}");
            return Err(RepositoryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parses a JSON body; an empty body reads as `null`.
    fn json_body(response: Response) -> RepositoryResult<Value> {
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl ContentReader for HttpRepository {
    fn list_entries(&self, resource: &ResourcePath) -> RepositoryResult<Vec<Value>> {
        let response = self.send(self.client.get(self.endpoint(resource, None)))?;
        entries_from(Self::json_body(response)?)
    }

    fn fetch_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<Value> {
        let response = self.send(self.client.get(self.endpoint(resource, Some(id))))?;
        Self::json_body(response)
    }
}

impl ContentWriter for HttpRepository {
    fn create_entry(
        &self,
        resource: &ResourcePath,
        payload: WirePayload,
    ) -> RepositoryResult<Value> {
        let form = multipart_form(payload)?;
        let response = self.send(
            self.client
                .post(self.endpoint(resource, None))
                .multipart(form),
        )?;
        Self::json_body(response)
    }

    fn update_entry(
        &self,
        resource: &ResourcePath,
        id: &DocumentId,
        payload: WirePayload,
    ) -> RepositoryResult<Value> {
        let form = multipart_form(payload)?;
        let response = self.send(
            self.client
                .put(self.endpoint(resource, Some(id)))
                .multipart(form),
        )?;
        Self::json_body(response)
    }

    fn delete_entry(&self, resource: &ResourcePath, id: &DocumentId) -> RepositoryResult<()> {
        self.send(self.client.delete(self.endpoint(resource, Some(id))))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::document::PendingFile;

    fn repository() -> HttpRepository {
        HttpRepository::new(&ClientConfig {
            api_base_url: "https://cms.example.com/api/".to_string(),
            timeout_secs: 5,
            user_agent: "tests".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn builds_resource_endpoints() {
        let repo = repository();
        let resource = ResourcePath::new("departure-cities").unwrap();
        let id = DocumentId::new("65f0c2").unwrap();

        assert_eq!(
            repo.endpoint(&resource, None),
            "https://cms.example.com/api/departure-cities"
        );
        assert_eq!(
            repo.endpoint(&resource, Some(&id)),
            "https://cms.example.com/api/departure-cities/65f0c2"
        );
    }

    #[test]
    fn reads_wrapped_and_bare_lists() {
        assert_eq!(entries_from(json!([{"a": 1}])).unwrap().len(), 1);
        assert_eq!(entries_from(json!({"data": [{"a": 1}, {"a": 2}]})).unwrap().len(), 2);
        assert!(matches!(
            entries_from(json!({"items": []})),
            Err(RepositoryError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn rejects_invalid_content_type() {
        let mut payload = WirePayload::default();
        payload.push_text("title", "Goa");
        payload.push_file("images", PendingFile::new("a.png", "not a mime", vec![1]));

        assert!(matches!(
            multipart_form(payload),
            Err(RepositoryError::InvalidPayload(_))
        ));
    }
}
