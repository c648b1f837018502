use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found")]
    NotFound,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RepositoryError::ConnectionError(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            RepositoryError::UnexpectedResponse(format!("Cannot decode response: {err}"))
        } else if let Some(status) = err.status() {
            RepositoryError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RepositoryError::ConnectionError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::UnexpectedResponse(format!("Invalid JSON: {err}"))
    }
}
