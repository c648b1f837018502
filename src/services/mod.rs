//! Create, edit, submit and delete flows built on the form store.

use thiserror::Error;

use crate::forms::FormError;
use crate::repository::errors::RepositoryError;

pub mod checks;
pub mod editor;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("`{left}` has {left_len} entries but `{right}` has {right_len}")]
    Misaligned {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;
