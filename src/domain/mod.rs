//! Domain types shared by the form store and its callers.

pub mod document;
pub mod schema;
pub mod types;
