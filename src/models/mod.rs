//! Runtime configuration models.

pub mod config;
