//! Content editor for the travel portal admin dashboard.
//!
//! The `data` feature provides the schema-driven [`forms::store::NestedFormStore`]
//! used by every edit screen (departure cities, itineraries, footers,
//! tournaments, banners). The `client` feature adds the REST client and the
//! create/edit/submit/delete flows that drive it.

#[cfg(feature = "data")]
pub mod domain;
#[cfg(feature = "data")]
pub mod dto;
#[cfg(feature = "data")]
pub mod forms;
#[cfg(feature = "client")]
pub mod models;
#[cfg(feature = "client")]
pub mod repository;
#[cfg(feature = "client")]
pub mod services;
