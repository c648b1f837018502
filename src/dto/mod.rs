//! DTOs that cross the boundary to the external content API.

pub mod payload;
