//! Application services and the ports they depend on.

pub mod contact;
pub mod error;
pub mod media;
pub mod pagination;
pub mod repos;
pub mod resources;
