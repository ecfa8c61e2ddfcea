//! Fortview content backend.
//!
//! Ordered, admin-managed resort collections with externally hosted media and an
//! in-process response cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
