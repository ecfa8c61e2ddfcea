pub mod catalog;
pub mod contact;
pub mod entities;
pub mod error;
pub mod list_input;
pub mod raw_fields;
pub mod resources;
pub mod schema;
