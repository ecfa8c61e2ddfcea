//! Request handlers grouped by surface.

mod contacts;
mod health;
mod media;
mod resources;

pub use contacts::*;
pub use health::*;
pub use media::*;
pub use resources::*;

use uuid::Uuid;

use super::error::ApiError;

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid_input("id must be a UUID"))
}

fn parse_u32(name: &str, raw: &str) -> Result<Option<u32>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ApiError::invalid_input(format!("{name} must be a positive integer")))
}
