//! Ordered resource lifecycle: listing, detail, stats, create, update, delete, reorder, toggle.

mod commands;
mod queries;
mod service;
pub mod types;

pub use service::{METRIC_MEDIA_DELETE_FAILED, METRIC_MEDIA_UPLOAD_FAILED, ResourceService};
pub use types::{
    CreateResource, DeleteOutcome, ListQuery, OrphanedMedia, ReorderItem, ResourceError,
    UpdateResource, parse_reorder_items,
};
