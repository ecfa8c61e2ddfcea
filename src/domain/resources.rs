//! Resource kinds served by the content backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// One of the parallel ordered collections managed through the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Activity,
    AdventureActivity,
    Award,
    BanquetVenue,
    Carousel,
    Event,
    Food,
    FoodStall,
    Gallery,
    Game,
    HomeGallery,
    Offer,
    SelfiePoint,
    SpaAndWellness,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Activity,
        ResourceKind::AdventureActivity,
        ResourceKind::Award,
        ResourceKind::BanquetVenue,
        ResourceKind::Carousel,
        ResourceKind::Event,
        ResourceKind::Food,
        ResourceKind::FoodStall,
        ResourceKind::Gallery,
        ResourceKind::Game,
        ResourceKind::HomeGallery,
        ResourceKind::Offer,
        ResourceKind::SelfiePoint,
        ResourceKind::SpaAndWellness,
    ];

    /// Stable identifier persisted in the `kind` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Activity => "activity",
            ResourceKind::AdventureActivity => "adventure-activity",
            ResourceKind::Award => "award",
            ResourceKind::BanquetVenue => "banquet-venue",
            ResourceKind::Carousel => "carousel",
            ResourceKind::Event => "event",
            ResourceKind::Food => "food",
            ResourceKind::FoodStall => "food-stall",
            ResourceKind::Gallery => "gallery",
            ResourceKind::Game => "game",
            ResourceKind::HomeGallery => "home-gallery",
            ResourceKind::Offer => "offer",
            ResourceKind::SelfiePoint => "selfie-point",
            ResourceKind::SpaAndWellness => "spa-and-wellness",
        }
    }

    /// URL segment under `/api`. Doubles as the cache namespace and media folder.
    pub const fn segment(self) -> &'static str {
        match self {
            ResourceKind::Activity => "activities",
            ResourceKind::AdventureActivity => "adventure-activities",
            ResourceKind::Award => "awards",
            ResourceKind::BanquetVenue => "banquet-venues",
            ResourceKind::Carousel => "carousel",
            ResourceKind::Event => "events",
            ResourceKind::Food => "foods",
            ResourceKind::FoodStall => "food-stalls",
            ResourceKind::Gallery => "gallery",
            ResourceKind::Game => "games",
            ResourceKind::HomeGallery => "home-gallery",
            ResourceKind::Offer => "offers",
            ResourceKind::SelfiePoint => "selfie-points",
            ResourceKind::SpaAndWellness => "spa-and-wellness",
        }
    }

    pub const fn cache_namespace(self) -> &'static str {
        self.segment()
    }

    pub const fn media_folder(self) -> &'static str {
        self.segment()
    }

    /// Dense index used for per-kind lookup tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.segment() == segment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| DomainError::UnknownKind(value.to_string()))
    }
}
