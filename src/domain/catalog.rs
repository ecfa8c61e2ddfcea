//! Schemas for every resource kind.

use super::resources::ResourceKind;
use super::schema::{
    DEFAULT_SORT, FieldDefault, FieldKind, FieldSpec, MediaSlot, ResourceSchema, SortField,
    SortKey,
};

const RATING_0_5: FieldKind = FieldKind::Number {
    min: 0.0,
    max: Some(5.0),
};

const ACTIVITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 200).required(),
    FieldSpec::text("detailed_description", 1000).required(),
    FieldSpec::text("category", 50).required().filter_eq(),
    FieldSpec::text("duration", 50).required(),
    FieldSpec::choice("difficulty", &["Easy", "Medium", "Hard"])
        .required()
        .filter_eq(),
    FieldSpec::text("age_group", 50).required(),
    FieldSpec::list("features", 100),
    FieldSpec::new("rating", RATING_0_5),
    FieldSpec::text("icon", 50).required(),
];

const ADVENTURE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name", 100).required(),
    FieldSpec::text("description", 500).required(),
    FieldSpec::text("detailed_description", 2000).required(),
    FieldSpec::choice("category", &["indoor", "outdoor", "water", "kids"])
        .required()
        .filter_eq(),
    FieldSpec::text("icon", 50).required(),
    FieldSpec::choice(
        "age_group",
        &["kids", "teens-adults", "kids-adults", "all-ages"],
    )
    .required()
    .filter_eq(),
    FieldSpec::choice("difficulty", &["easy", "moderate", "hard"])
        .required()
        .filter_eq(),
    FieldSpec::choice("timing", &["all-day", "morning-evening", "evening"]).required(),
    FieldSpec::text("duration", 50).required(),
    FieldSpec::text("capacity", 50).required(),
    FieldSpec::list("highlights", 100),
    FieldSpec::new(
        "rating",
        FieldKind::Number {
            min: 1.0,
            max: Some(5.0),
        },
    ),
    FieldSpec::list("equipment", 100),
    FieldSpec::list("safety_requirements", 200),
    FieldSpec::new("weather_dependent", FieldKind::Boolean)
        .with_default(FieldDefault::Bool(false)),
    FieldSpec::new("min_age", FieldKind::Integer { min: 0, max: 100 }),
    FieldSpec::new("max_age", FieldKind::Integer { min: 0, max: 100 }),
    FieldSpec::text("location", 200),
];

const AWARD_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 200).required(),
    FieldSpec::text("description", 500).required(),
    FieldSpec::new("year", FieldKind::Year { min: 1900 })
        .required()
        .filter_eq(),
    FieldSpec::text("organization", 100),
    FieldSpec::text("category", 50).filter_eq(),
];

const BANQUET_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("capacity", 50).required(),
    FieldSpec::text("area", 50).required(),
    FieldSpec::text("ac", 100).required(),
    FieldSpec::text("description", 1000).required(),
    FieldSpec::list("features", 200),
    FieldSpec::new(
        "base_price",
        FieldKind::Number {
            min: 0.0,
            max: None,
        },
    ),
    FieldSpec::text("currency", 3),
    FieldSpec::list("pricing_includes", 200),
    FieldSpec::text("location", 200),
];

const CAROUSEL_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 500).required(),
    FieldSpec::text("button_text", 50),
    FieldSpec::text("button_link", 500),
];

const EVENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 200).required(),
    FieldSpec::text("description", 1000).required(),
    FieldSpec::new("date", FieldKind::Date).required(),
    FieldSpec::text("time", 50).required(),
    FieldSpec::text("location", 200).required(),
    FieldSpec::new(
        "price",
        FieldKind::Number {
            min: 0.0,
            max: None,
        },
    ),
    FieldSpec::new(
        "capacity",
        FieldKind::Integer {
            min: 1,
            max: i32::MAX as i64,
        },
    ),
    FieldSpec::text("category", 100).required().filter_eq(),
];

const FOOD_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name", 100).required(),
    FieldSpec::text("description", 500),
    FieldSpec::text("category", 50).required().filter_eq(),
];

const FOOD_STALL_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 500).required(),
    FieldSpec::text("location", 100),
];

const GALLERY_FIELDS: &[FieldSpec] = &[FieldSpec::choice("type", &["image", "video"])
    .required()
    .filter_eq()];

const GAME_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 500).required(),
    FieldSpec::new(
        "categories",
        FieldKind::TextList {
            item_max: 10,
            choices: Some(&["adult", "child", "common"]),
        },
    )
    .with_default(FieldDefault::List(&["common"]))
    .filter_contains(),
    FieldSpec::new("is_upcoming", FieldKind::Boolean)
        .with_default(FieldDefault::Bool(false))
        .filter_eq(),
];

const HOME_GALLERY_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 200).required(),
    FieldSpec::text("detailed_description", 1000).required(),
    FieldSpec::text("category", 50).required().filter_eq(),
    FieldSpec::text("capacity", 50).required(),
    FieldSpec::text("area", 50).required(),
    FieldSpec::list("features", 100),
    FieldSpec::new("rating", RATING_0_5),
    FieldSpec::text("icon", 50).required(),
];

const SELFIE_POINT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", 100).required(),
    FieldSpec::text("description", 500).required(),
];

const SPA_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name", 200).required(),
    FieldSpec::text("description", 1000),
    FieldSpec::text("location", 200).required(),
    FieldSpec::list("services", 100),
    FieldSpec::text("contact", 100),
    FieldSpec::new("rating", RATING_0_5),
];

const IMAGE: &[MediaSlot] = &[MediaSlot::single("image")];

static SCHEMAS: [ResourceSchema; 14] = [
    ResourceSchema {
        kind: ResourceKind::Activity,
        fields: ACTIVITY_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::AdventureActivity,
        fields: ADVENTURE_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Award,
        fields: AWARD_FIELDS,
        media: &[MediaSlot::single("image").optional()],
        sort: &[
            SortKey::desc(SortField::Field("year")),
            SortKey::asc(SortField::Order),
            SortKey::desc(SortField::CreatedAt),
        ],
    },
    ResourceSchema {
        kind: ResourceKind::BanquetVenue,
        fields: BANQUET_FIELDS,
        media: &[MediaSlot::many("images")],
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Carousel,
        fields: CAROUSEL_FIELDS,
        media: &[
            MediaSlot::single("desktop_image"),
            MediaSlot::single("mobile_image"),
        ],
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Event,
        fields: EVENT_FIELDS,
        media: IMAGE,
        sort: &[
            SortKey::asc(SortField::Order),
            SortKey::asc(SortField::Field("date")),
        ],
    },
    ResourceSchema {
        kind: ResourceKind::Food,
        fields: FOOD_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::FoodStall,
        fields: FOOD_STALL_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Gallery,
        fields: GALLERY_FIELDS,
        media: &[MediaSlot::single("media")],
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Game,
        fields: GAME_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::HomeGallery,
        fields: HOME_GALLERY_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::Offer,
        fields: &[],
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::SelfiePoint,
        fields: SELFIE_POINT_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
    ResourceSchema {
        kind: ResourceKind::SpaAndWellness,
        fields: SPA_FIELDS,
        media: IMAGE,
        sort: DEFAULT_SORT,
    },
];

const ADVENTURE_STATS: &[&str] = &["category", "difficulty", "age_group"];

impl ResourceKind {
    pub fn schema(self) -> &'static ResourceSchema {
        &SCHEMAS[self.index()]
    }

    /// Fields bucketed by `GET /<segment>/stats`. Empty when the kind has no stats route.
    pub fn stats_groups(self) -> &'static [&'static str] {
        match self {
            ResourceKind::AdventureActivity => ADVENTURE_STATS,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::raw_fields::RawFields;
    use crate::domain::schema::MediaCardinality;

    #[test]
    fn every_kind_resolves_to_its_own_schema() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.schema().kind, kind);
        }
    }

    #[test]
    fn field_and_media_names_never_collide() {
        for kind in ResourceKind::ALL {
            let schema = kind.schema();
            let mut names = HashSet::new();
            for field in schema.fields {
                assert!(names.insert(field.name), "{kind}: duplicate {}", field.name);
            }
            for slot in schema.media {
                assert!(names.insert(slot.name), "{kind}: duplicate {}", slot.name);
            }
            assert!(!names.contains("order") && !names.contains("is_active"));
        }
    }

    #[test]
    fn stats_groups_name_known_fields() {
        for kind in ResourceKind::ALL {
            let schema = kind.schema();
            for name in kind.stats_groups() {
                assert!(schema.field(name).is_some(), "{kind}: unknown stats field {name}");
            }
        }
        assert_eq!(ResourceKind::AdventureActivity.stats_groups().len(), 3);
        assert!(ResourceKind::Offer.stats_groups().is_empty());
    }

    #[test]
    fn awards_sort_by_year_first() {
        let sort = ResourceKind::Award.schema().sort;
        assert_eq!(sort[0], SortKey::desc(SortField::Field("year")));
    }

    #[test]
    fn banquet_venues_hold_many_images() {
        let slot = ResourceKind::BanquetVenue
            .schema()
            .media_slot("images")
            .expect("images slot");
        assert_eq!(slot.cardinality, MediaCardinality::Many);
        assert!(!slot.required);
    }

    #[test]
    fn offer_needs_only_an_image() {
        let schema = ResourceKind::Offer.schema();
        let errors = schema.validate_create(&RawFields::new(), &[]).unwrap_err();
        assert_eq!(errors.violations.len(), 1);
        assert!(errors.contains("image"));
        assert!(schema.validate_create(&RawFields::new(), &["image"]).is_ok());
    }

    #[test]
    fn award_image_is_optional() {
        let raw = RawFields::new()
            .with("title", "Best Resort")
            .with("description", "Regional travel award")
            .with("year", "2023");
        assert!(ResourceKind::Award.schema().validate_create(&raw, &[]).is_ok());
    }

    #[test]
    fn events_require_a_category() {
        let raw = RawFields::new()
            .with("title", "Sound and light show")
            .with("description", "History of the fort after dark")
            .with("date", "2025-11-02")
            .with("time", "19:00")
            .with("location", "Main courtyard");
        let schema = ResourceKind::Event.schema();
        let errors = schema.validate_create(&raw, &["image"]).unwrap_err();
        assert_eq!(errors.violations.len(), 1);
        assert!(errors.contains("category"));

        let raw = raw.with("category", "Cultural");
        assert!(schema.validate_create(&raw, &["image"]).is_ok());
    }

    #[test]
    fn home_gallery_lists_every_missing_detail() {
        let raw = RawFields::new()
            .with("title", "Sheesh Mahal")
            .with("description", "Mirror work suite")
            .with("category", "rooms");
        let errors = ResourceKind::HomeGallery
            .schema()
            .validate_create(&raw, &["image"])
            .unwrap_err();
        for field in ["detailed_description", "capacity", "area", "icon"] {
            assert!(errors.contains(field), "missing violation for {field}");
        }
        assert_eq!(errors.violations.len(), 4);
    }

    #[test]
    fn carousel_requires_both_images() {
        let raw = RawFields::new()
            .with("title", "Welcome")
            .with("description", "Hero banner");
        let errors = ResourceKind::Carousel
            .schema()
            .validate_create(&raw, &["desktop_image"])
            .unwrap_err();
        assert!(errors.contains("mobile_image"));
        assert!(!errors.contains("desktop_image"));
    }
}
