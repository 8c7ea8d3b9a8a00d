//! Plant instances and their timed nutrient effects

use chrono::{DateTime, Utc};
use docstore::Record;
use serde::{Deserialize, Serialize};

use super::id::{generate_id, slugify};
use super::lenient;

/// Upper bound for water and care levels
pub const MAX_LEVEL: u8 = 100;

/// A time-bounded bonus applied to a plant. Never retained at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNutrientEffect {
    pub nutrient_id: String,

    #[serde(default)]
    pub nutrient_name: String,

    #[serde(default, deserialize_with = "lenient::u32_lenient")]
    pub remaining_seconds: u32,
}

impl ActiveNutrientEffect {
    pub fn new(nutrient_id: impl Into<String>, nutrient_name: impl Into<String>, remaining_seconds: u32) -> Self {
        Self {
            nutrient_id: nutrient_id.into(),
            nutrient_name: nutrient_name.into(),
            remaining_seconds,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }
}

/// Catalog entry for something that can be applied to a plant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrient {
    pub id: String,

    pub name: String,

    /// How long the effect lasts once applied
    #[serde(alias = "timer-seconds", deserialize_with = "lenient::u32_lenient")]
    pub timer_seconds: u32,
}

impl Nutrient {
    pub fn new(name: impl Into<String>, timer_seconds: u32) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            name,
            timer_seconds,
        }
    }

    /// The effect this nutrient starts when applied
    pub fn effect(&self) -> ActiveNutrientEffect {
        ActiveNutrientEffect::new(&self.id, &self.name, self.timer_seconds)
    }
}

impl Record for Nutrient {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "nutrients"
    }
}

/// A user's owned plant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantInstance {
    /// Unique identifier
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Species catalog id
    #[serde(default)]
    pub species_id: String,

    /// Hydration, 0-100
    #[serde(default, alias = "waterlevel", deserialize_with = "lenient::level")]
    pub water_level: u8,

    /// Overall care score, 0-100
    #[serde(default, alias = "carelevel", deserialize_with = "lenient::level")]
    pub care_level: u8,

    /// Running nutrient effects in application order
    #[serde(
        default,
        alias = "activeNutrients",
        deserialize_with = "lenient::list_or_encoded"
    )]
    pub active_nutrients: Vec<ActiveNutrientEffect>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_watered: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_fertilized: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_repotted: Option<DateTime<Utc>>,
}

impl PlantInstance {
    /// Create a plant with a generated id and empty levels
    pub fn new(user_id: impl Into<String>, species_id: impl Into<String>) -> Self {
        Self::with_id(generate_id(), user_id, species_id)
    }

    /// Create with a specific id (for testing or import)
    pub fn with_id(id: impl Into<String>, user_id: impl Into<String>, species_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            species_id: species_id.into(),
            water_level: 0,
            care_level: 0,
            active_nutrients: Vec::new(),
            last_watered: None,
            last_fertilized: None,
            last_repotted: None,
        }
    }

    /// Builder method to set both levels
    pub fn with_levels(mut self, water_level: u8, care_level: u8) -> Self {
        self.water_level = water_level.min(MAX_LEVEL);
        self.care_level = care_level.min(MAX_LEVEL);
        self
    }

    /// Raise water and care by `step` and start the nutrient's effect.
    /// Repeated applications stack as separate effects.
    pub fn apply_nutrient(&mut self, nutrient: &Nutrient, step: u8) {
        self.water_level = raise(self.water_level, step);
        self.care_level = raise(self.care_level, step);
        self.active_nutrients.push(nutrient.effect());
    }

    /// Remaining seconds of the longest-running effect
    pub fn longest_remaining(&self) -> Option<u32> {
        self.active_nutrients.iter().map(|e| e.remaining_seconds).max()
    }
}

/// Add to a level, clamped to MAX_LEVEL
pub fn raise(level: u8, step: u8) -> u8 {
    level.saturating_add(step).min(MAX_LEVEL)
}

impl Record for PlantInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "plant_instances"
    }
}
