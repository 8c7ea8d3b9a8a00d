//! Nutrient effects: applying nutrients and counting their effects down

mod effects;
mod service;
mod timer;

pub use effects::{decay, format_remaining};
pub use service::NutrientService;
pub use timer::{NutrientTicker, PlantFocus, Tick, TickOutcome, TimerHandle, schedule};
