//! Flourish - Task & Care Progression Engine
//!
//! Flourish users grow a virtual plant by completing real-life wellness tasks.
//! This crate holds the logic behind that loop: scheduling recurring tasks,
//! deriving completion statistics and streaks, and counting down the timed
//! nutrient effects applied to a plant.
//!
//! # Core Concepts
//!
//! - **Explicit store**: a [`StateManager`] actor owns the document store and is
//!   cloned into every service; there is no global state
//! - **Fresh reads**: stats and views are derived from a fresh list on each call
//! - **Local days**: "today", day buckets and streaks follow the [`clock::Clock`]'s
//!   local calendar
//! - **Compare before write**: nutrient ticks only persist when the effect list changed
//!
//! # Modules
//!
//! - [`domain`] - Templates, task instances, plants and nutrients
//! - [`state`] - StateManager actor over a `docstore::DocumentStore`
//! - [`catalog`] - Template and nutrient catalogs and seeding
//! - [`progression`] - Daily/upcoming views, completion, recurrence and stats
//! - [`nutrient`] - Nutrient application and countdown timers
//! - [`care`] - Plant care signal fired by task completion
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod care;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod nutrient;
pub mod progression;
pub mod state;

// Re-export commonly used types
pub use care::{CareSignal, PlantCare};
pub use catalog::{TaskCatalog, default_nutrients, default_templates};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ProgressionConfig};
pub use domain::{
    ActiveNutrientEffect, CareType, EnrichedTask, Nutrient, PlantInstance, TaskCategory, TaskInstance, TaskStatus,
    TaskTemplate,
};
pub use error::EngineError;
pub use nutrient::{NutrientService, NutrientTicker, PlantFocus, TickOutcome, TimerHandle, format_remaining, schedule};
pub use progression::{CompletionOutcome, DayBucket, MAX_UPCOMING_DAYS, ProgressionEngine, TaskStats};
pub use state::{StateCommand, StateError, StateEvent, StateManager, StateResponse};
