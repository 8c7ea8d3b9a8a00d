//! Domain types for Flourish
//!
//! Core domain types: TaskTemplate, TaskInstance, PlantInstance, Nutrient.
//! All implement the Record trait for DocStore persistence and normalize
//! loosely-typed documents on read.

mod id;
mod lenient;
mod plant;
mod task;
mod template;

pub use id::{generate_id, slugify};
pub use plant::{ActiveNutrientEffect, MAX_LEVEL, Nutrient, PlantInstance, raise};
pub use task::{EnrichedTask, TaskInstance, TaskStatus};
pub use template::{CareType, TaskCategory, TaskTemplate};

// Re-export docstore types for convenience
pub use docstore::{Filter, FilterOp, IndexValue, Record};
