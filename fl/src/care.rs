//! Plant care signal
//!
//! Completing a plant-care task forwards a care update to the plant
//! collaborator. `PlantCare` is the default collaborator: it stamps the
//! matching `last_*` field and adjusts the plant's levels.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::domain::{CareType, MAX_LEVEL, PlantInstance, raise};
use crate::error::EngineError;
use crate::state::StateManager;

/// Receiver of care updates fired by task completion
#[async_trait]
pub trait CareSignal: Send + Sync {
    async fn update_care(&self, plant_id: &str, care: CareType) -> Result<(), EngineError>;
}

/// Care collaborator backed by the plant documents in the store
pub struct PlantCare {
    state: StateManager,
    clock: Arc<dyn Clock>,
    fertilize_step: u8,
}

impl PlantCare {
    pub fn new(state: StateManager, clock: Arc<dyn Clock>, fertilize_step: u8) -> Self {
        Self {
            state,
            clock,
            fertilize_step,
        }
    }
}

#[async_trait]
impl CareSignal for PlantCare {
    async fn update_care(&self, plant_id: &str, care: CareType) -> Result<(), EngineError> {
        debug!(%plant_id, %care, "update_care: called");
        let plant: PlantInstance = self.state.get_required(plant_id).await?;
        let now = self.clock.now().timestamp_millis();

        let patch = match care {
            CareType::Water => json!({
                "last_watered": now,
                "water_level": MAX_LEVEL,
            }),
            CareType::Fertilize => json!({
                "last_fertilized": now,
                "care_level": raise(plant.care_level, self.fertilize_step),
            }),
            CareType::Repot => json!({
                "last_repotted": now,
            }),
        };

        self.state.update_fields::<PlantInstance>(plant_id, patch).await?;
        info!(%plant_id, %care, "Plant care recorded");
        Ok(())
    }
}
