//! Applying nutrients to plants

use tracing::{debug, info};

use crate::catalog::TaskCatalog;
use crate::domain::{Nutrient, PlantInstance};
use crate::error::EngineError;
use crate::state::StateManager;

/// Applies catalog nutrients to stored plants
#[derive(Clone)]
pub struct NutrientService {
    state: StateManager,
    catalog: TaskCatalog,
    level_step: u8,
}

impl NutrientService {
    pub fn new(state: StateManager, level_step: u8) -> Self {
        Self {
            catalog: TaskCatalog::new(state.clone()),
            state,
            level_step,
        }
    }

    /// Raise the plant's levels, start the nutrient's effect and persist the whole plant
    pub async fn apply_nutrient(&self, plant_id: &str, nutrient: &Nutrient) -> Result<PlantInstance, EngineError> {
        debug!(%plant_id, nutrient_id = %nutrient.id, "apply_nutrient: called");
        let mut plant: PlantInstance = self.state.get_required(plant_id).await?;
        plant.apply_nutrient(nutrient, self.level_step);
        let stored = self.state.update(&plant).await?;
        info!(
            %plant_id,
            nutrient = %nutrient.name,
            water_level = stored.water_level,
            care_level = stored.care_level,
            "Nutrient applied"
        );
        Ok(stored)
    }

    /// Look the nutrient up in the catalog, then apply it
    pub async fn apply_nutrient_by_id(&self, plant_id: &str, nutrient_id: &str) -> Result<PlantInstance, EngineError> {
        debug!(%plant_id, %nutrient_id, "apply_nutrient_by_id: called");
        let nutrient = self.catalog.require_nutrient(nutrient_id).await?;
        self.apply_nutrient(plant_id, &nutrient).await
    }
}
