//! Task and nutrient catalogs
//!
//! Templates and nutrients are read-only to the engine. Seeding only creates
//! entries that are missing; it never rewrites an existing one.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::{Nutrient, TaskCategory, TaskTemplate};
use crate::error::EngineError;
use crate::state::{StateError, StateManager};

/// Read access to catalog templates and nutrients
#[derive(Clone)]
pub struct TaskCatalog {
    state: StateManager,
}

impl TaskCatalog {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    /// Look up a template
    pub async fn get_template(&self, id: &str) -> Result<Option<TaskTemplate>, StateError> {
        debug!(%id, "get_template: called");
        self.state.get::<TaskTemplate>(id).await
    }

    /// Look up a template that must exist
    pub async fn require_template(&self, id: &str) -> Result<TaskTemplate, EngineError> {
        self.get_template(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Task template {}", id)))
    }

    /// All templates, sorted by id
    pub async fn list_templates(&self) -> Result<Vec<TaskTemplate>, StateError> {
        debug!("list_templates: called");
        let mut templates = self.state.list::<TaskTemplate>(Vec::new()).await?;
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    /// All templates keyed by id, for batch enrichment
    pub async fn template_map(&self) -> Result<HashMap<String, TaskTemplate>, StateError> {
        Ok(self
            .list_templates()
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect())
    }

    /// Create any templates not already present. Returns how many were created.
    pub async fn seed_templates(&self, templates: &[TaskTemplate]) -> Result<usize, EngineError> {
        debug!(count = templates.len(), "seed_templates: called");
        let mut created = 0;
        for template in templates {
            if self.get_template(&template.id).await?.is_none() {
                self.state.create(template).await?;
                created += 1;
            }
        }
        info!(created, "Seeded task templates");
        Ok(created)
    }

    /// Look up a nutrient that must exist
    pub async fn require_nutrient(&self, id: &str) -> Result<Nutrient, EngineError> {
        debug!(%id, "require_nutrient: called");
        self.state
            .get::<Nutrient>(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Nutrient {}", id)))
    }

    /// All nutrients, sorted by id
    pub async fn list_nutrients(&self) -> Result<Vec<Nutrient>, StateError> {
        let mut nutrients = self.state.list::<Nutrient>(Vec::new()).await?;
        nutrients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nutrients)
    }

    /// Create any nutrients not already present. Returns how many were created.
    pub async fn seed_nutrients(&self, nutrients: &[Nutrient]) -> Result<usize, EngineError> {
        debug!(count = nutrients.len(), "seed_nutrients: called");
        let mut created = 0;
        for nutrient in nutrients {
            if self.state.get::<Nutrient>(&nutrient.id).await?.is_none() {
                self.state.create(nutrient).await?;
                created += 1;
            }
        }
        info!(created, "Seeded nutrients");
        Ok(created)
    }
}

/// Built-in wellness and plant-care templates
pub fn default_templates() -> Vec<TaskTemplate> {
    vec![
        TaskTemplate::new("Water your plant", TaskCategory::Watering, 10).every(3),
        TaskTemplate::new("Fertilize your plant", TaskCategory::Fertilizing, 15).every(14),
        TaskTemplate::new("Prune dead leaves", TaskCategory::Pruning, 10).every(7),
        TaskTemplate::new("Repot your plant", TaskCategory::Repotting, 30),
        TaskTemplate::new("Wipe the leaves", TaskCategory::Cleaning, 5).every(7),
        TaskTemplate::new("Drink a glass of water", TaskCategory::Other, 5).every(1),
        TaskTemplate::new("Take a ten minute walk", TaskCategory::Other, 10).every(1),
        TaskTemplate::new("Meditate for five minutes", TaskCategory::Other, 10).every(1),
    ]
}

/// Built-in nutrients
pub fn default_nutrients() -> Vec<Nutrient> {
    vec![
        Nutrient::new("Sunlight Boost", 300),
        Nutrient::new("Root Tonic", 600),
        Nutrient::new("Leaf Mist", 120),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::MemoryStore;

    #[tokio::test]
    async fn test_seed_templates_is_idempotent() {
        let catalog = TaskCatalog::new(StateManager::spawn(MemoryStore::new()));
        let defaults = default_templates();

        assert_eq!(catalog.seed_templates(&defaults).await.unwrap(), defaults.len());
        assert_eq!(catalog.seed_templates(&defaults).await.unwrap(), 0);
        assert_eq!(catalog.list_templates().await.unwrap().len(), defaults.len());
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite_existing() {
        let catalog = TaskCatalog::new(StateManager::spawn(MemoryStore::new()));
        let original = TaskTemplate::new("Water your plant", TaskCategory::Watering, 99);
        catalog.seed_templates(std::slice::from_ref(&original)).await.unwrap();

        catalog.seed_templates(&default_templates()).await.unwrap();
        let stored = catalog.require_template("water-your-plant").await.unwrap();
        assert_eq!(stored.points, 99);
    }

    #[tokio::test]
    async fn test_require_template_missing() {
        let catalog = TaskCatalog::new(StateManager::spawn(MemoryStore::new()));
        let err = catalog.require_template("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_nutrient_seed_and_lookup() {
        let catalog = TaskCatalog::new(StateManager::spawn(MemoryStore::new()));
        catalog.seed_nutrients(&default_nutrients()).await.unwrap();

        let mist = catalog.require_nutrient("leaf-mist").await.unwrap();
        assert_eq!(mist.timer_seconds, 120);
        assert_eq!(catalog.list_nutrients().await.unwrap().len(), 3);
        assert!(catalog.require_nutrient("nope").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_default_template_ids_are_unique() {
        let templates = default_templates();
        let ids: std::collections::HashSet<_> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), templates.len());
    }
}
