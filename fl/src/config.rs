//! Flourish configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{default_nutrients, default_templates};
use crate::domain::{Nutrient, TaskTemplate};
use crate::progression::MAX_UPCOMING_DAYS;

/// Main Flourish configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when no --log-level flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Nutrient timer configuration
    pub nutrients: NutrientConfig,

    /// Plant care configuration
    pub care: CareConfig,

    /// Progression engine configuration
    pub progression: ProgressionConfig,

    /// Task templates to seed; the built-in set when empty
    pub catalog: Vec<TaskTemplate>,

    /// Nutrients to seed; the built-in set when empty
    #[serde(rename = "nutrient-catalog")]
    pub nutrient_catalog: Vec<Nutrient>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.nutrients.tick_ms == 0 {
            return Err(eyre::eyre!("nutrients.tick-ms must be greater than zero"));
        }
        if self.progression.upcoming_days == 0 || self.progression.upcoming_days > MAX_UPCOMING_DAYS {
            return Err(eyre::eyre!(
                "progression.upcoming-days must be between 1 and {}",
                MAX_UPCOMING_DAYS
            ));
        }
        if let Some(template) = self.catalog.iter().find(|t| t.id.trim().is_empty()) {
            return Err(eyre::eyre!("catalog template '{}' has an empty id", template.title));
        }
        if let Some(nutrient) = self.nutrient_catalog.iter().find(|n| n.timer_seconds == 0) {
            return Err(eyre::eyre!("nutrient '{}' must have a positive timer-seconds", nutrient.id));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .flourish.yml
        let local_config = PathBuf::from(".flourish.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/flourish/flourish.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("flourish").join("flourish.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up. Errors are ignored.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".flourish.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("flourish").join("flourish.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Templates to seed: configured ones, or the built-in set
    pub fn templates(&self) -> Vec<TaskTemplate> {
        if self.catalog.is_empty() {
            default_templates()
        } else {
            self.catalog.clone()
        }
    }

    /// Nutrients to seed: configured ones, or the built-in set
    pub fn nutrients(&self) -> Vec<Nutrient> {
        if self.nutrient_catalog.is_empty() {
            default_nutrients()
        } else {
            self.nutrient_catalog.clone()
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the JSONL document store
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/flourish/store on Linux)
        let path = dirs::data_local_dir()
            .map(|d| d.join("flourish").join("store"))
            .unwrap_or_else(|| PathBuf::from(".flourish-store"));

        Self { path }
    }
}

/// Nutrient timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientConfig {
    /// Countdown tick period in milliseconds
    #[serde(rename = "tick-ms")]
    pub tick_ms: u64,

    /// Water and care increase per nutrient application
    #[serde(rename = "level-step")]
    pub level_step: u8,
}

impl NutrientConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for NutrientConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            level_step: 10,
        }
    }
}

/// Plant care configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    /// Care level increase when a fertilizing task is completed
    #[serde(rename = "fertilize-step")]
    pub fertilize_step: u8,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self { fertilize_step: 10 }
    }
}

/// Progression engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Days covered by the upcoming summary
    #[serde(rename = "upcoming-days")]
    pub upcoming_days: u32,

    /// Skip regeneration when a matching pending instance already exists
    #[serde(rename = "dedupe-recurrence")]
    pub dedupe_recurrence: bool,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            upcoming_days: 7,
            dedupe_recurrence: true,
        }
    }
}
