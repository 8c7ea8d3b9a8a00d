//! Task catalog templates

use docstore::Record;
use serde::{Deserialize, Serialize};

use super::id::slugify;
use super::lenient;

/// Kind of task a template describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Watering,
    Fertilizing,
    Pruning,
    Repotting,
    Cleaning,
    #[default]
    #[serde(other)]
    Other,
}

impl TaskCategory {
    /// Care signal sent to a linked plant when a task of this category is completed
    pub fn care_type(&self) -> Option<CareType> {
        match self {
            Self::Watering => Some(CareType::Water),
            Self::Fertilizing => Some(CareType::Fertilize),
            Self::Repotting => Some(CareType::Repot),
            Self::Pruning | Self::Cleaning | Self::Other => None,
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Watering => write!(f, "watering"),
            Self::Fertilizing => write!(f, "fertilizing"),
            Self::Pruning => write!(f, "pruning"),
            Self::Repotting => write!(f, "repotting"),
            Self::Cleaning => write!(f, "cleaning"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Care update forwarded to the plant collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareType {
    Water,
    Fertilize,
    Repot,
}

impl std::fmt::Display for CareType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Water => write!(f, "water"),
            Self::Fertilize => write!(f, "fertilize"),
            Self::Repot => write!(f, "repot"),
        }
    }
}

/// Immutable catalog entry describing a repeatable task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Unique identifier
    pub id: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Task category
    #[serde(default)]
    pub category: TaskCategory,

    /// Days until the next occurrence once completed
    #[serde(
        default,
        alias = "recurrence-days",
        deserialize_with = "lenient::opt_positive_u32"
    )]
    pub default_recurrence_days: Option<u32>,

    /// Points awarded on completion
    #[serde(default, deserialize_with = "lenient::u32_lenient")]
    pub points: u32,
}

impl TaskTemplate {
    /// Create a one-off template; the id is derived from the title
    pub fn new(title: impl Into<String>, category: TaskCategory, points: u32) -> Self {
        let title = title.into();
        Self {
            id: slugify(&title),
            title,
            category,
            default_recurrence_days: None,
            points,
        }
    }

    /// Builder method to make the template recurring
    pub fn every(mut self, days: u32) -> Self {
        self.default_recurrence_days = (days > 0).then_some(days);
        self
    }

    /// Builder method to override the id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether completing this template schedules a follow-up
    pub fn is_recurring(&self) -> bool {
        self.default_recurrence_days.is_some()
    }
}

impl Record for TaskTemplate {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "task_templates"
    }
}
