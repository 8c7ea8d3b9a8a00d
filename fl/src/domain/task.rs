//! Scheduled task instances

use chrono::{DateTime, Utc};
use docstore::Record;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;
use super::template::{TaskCategory, TaskTemplate};
use crate::error::EngineError;

/// Task instance status. Pending is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Scheduled, not yet acted on
    #[default]
    Pending,
    /// Done; `completed_at` is set
    Completed,
    /// Dismissed by the user
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A user-owned, dated occurrence of a catalog template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    /// Unique identifier
    pub id: String,

    /// Catalog template this instance was created from
    pub template_id: String,

    /// Owning user
    pub user_id: String,

    /// Plant that receives a care signal on completion
    #[serde(default)]
    pub linked_plant_instance_id: Option<String>,

    /// When the task is due (Unix milliseconds on the wire)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub scheduled_at: DateTime<Utc>,

    /// Set iff status is Completed
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Reason given when the task was skipped
    #[serde(default)]
    pub note: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    #[serde(default)]
    pub created_at: i64,
}

impl TaskInstance {
    /// Create a pending instance with a generated id
    pub fn new(user_id: impl Into<String>, template_id: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self::with_id(generate_id(), user_id, template_id, scheduled_at)
    }

    /// Create with a specific id (for testing or import)
    pub fn with_id(
        id: impl Into<String>,
        user_id: impl Into<String>,
        template_id: impl Into<String>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            template_id: template_id.into(),
            user_id: user_id.into(),
            linked_plant_instance_id: None,
            scheduled_at,
            completed_at: None,
            status: TaskStatus::Pending,
            note: None,
            created_at: docstore::now_ms(),
        }
    }

    /// Builder method to link a plant
    pub fn with_plant(mut self, plant_id: Option<impl Into<String>>) -> Self {
        self.linked_plant_instance_id = plant_id.map(Into::into);
        self
    }

    /// Check if the task can still be acted on
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Pending and due before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.scheduled_at < now
    }

    /// Reject any transition out of a terminal state
    pub fn ensure_pending(&self, action: &'static str) -> Result<(), EngineError> {
        if self.is_pending() {
            Ok(())
        } else {
            debug!(id = %self.id, status = %self.status, action, "TaskInstance::ensure_pending: rejected");
            Err(EngineError::InvalidState {
                id: self.id.clone(),
                status: self.status,
                action,
            })
        }
    }

    /// Mark as completed at the given instant
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Mark as skipped; a blank reason stores no note
    pub fn mark_skipped(&mut self, reason: &str) {
        let reason = reason.trim();
        self.status = TaskStatus::Skipped;
        self.note = (!reason.is_empty()).then(|| reason.to_string());
    }
}

impl Record for TaskInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "task_instances"
    }
}

/// A task instance paired with its catalog template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedTask {
    pub task: TaskInstance,
    pub template: TaskTemplate,
}

impl EnrichedTask {
    pub fn new(task: TaskInstance, template: TaskTemplate) -> Self {
        Self { task, template }
    }

    pub fn category(&self) -> TaskCategory {
        self.template.category
    }

    pub fn points(&self) -> u32 {
        self.template.points
    }

    pub fn title(&self) -> &str {
        if self.template.title.is_empty() {
            &self.template.id
        } else {
            &self.template.title
        }
    }
}
