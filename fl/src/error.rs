//! Engine error types
//!
//! Single-instance operations (complete, skip, apply nutrient) return these as
//! failed results. Batch reads and timer ticks recover locally instead.

use thiserror::Error;

use crate::domain::TaskStatus;
use crate::state::StateError;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} task {id}: status is {status}")]
    InvalidState {
        id: String,
        status: TaskStatus,
        action: &'static str,
    },

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl EngineError {
    /// Check if this is a missing-record error
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }

    /// Check if this is an illegal status transition
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, EngineError::InvalidState { .. })
    }

    /// Check if the store rejected or failed a read/write
    pub fn is_persistence(&self) -> bool {
        matches!(self, EngineError::Persistence(_))
    }
}

impl From<StateError> for EngineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(what) => EngineError::NotFound(what),
            StateError::StoreError(msg) => EngineError::Persistence(msg),
            StateError::DeserializationError(msg) => {
                EngineError::Persistence(format!("invalid stored record: {}", msg))
            }
            StateError::ChannelError => EngineError::Persistence("state manager unavailable".to_string()),
        }
    }
}

impl From<docstore::StoreError> for EngineError {
    fn from(err: docstore::StoreError) -> Self {
        StateError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_state_error() {
        assert!(EngineError::from(StateError::NotFound("Task t1".to_string())).is_not_found());
        assert!(EngineError::from(StateError::StoreError("disk full".to_string())).is_persistence());
        assert!(EngineError::from(StateError::ChannelError).is_persistence());
    }

    #[test]
    fn test_from_store_error() {
        assert!(EngineError::from(docstore::StoreError::not_found("plants", "p1")).is_not_found());
        let err = EngineError::from(docstore::StoreError::Locked("/tmp/store".to_string()));
        assert!(err.is_persistence());
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = EngineError::InvalidState {
            id: "t1".to_string(),
            status: TaskStatus::Completed,
            action: "complete",
        };
        assert!(err.is_invalid_state());
        assert_eq!(err.to_string(), "Cannot complete task t1: status is completed");
    }
}
