//! State manager messages
//!
//! Commands and responses for the actor pattern.

use docstore::{Document, Filter};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<docstore::StoreError> for StateError {
    fn from(err: docstore::StoreError) -> Self {
        match err {
            docstore::StoreError::NotFound { collection, id } => StateError::NotFound(format!("{}/{}", collection, id)),
            other => StateError::StoreError(other.to_string()),
        }
    }
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    List {
        collection: &'static str,
        filters: Vec<Filter>,
        reply: oneshot::Sender<StateResponse<Vec<Document>>>,
    },
    Get {
        collection: &'static str,
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Document>>>,
    },
    Create {
        collection: &'static str,
        doc: Document,
        reply: oneshot::Sender<StateResponse<Document>>,
    },
    Update {
        collection: &'static str,
        id: String,
        patch: Document,
        reply: oneshot::Sender<StateResponse<Document>>,
    },
    Delete {
        collection: &'static str,
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
