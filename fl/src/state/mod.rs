//! State management with actor pattern
//!
//! StateManager owns the DocumentStore and processes messages via channels.
//! It is the explicit store object handed to every service; there is no
//! process-wide singleton, so tests spawn a fresh one per case.

mod manager;
mod messages;

pub use manager::{StateEvent, StateManager};
pub use messages::{StateCommand, StateError, StateResponse};
