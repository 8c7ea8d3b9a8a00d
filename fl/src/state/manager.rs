//! StateManager - actor that owns the DocumentStore
//!
//! Processes commands via channels so every read and write for the engine is
//! serialized through one task. Typed helpers on the handle encode records on
//! the way in and normalize documents on the way out.

use chrono::{DateTime, Utc};
use docstore::{Document, DocumentStore, Filter, FilterOp, Record};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{PlantInstance, TaskInstance, TaskStatus};

use super::messages::{StateCommand, StateError, StateResponse};

/// Event broadcast after a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    Created { collection: &'static str, id: String },
    Updated { collection: &'static str, id: String },
    Deleted { collection: &'static str, id: String },
}

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    /// Broadcast sender for state change notifications
    event_tx: broadcast::Sender<StateEvent>,
}

impl StateManager {
    /// Spawn a new StateManager actor owning `store`. Must be called inside a tokio runtime.
    pub fn spawn<S: DocumentStore + 'static>(store: S) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(256);

        // Broadcast channel for state change notifications (views subscribe)
        let (event_tx, _) = broadcast::channel(64);

        tokio::spawn(actor_loop(store, rx));

        info!("StateManager spawned");

        Self { tx, event_tx }
    }

    /// Subscribe to state change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<StateEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    fn notify(&self, event: StateEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    // === Typed record operations ===

    /// Get a record by id
    pub async fn get<R: Record>(&self, id: &str) -> StateResponse<Option<R>> {
        let collection = R::collection_name();
        debug!(%collection, %id, "get: called");
        let doc = self
            .request(|reply| StateCommand::Get {
                collection,
                id: id.to_string(),
                reply,
            })
            .await?;
        doc.map(decode::<R>).transpose()
    }

    /// Get a record by id, returning error if not found
    pub async fn get_required<R: Record>(&self, id: &str) -> Result<R, StateError> {
        debug!(%id, "get_required: called");
        self.get::<R>(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("{} {}", R::collection_name(), id)))
    }

    /// List records matching all filters. Documents that fail to decode are skipped.
    pub async fn list<R: Record>(&self, filters: Vec<Filter>) -> StateResponse<Vec<R>> {
        let collection = R::collection_name();
        debug!(%collection, filter_count = filters.len(), "list: called");
        let docs = self
            .request(|reply| StateCommand::List {
                collection,
                filters,
                reply,
            })
            .await?;

        let records = docs
            .into_iter()
            .filter_map(|doc| match decode::<R>(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(%collection, error = %e, "list: skipping undecodable document");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Create a record, returning the stored version
    pub async fn create<R: Record>(&self, record: &R) -> StateResponse<R> {
        let collection = R::collection_name();
        debug!(%collection, id = %record.id(), "create: called");
        let doc = encode(record)?;
        let stored = self
            .request(|reply| StateCommand::Create { collection, doc, reply })
            .await?;
        let created = decode::<R>(stored)?;
        self.notify(StateEvent::Created {
            collection,
            id: created.id().to_string(),
        });
        Ok(created)
    }

    /// Overwrite every field of an existing record
    pub async fn update<R: Record>(&self, record: &R) -> StateResponse<R> {
        debug!(id = %record.id(), "update: called");
        let patch = encode(record)?;
        self.update_fields::<R>(record.id(), patch).await
    }

    /// Shallow-merge `patch` into an existing record
    pub async fn update_fields<R: Record>(&self, id: &str, patch: Document) -> StateResponse<R> {
        let collection = R::collection_name();
        debug!(%collection, %id, "update_fields: called");
        let stored = self
            .request(|reply| StateCommand::Update {
                collection,
                id: id.to_string(),
                patch,
                reply,
            })
            .await?;
        let updated = decode::<R>(stored)?;
        self.notify(StateEvent::Updated {
            collection,
            id: id.to_string(),
        });
        Ok(updated)
    }

    /// Delete a record by id
    pub async fn delete<R: Record>(&self, id: &str) -> StateResponse<()> {
        let collection = R::collection_name();
        debug!(%collection, %id, "delete: called");
        self.request(|reply| StateCommand::Delete {
            collection,
            id: id.to_string(),
            reply,
        })
        .await?;
        self.notify(StateEvent::Deleted {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }

    // === Convenience queries ===

    /// A user's task instances, optionally limited to `start <= scheduled_at < end`
    pub async fn list_user_tasks(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> StateResponse<Vec<TaskInstance>> {
        debug!(%user_id, ?range, "list_user_tasks: called");
        let mut filters = vec![Filter::eq("user_id", user_id)];
        if let Some((start, end)) = range {
            filters.push(Filter::new("scheduled_at", FilterOp::Gte, start.timestamp_millis()));
            filters.push(Filter::new("scheduled_at", FilterOp::Lt, end.timestamp_millis()));
        }
        self.list(filters).await
    }

    /// Pending instances of one template for a user scheduled at or after `from`
    pub async fn list_pending_from(
        &self,
        user_id: &str,
        template_id: &str,
        from: DateTime<Utc>,
    ) -> StateResponse<Vec<TaskInstance>> {
        debug!(%user_id, %template_id, %from, "list_pending_from: called");
        self.list(vec![
            Filter::eq("user_id", user_id),
            Filter::eq("template_id", template_id),
            Filter::eq("status", TaskStatus::Pending.to_string()),
            Filter::new("scheduled_at", FilterOp::Gte, from.timestamp_millis()),
        ])
        .await
    }

    /// All plants owned by a user
    pub async fn list_user_plants(&self, user_id: &str) -> StateResponse<Vec<PlantInstance>> {
        debug!(%user_id, "list_user_plants: called");
        self.list(vec![Filter::eq("user_id", user_id)]).await
    }
}

fn encode<R: Record>(record: &R) -> StateResponse<Document> {
    serde_json::to_value(record).map_err(|e| StateError::DeserializationError(e.to_string()))
}

fn decode<R: Record>(doc: Document) -> StateResponse<R> {
    serde_json::from_value(doc).map_err(|e| StateError::DeserializationError(e.to_string()))
}

/// The actor loop that owns the store and processes commands
async fn actor_loop<S: DocumentStore>(store: S, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::List {
                collection,
                filters,
                reply,
            } => {
                debug!(%collection, "actor_loop: List command");
                let result = store.list_documents(collection, &filters).await.map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Get { collection, id, reply } => {
                debug!(%collection, %id, "actor_loop: Get command");
                let result = store.get_document(collection, &id).await.map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Create { collection, doc, reply } => {
                debug!(%collection, "actor_loop: Create command");
                let result = store.create_document(collection, doc).await.map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Update {
                collection,
                id,
                patch,
                reply,
            } => {
                debug!(%collection, %id, "actor_loop: Update command");
                let result = store
                    .update_document(collection, &id, patch)
                    .await
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Delete { collection, id, reply } => {
                debug!(%collection, %id, "actor_loop: Delete command");
                let result = store.delete_document(collection, &id).await.map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
