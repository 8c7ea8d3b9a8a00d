//! JSONL-backed document store
//!
//! Each collection is an append-only log of `put`/`delete` entries in
//! `{collection}.jsonl`. The log is replayed into memory on open; the last
//! entry for an id wins. `compact()` rewrites each log to one `put` per live
//! document.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::memory::Collections;
use crate::{Document, DocumentStore, Filter, StoreError, StoreResult, prepare_new, validate_collection};

const LOG_EXTENSION: &str = "jsonl";
const LOCK_FILE: &str = ".lock";

/// One line of a collection log
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Put { doc: Document },
    Delete { id: String },
}

/// File-backed store rooted at a directory
pub struct JsonlStore {
    base_path: PathBuf,
    collections: Mutex<Collections>,
    /// Held for the lifetime of the store; the OS releases the lock on drop
    _lock: File,
}

impl JsonlStore {
    /// Open or create a store at the given directory
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(base_path.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(base_path.display().to_string()))?;

        let mut collections = Collections::default();
        let mut replayed = 0usize;
        for entry in fs::read_dir(&base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            let Some(collection) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            replayed += replay(&path, &collection, &mut collections)?;
        }

        info!(path = %base_path.display(), replayed, "Opened JSONL store");
        Ok(Self {
            base_path,
            collections: Mutex::new(collections),
            _lock: lock,
        })
    }

    /// Directory this store lives in
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Rewrite every collection log to one `put` line per live document
    pub fn compact(&self) -> StoreResult<usize> {
        let guard = self.lock();
        let mut written = 0;
        for collection in guard.collection_names() {
            let docs = guard.documents(&collection);
            let tmp_path = self.log_path(&collection).with_extension("jsonl.tmp");
            {
                let mut tmp = File::create(&tmp_path)?;
                for doc in docs {
                    serde_json::to_writer(&mut tmp, &LogEntry::Put { doc })?;
                    tmp.write_all(b"\n")?;
                    written += 1;
                }
                tmp.sync_all()?;
            }
            fs::rename(&tmp_path, self.log_path(&collection))?;
        }
        info!(written, "Compacted JSONL store");
        Ok(written)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", collection, LOG_EXTENSION))
    }

    fn append(&self, collection: &str, entry: &LogEntry) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(collection))?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// Replay one collection log into memory, returning the number of applied entries
fn replay(path: &Path, collection: &str, collections: &mut Collections) -> StoreResult<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut applied = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(&line) {
            Ok(LogEntry::Put { doc }) => match doc.get("id").and_then(|v| v.as_str()) {
                Some(id) => {
                    collections.put(collection, id.to_string(), doc.clone());
                    applied += 1;
                }
                None => warn!(%collection, line = line_no + 1, "Skipping put without id"),
            },
            Ok(LogEntry::Delete { id }) => {
                collections.remove(collection, &id);
                applied += 1;
            }
            Err(e) => {
                warn!(%collection, line = line_no + 1, error = %e, "Skipping corrupt log line");
            }
        }
    }
    Ok(applied)
}

#[async_trait]
impl DocumentStore for JsonlStore {
    async fn list_documents(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Document>> {
        debug!(%collection, filter_count = filters.len(), "JsonlStore::list_documents: called");
        validate_collection(collection)?;
        Ok(self.lock().list(collection, filters))
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        debug!(%collection, %id, "JsonlStore::get_document: called");
        validate_collection(collection)?;
        Ok(self.lock().get(collection, id))
    }

    async fn create_document(&self, collection: &str, data: Document) -> StoreResult<Document> {
        validate_collection(collection)?;
        let (id, doc) = prepare_new(data)?;
        debug!(%collection, %id, "JsonlStore::create_document: called");
        let mut guard = self.lock();
        self.append(collection, &LogEntry::Put { doc: doc.clone() })?;
        guard.put(collection, id, doc.clone());
        Ok(doc)
    }

    async fn update_document(&self, collection: &str, id: &str, partial: Document) -> StoreResult<Document> {
        debug!(%collection, %id, "JsonlStore::update_document: called");
        validate_collection(collection)?;
        let mut guard = self.lock();
        let doc = guard.merged(collection, id, partial)?;
        self.append(collection, &LogEntry::Put { doc: doc.clone() })?;
        guard.put(collection, id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        debug!(%collection, %id, "JsonlStore::delete_document: called");
        validate_collection(collection)?;
        let mut guard = self.lock();
        if guard.get(collection, id).is_none() {
            return Err(StoreError::not_found(collection, id));
        }
        self.append(collection, &LogEntry::Delete { id: id.to_string() })?;
        guard.remove(collection, id);
        Ok(())
    }
}
