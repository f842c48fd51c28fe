use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use kainet_db::Database;
use kainet_types::{Cursor, Message, RecordId};
use tracing::{debug, error};

use crate::error::StoreError;

/// Append-only message table shared by every client of a room.
///
/// Implementations must return `query` results in ascending id order. Appends
/// are at-least-once from the caller's side; nothing here deduplicates.
pub trait MessageStore: Send + Sync {
    /// Create the table and index if missing, upgrading older layouts.
    fn initialize(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn append(
        &self,
        room: &str,
        author: &str,
        envelope: &str,
        timestamp: i64,
    ) -> impl Future<Output = Result<RecordId, StoreError>> + Send;

    /// Messages in `room` with `id > since`, oldest first.
    fn query(
        &self,
        room: &str,
        since: Cursor,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// The newest `limit` messages in `room`, oldest first.
    fn recent(
        &self,
        room: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;

    /// Highest id in `room`, or 0 when empty.
    fn last_id(&self, room: &str) -> impl Future<Output = Result<RecordId, StoreError>> + Send;

    /// Delete every message in `room`. Irreversible.
    fn purge(&self, room: &str) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// SQLite-file backed store. Every call runs on the blocking pool.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
}

impl LocalStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::open(path).map_err(db_error)?;
        Ok(Self::new(Arc::new(db)))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::open_in_memory().map_err(db_error)?;
        Ok(Self::new(Arc::new(db)))
    }

    // Run blocking DB work off the async runtime
    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StoreError::Database(e.to_string())
            })?
            .map_err(db_error)
    }
}

fn db_error(e: anyhow::Error) -> StoreError {
    StoreError::Database(format!("{:#}", e))
}

impl MessageStore for LocalStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        // Migrations already ran when the database was opened
        Ok(())
    }

    async fn append(
        &self,
        room: &str,
        author: &str,
        envelope: &str,
        timestamp: i64,
    ) -> Result<RecordId, StoreError> {
        let (room, author, envelope) = (room.to_owned(), author.to_owned(), envelope.to_owned());
        let id = self
            .blocking(move |db| db.insert_message(&room, &author, &envelope, timestamp))
            .await?;
        debug!(id, "Appended message");
        Ok(id)
    }

    async fn query(&self, room: &str, since: Cursor) -> Result<Vec<Message>, StoreError> {
        let room = room.to_owned();
        let rows = self
            .blocking(move |db| db.get_messages_since(&room, since))
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn recent(&self, room: &str, limit: u32) -> Result<Vec<Message>, StoreError> {
        let room = room.to_owned();
        let rows = self
            .blocking(move |db| db.get_recent_messages(&room, limit))
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn last_id(&self, room: &str) -> Result<RecordId, StoreError> {
        let room = room.to_owned();
        self.blocking(move |db| db.get_last_message_id(&room)).await
    }

    async fn purge(&self, room: &str) -> Result<u64, StoreError> {
        let room = room.to_owned();
        let deleted = self.blocking(move |db| db.purge_room(&room)).await?;
        Ok(deleted as u64)
    }
}
