use std::collections::BTreeSet;

use kainet_crypto::{SymmetricKey, decrypt, derive_key, encrypt};
use kainet_types::{Cursor, Message, RecordId};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::store::MessageStore;

/// Plaintext of a delivered message, or the fact that it could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Undecryptable,
}

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub message: Message,
    pub body: Body,
    /// Sent by this session.
    pub own: bool,
}

/// One operator connected to one room.
///
/// Owns the derived key and the poll cursor. Nothing else in the process
/// holds either.
pub struct Session<S> {
    store: S,
    key: SymmetricKey,
    room: String,
    author: String,
    cursor: Cursor,
    /// Ids this session appended and already rendered locally.
    echoed: BTreeSet<RecordId>,
    connected: bool,
}

impl<S: MessageStore> Session<S> {
    /// Prepare the store and derive the room key from the shared secret.
    pub async fn connect(store: S, secret: &str, room: &str, author: &str) -> Result<Self, ClientError> {
        store.initialize().await?;
        let key = derive_key(secret)?;

        info!(room, author, "Session connected");
        Ok(Self {
            store,
            key,
            room: room.to_owned(),
            author: author.to_owned(),
            cursor: 0,
            echoed: BTreeSet::new(),
            connected: true,
        })
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Load the newest `limit` messages and move the cursor past them.
    ///
    /// With `limit == 0` nothing is replayed and the cursor jumps to the
    /// room's current head.
    pub async fn history(&mut self, limit: u32) -> Result<Vec<Delivered>, ClientError> {
        if limit == 0 {
            self.cursor = self.store.last_id(&self.room).await?;
            return Ok(Vec::new());
        }

        let messages = self.store.recent(&self.room, limit).await?;
        if let Some(newest) = messages.iter().map(|m| m.id).max() {
            self.cursor = self.cursor.max(newest);
        }

        Ok(messages.into_iter().map(|m| self.open(m)).collect())
    }

    /// Encrypt and append a message. Returns the local echo to render.
    ///
    /// The cursor is left alone so messages other writers appended since the
    /// last poll still arrive; the poll that returns this id skips it.
    pub async fn send(&mut self, plaintext: &str) -> Result<Delivered, ClientError> {
        if !self.connected {
            return Err(ClientError::Disconnected);
        }

        let envelope = encrypt(plaintext, &self.key)?;
        let timestamp = chrono::Utc::now().timestamp();
        let id = self
            .store
            .append(&self.room, &self.author, &envelope, timestamp)
            .await?;

        if id > self.cursor {
            self.echoed.insert(id);
        }

        Ok(Delivered {
            message: Message {
                id,
                room: self.room.clone(),
                author: self.author.clone(),
                envelope,
                timestamp,
            },
            body: Body::Text(plaintext.to_owned()),
            own: true,
        })
    }

    /// Fetch everything newer than the cursor, in store order.
    ///
    /// Rows that fail to decrypt come back as [`Body::Undecryptable`] and do
    /// not stop the rest. A disconnected session gets nothing. State only
    /// changes after the query returns, so dropping this future mid-flight
    /// leaves the cursor where it was.
    pub async fn poll(&mut self) -> Result<Vec<Delivered>, ClientError> {
        if !self.connected {
            return Ok(Vec::new());
        }

        let messages = self.store.query(&self.room, self.cursor).await?;

        let mut delivered = Vec::with_capacity(messages.len());
        for message in messages {
            if message.id <= self.cursor {
                continue;
            }
            self.cursor = message.id;

            if self.echoed.remove(&message.id) {
                continue;
            }
            delivered.push(self.open(message));
        }

        // Own ids another client purged before we saw them never come back
        let cursor = self.cursor;
        self.echoed.retain(|&id| id > cursor);

        if !delivered.is_empty() {
            debug!(count = delivered.len(), cursor = self.cursor, "Polled new messages");
        }
        Ok(delivered)
    }

    /// Delete the room's history and start over from an empty cursor.
    pub async fn burn(&mut self) -> Result<u64, ClientError> {
        if !self.connected {
            return Err(ClientError::Disconnected);
        }

        let deleted = self.store.purge(&self.room).await?;
        self.cursor = 0;
        self.echoed.clear();

        warn!(room = %self.room, deleted, "Room history purged");
        Ok(deleted)
    }

    /// Stop accepting poll results. The key is wiped when the session drops.
    pub fn disconnect(&mut self) {
        if self.connected {
            info!(room = %self.room, "Session disconnected");
        }
        self.connected = false;
    }

    fn open(&self, message: Message) -> Delivered {
        let body = match decrypt(&message.envelope, &self.key) {
            Ok(text) => Body::Text(text),
            Err(e) => {
                warn!(id = message.id, "Undecryptable message: {}", e);
                Body::Undecryptable
            }
        };

        Delivered {
            own: false,
            message,
            body,
        }
    }
}
