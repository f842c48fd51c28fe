use chrono::{DateTime, Local, TimeZone, Utc};

/// Store-assigned, auto-incrementing row id.
pub type RecordId = i64;

/// Highest record id already processed for a room. `0` means nothing seen.
pub type Cursor = RecordId;

/// A message row as the store holds it.
/// The store only ever sees the envelope, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: RecordId,
    pub room: String,
    pub author: String,
    /// Base64 `nonce || ciphertext || tag`.
    pub envelope: String,
    /// Unix seconds, set by the sender.
    pub timestamp: i64,
}

impl Message {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }

    /// `HH:MM` in the local timezone, `--:--` for an unrepresentable timestamp.
    pub fn clock(&self) -> String {
        match self.sent_at() {
            Some(at) => at.with_timezone(&Local).format("%H:%M").to_string(),
            None => "--:--".to_string(),
        }
    }
}
