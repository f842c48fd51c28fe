//! Database row types; these map directly to SQLite rows.
//! Column names follow the shared table layout other clients also write to.
use kainet_types::Message;

pub struct MessageRow {
    pub id: i64,
    pub room_name: String,
    pub username: String,
    /// Envelope text, never plaintext.
    pub message: String,
    pub timestamp: i64,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            room: row.room_name,
            author: row.username,
            envelope: row.message,
            timestamp: row.timestamp,
        }
    }
}
