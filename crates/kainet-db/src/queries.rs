use crate::Database;
use crate::models::MessageRow;
use anyhow::Result;
use rusqlite::{Connection, Row};

pub const INSERT_MESSAGE: &str =
    "INSERT INTO messages (room_name, username, message, timestamp) VALUES (?1, ?2, ?3, ?4)";

pub const SELECT_SINCE: &str = "SELECT id, room_name, username, message, timestamp
     FROM messages
     WHERE room_name = ?1 AND id > ?2
     ORDER BY id ASC";

pub const SELECT_RECENT: &str = "SELECT id, room_name, username, message, timestamp
     FROM messages
     WHERE room_name = ?1
     ORDER BY id DESC
     LIMIT ?2";

pub const SELECT_LAST_ID: &str = "SELECT COALESCE(MAX(id), 0) FROM messages WHERE room_name = ?1";

pub const DELETE_ROOM: &str = "DELETE FROM messages WHERE room_name = ?1";

impl Database {
    // -- Messages --

    /// Append an envelope. Returns the new row id.
    pub fn insert_message(
        &self,
        room: &str,
        author: &str,
        envelope: &str,
        timestamp: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(INSERT_MESSAGE, rusqlite::params![room, author, envelope, timestamp])?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Rows strictly newer than `cursor`, oldest first.
    pub fn get_messages_since(&self, room: &str, cursor: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_since(conn, room, cursor))
    }

    /// The newest `limit` rows, oldest first.
    pub fn get_recent_messages(&self, room: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut rows = query_recent(conn, room, limit)?;
            rows.reverse();
            Ok(rows)
        })
    }

    pub fn get_last_message_id(&self, room: &str) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row(SELECT_LAST_ID, [room], |row| row.get(0))?))
    }

    /// Delete every message in the room. Irreversible.
    pub fn purge_room(&self, room: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute(DELETE_ROOM, [room])?))
    }
}

fn query_since(conn: &Connection, room: &str, cursor: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(SELECT_SINCE)?;
    let rows = stmt
        .query_map(rusqlite::params![room, cursor], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_recent(conn: &Connection, room: &str, limit: u32) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(SELECT_RECENT)?;
    let rows = stmt
        .query_map(rusqlite::params![room, limit], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        room_name: row.get(1)?,
        username: row.get(2)?,
        message: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
