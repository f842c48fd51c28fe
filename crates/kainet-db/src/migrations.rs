use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

/// Schema for the shared `messages` table.
pub const CREATE_MESSAGES: &str = "
    CREATE TABLE messages (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        room_name   TEXT NOT NULL,
        username    TEXT NOT NULL,
        message     TEXT NOT NULL,
        timestamp   INTEGER NOT NULL
    )";

/// Upgrades tables created before rooms existed.
pub const LEGACY_ROOM_COLUMN: &str =
    "ALTER TABLE messages ADD COLUMN room_name TEXT DEFAULT 'default'";

/// Index that keeps "since cursor" queries on one room cheap.
pub const CREATE_ROOM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_room_id ON messages(room_name, id)";

pub const TABLE_EXISTS: &str =
    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'messages'";

pub const HAS_ROOM_COLUMN: &str =
    "SELECT COUNT(*) > 0 FROM pragma_table_info('messages') WHERE name = 'room_name'";

pub fn run(conn: &Connection) -> Result<()> {
    let table_exists: bool = conn.query_row(TABLE_EXISTS, [], |row| row.get(0))?;

    if table_exists {
        let has_room: bool = conn.query_row(HAS_ROOM_COLUMN, [], |row| row.get(0))?;
        if !has_room {
            info!("Migrating legacy messages table: adding room_name");
            conn.execute_batch(LEGACY_ROOM_COLUMN)
                .context("migration failed")?;
        }
    } else {
        conn.execute_batch(CREATE_MESSAGES)?;
    }

    conn.execute_batch(CREATE_ROOM_INDEX)?;

    info!("Database migrations complete");
    Ok(())
}
