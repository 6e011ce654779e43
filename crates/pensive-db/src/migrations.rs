use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_hash (
            key         TEXT NOT NULL,
            field       TEXT NOT NULL,
            value       TEXT NOT NULL,
            PRIMARY KEY (key, field)
        );

        -- seq grows with every push, newest entry has the highest seq
        CREATE TABLE IF NOT EXISTS kv_list (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_kv_list_key
            ON kv_list(key, seq);

        CREATE TABLE IF NOT EXISTS kv_counter (
            key         TEXT PRIMARY KEY,
            value       INTEGER NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
