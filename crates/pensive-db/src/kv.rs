//! Hash, list and counter primitives.
//!
//! Each function is a single statement against the connection it is given,
//! so passing a `Transaction` batches them atomically.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, params};

use crate::Result;

pub fn hget(conn: &Connection, key: &str, field: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_hash WHERE key = ?1 AND field = ?2",
            params![key, field],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn hgetall(conn: &Connection, key: &str) -> Result<HashMap<String, String>> {
    let mut stmt = conn.prepare_cached("SELECT field, value FROM kv_hash WHERE key = ?1")?;
    let fields = stmt
        .query_map([key], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(fields)
}

pub fn hexists(conn: &Connection, key: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM kv_hash WHERE key = ?1)",
        [key],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn hset(conn: &Connection, key: &str, field: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_hash (key, field, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
        params![key, field, value],
    )?;
    Ok(())
}

/// Set `field` only if it is absent. Returns whether the value was written.
pub fn hsetnx(conn: &Connection, key: &str, field: &str, value: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO kv_hash (key, field, value) VALUES (?1, ?2, ?3)",
        params![key, field, value],
    )?;
    Ok(inserted == 1)
}

pub fn hdel(conn: &Connection, key: &str, field: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM kv_hash WHERE key = ?1 AND field = ?2",
        params![key, field],
    )?;
    Ok(removed == 1)
}

/// Increment a counter, creating it at 1. Returns the new value.
pub fn incr(conn: &Connection, key: &str) -> Result<i64> {
    let value = conn.query_row(
        "INSERT INTO kv_counter (key, value) VALUES (?1, 1)
         ON CONFLICT(key) DO UPDATE SET value = value + 1
         RETURNING value",
        [key],
        |row| row.get(0),
    )?;
    Ok(value)
}

pub fn lpush(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_list (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// The `limit` most recently pushed values, newest first.
pub fn lrange(conn: &Connection, key: &str, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT value FROM kv_list WHERE key = ?1 ORDER BY seq DESC LIMIT ?2",
    )?;
    let values = stmt
        .query_map(params![key, limit as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(values)
}
