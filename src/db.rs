use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{AcademyError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    store TEXT NOT NULL,
    id TEXT NOT NULL,
    position INTEGER NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (store, id)
);

CREATE INDEX IF NOT EXISTS records_store_position ON records (store, position);
";

/// Durable key-value store with named partitions, each keyed by entity id.
pub trait LocalStore: Send + Sync {
    fn init(&self) -> Result<()>;

    /// Every record of a store in insertion order.
    fn get_all(&self, store: &str) -> Result<Vec<Value>>;

    /// Clear the store and write every record, keyed by its id.
    fn replace_all(&self, store: &str, records: &[(String, Value)]) -> Result<()>;

    /// Insert or replace a single record.
    fn upsert(&self, store: &str, id: &str, record: &Value) -> Result<()>;
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(get_connection(db_path)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AcademyError::Other("local store lock poisoned".to_string()))
    }

    /// Number of records per store, for `academy status`.
    pub fn counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT store, count(*) FROM records GROUP BY store ORDER BY store")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl LocalStore for SqliteStore {
    fn init(&self) -> Result<()> {
        init_db(&*self.conn()?)
    }

    fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT body FROM records WHERE store = ?1 ORDER BY position, id")?;
        let bodies: Vec<String> = stmt
            .query_map([store], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(AcademyError::from))
            .collect()
    }

    fn replace_all(&self, store: &str, records: &[(String, Value)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records WHERE store = ?1", [store])?;
        {
            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO records (store, id, position, body) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, (id, body)) in records.iter().enumerate() {
                insert.execute(rusqlite::params![
                    store,
                    id,
                    position as i64,
                    serde_json::to_string(body)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert(&self, store: &str, id: &str, record: &Value) -> Result<()> {
        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT position FROM records WHERE store = ?1 AND id = ?2",
                [store, id],
                |r| r.get(0),
            )
            .optional()?;
        let position = match existing {
            Some(p) => p,
            None => conn.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM records WHERE store = ?1",
                [store],
                |r| r.get(0),
            )?,
        };
        conn.execute(
            "INSERT OR REPLACE INTO records (store, id, position, body, updated_at) \
             VALUES (?1, ?2, ?3, ?4, datetime('now'))",
            rusqlite::params![store, id, position, serde_json::to_string(record)?],
        )?;
        Ok(())
    }
}
