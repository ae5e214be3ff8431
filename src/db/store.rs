//! SQLite database store implementation.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;
use super::repository::TargetRepository;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
    #[error("connection lock poisoned")]
    Poisoned,
}

const MIGRATIONS: &[(&str, &str)] = &[
    ("000001_init", include_str!("../../migrations/000001_init.up.sql")),
    (
        "000002_targets_url_index",
        include_str!("../../migrations/000002_targets_url_index.up.sql"),
    ),
];

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        for (name, sql) in MIGRATIONS {
            conn.execute_batch(sql)
                .map_err(|e| DbError::Migration(format!("{} failed: {}", name, e)))?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // --- Target CRUD ---

    /// Add a new target and return its ID.
    pub fn add_target(&self, target: &mut Target) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO targets (name, url, status) VALUES (?1, ?2, ?3)",
            params![target.name, target.url, target.status.as_str()],
        )?;
        let id = conn.last_insert_rowid();
        target.id = id;
        Ok(id)
    }

    /// Get all targets.
    pub fn get_targets(&self) -> Result<Vec<Target>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, url, status FROM targets ORDER BY id")?;

        let targets = stmt
            .query_map([], target_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(targets)
    }

    /// Get a target by ID.
    pub fn get_target(&self, id: i64) -> Result<Target, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, url, status FROM targets WHERE id = ?1",
            params![id],
            target_from_row,
        )
        .optional()?
        .ok_or(DbError::NotFound)
    }

    /// Overwrite the status column. Missing rows are reported, not created.
    pub fn set_status(&self, id: i64, status: Status) -> Result<UpdateOutcome, DbError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE targets SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(if changed == 0 {
            UpdateOutcome::NotFound
        } else {
            UpdateOutcome::Updated
        })
    }

    /// Delete a target. Returns whether a row was removed.
    pub fn delete_target(&self, id: i64) -> Result<bool, DbError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

fn target_from_row(row: &Row<'_>) -> SqlResult<Target> {
    let status: String = row.get(3)?;
    Ok(Target {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        status: status.parse().unwrap_or(Status::Unknown),
    })
}

#[async_trait]
impl TargetRepository for Store {
    async fn list_targets(&self) -> Result<Vec<Target>, DbError> {
        self.get_targets()
    }

    async fn update_status(&self, id: i64, status: Status) -> Result<UpdateOutcome, DbError> {
        self.set_status(id, status)
    }
}
