//! Record store: SQLite access with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `expenses` - Expense CRUD, filtered listing and bulk import
//! - `categories` - Implicit/explicit categories and guarded deletion
//! - `budgets` - Monthly budgets per category
//! - `alerts` - Persisted threshold crossings (the monitor's memory)
//! - `reports` - Read models built on the aggregation functions
//! - `locks` - Per-owner write serialization
//!
//! Every write runs inside one SQLite transaction while holding the owner's
//! lock, so other owners are never blocked and no partial write is visible.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::Result;
use crate::period::Period;

mod alerts;
mod budgets;
mod categories;
mod expenses;
mod locks;
mod reports;

use locks::OwnerLocks;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Lookup key for a category name: names that differ only in case share a key
pub(crate) fn category_key(name: &str) -> String {
    name.to_lowercase()
}

/// Read a decimal stored as TEXT
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a `YYYY-MM-DD` date stored as TEXT
pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a `YYYY-MM` period stored as TEXT
pub(crate) fn period_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Period> {
    let text: String = row.get(idx)?;
    text.parse::<Period>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Run `f` inside an immediate transaction, rolling back on any error
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    conn.execute_batch("BEGIN IMMEDIATE")?;

    match f(conn) {
        Ok(value) => match conn.execute_batch("COMMIT") {
            Ok(()) => Ok(value),
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e.into())
            }
        },
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    locks: Arc<OwnerLocks>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Pragmas that are per-connection must be set on every pooled connection
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            locks: Arc::new(OwnerLocks::default()),
        };
        db.run_migrations()?;

        debug!(path, "Database opened");
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a file under the temp dir rather than `:memory:` so that every
    /// pooled connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "spendie_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any leftovers from an earlier run
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` while holding `owner`'s write lock.
    ///
    /// Not reentrant: `f` must not call another locking method for the same owner.
    pub fn with_owner_lock<T>(&self, owner: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.locks.with_lock(owner, f)
    }

    /// Run a write for `owner`: owner lock plus one SQL transaction
    pub(crate) fn write<T>(
        &self,
        owner: &str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        self.with_owner_lock(owner, || {
            let conn = self.conn()?;
            in_transaction(&conn, f)
        })
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Categories (names unique per owner, ignoring case).
            -- name_key is the Unicode-lowercased name; NOCASE only folds ASCII.
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                name_key TEXT NOT NULL,
                parent_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner, name_key)
            );

            -- Expenses (amounts are decimal text, never floats)
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT,
                source TEXT NOT NULL DEFAULT 'manual',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_owner_date ON expenses(owner, date);
            CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);

            -- Budgets: one per (owner, category, month)
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                period TEXT NOT NULL,
                limit_amount TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME,
                UNIQUE(owner, category_id, period)
            );

            -- Threshold crossings already reported, one row per threshold
            CREATE TABLE IF NOT EXISTS budget_alerts (
                id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                period TEXT NOT NULL,
                threshold TEXT NOT NULL,
                spent TEXT NOT NULL,
                limit_amount TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner, category_id, period, threshold)
            );

            CREATE INDEX IF NOT EXISTS idx_budget_alerts_owner ON budget_alerts(owner, period);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
