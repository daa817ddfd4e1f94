//! SQLite storage bootstrap, schema lifecycle and catalog inspection.
//!
//! # Responsibility
//! - Resolve `DATABASE_URL` values into SQLite targets and open connections.
//! - Own the fixed 12-table allocation schema (drop/recreate and ensure).
//! - Expose read-only catalog helpers for column reports and census output.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Schema version is tracked via `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod inspect;
mod open;
pub mod schema;

pub use inspect::{list_tables, table_columns, table_exists, ColumnInfo};
pub use open::{
    connect, connect_existing, open_db, open_db_in_memory, parse_database_url, ConnectProfile,
    DatabaseTarget,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidUrl(String),
    IntegrityCheckFailed(String),
    TableNotFound(String),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    ConnectFailed {
        verified: Box<DbError>,
        relaxed: Box<DbError>,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidUrl(url) => write!(f, "unsupported database url `{url}`"),
            Self::IntegrityCheckFailed(report) => {
                write!(f, "database integrity check failed: {report}")
            }
            Self::TableNotFound(table) => write!(f, "table not found: {table}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ConnectFailed { verified, relaxed } => write!(
                f,
                "connection failed ({verified}); fallback failed again ({relaxed})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::ConnectFailed { relaxed, .. } => Some(relaxed.as_ref()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
