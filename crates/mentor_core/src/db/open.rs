//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Translate `DATABASE_URL` values into file or in-memory targets.
//! - Open connections with the verified profile first and retry once with the
//!   relaxed profile.
//! - Configure connection pragmas required by the import tooling.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - The verified profile never creates a database file; the relaxed profile
//!   creates one only when the caller asks for it.

use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const MEMORY_TARGET: &str = ":memory:";

/// Parsed location of the relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    Memory,
}

/// Connection options applied by one open attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProfile {
    /// Existing database only, read-write, must pass `PRAGMA quick_check`.
    Verified,
    /// Driver defaults: creates the database file when missing.
    Relaxed,
}

impl ConnectProfile {
    fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Relaxed => "relaxed",
        }
    }
}

/// Parses `sqlite://path`, `sqlite:path`, `file:` URIs, plain paths and
/// `:memory:`.
pub fn parse_database_url(url: &str) -> DbResult<DatabaseTarget> {
    let trimmed = url.trim();
    let location = match trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
    {
        Some(rest) => rest.split('?').next().unwrap_or_default(),
        None => trimmed,
    };

    if location.is_empty() {
        return Err(DbError::InvalidUrl(url.to_string()));
    }
    if location.contains("://") {
        // Network drivers are not linked into this tool.
        return Err(DbError::InvalidUrl(url.to_string()));
    }
    if location == MEMORY_TARGET {
        return Ok(DatabaseTarget::Memory);
    }

    Ok(DatabaseTarget::File(PathBuf::from(location)))
}

/// Connects to `url`, retrying once with the relaxed profile.
///
/// Returns the connection together with the profile that succeeded.
///
/// # Errors
/// - `InvalidUrl` when the url cannot be mapped to a SQLite target.
/// - `ConnectFailed` carrying both attempt errors when the retry fails too.
pub fn connect(url: &str) -> DbResult<(Connection, ConnectProfile)> {
    connect_with(url, true)
}

/// Like [`connect`], but neither attempt creates a missing database file.
///
/// Used by read-only commands so a mistyped url leaves no empty file behind.
pub fn connect_existing(url: &str) -> DbResult<(Connection, ConnectProfile)> {
    connect_with(url, false)
}

fn connect_with(url: &str, create_missing: bool) -> DbResult<(Connection, ConnectProfile)> {
    let target = parse_database_url(url)?;

    let verified = match open_target(&target, ConnectProfile::Verified, false) {
        Ok(conn) => return Ok((conn, ConnectProfile::Verified)),
        Err(err) => err,
    };
    warn!(
        "event=db_connect module=db status=retry profile=relaxed create_missing={} error={}",
        create_missing, verified
    );

    match open_target(&target, ConnectProfile::Relaxed, create_missing) {
        Ok(conn) => Ok((conn, ConnectProfile::Relaxed)),
        Err(relaxed) => Err(DbError::ConnectFailed {
            verified: Box::new(verified),
            relaxed: Box::new(relaxed),
        }),
    }
}

/// Opens (creating when missing) a SQLite database file.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_target(
        &DatabaseTarget::File(path.as_ref().to_path_buf()),
        ConnectProfile::Relaxed,
        true,
    )
}

/// Opens a private in-memory SQLite database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(&DatabaseTarget::Memory, ConnectProfile::Relaxed, true)
}

fn open_target(
    target: &DatabaseTarget,
    profile: ConnectProfile,
    create_missing: bool,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = match target {
        DatabaseTarget::File(_) => "file",
        DatabaseTarget::Memory => "memory",
    };
    info!(
        "event=db_open module=db status=start mode={} profile={}",
        mode,
        profile.as_str()
    );

    let opened = match target {
        DatabaseTarget::Memory => Connection::open_in_memory(),
        DatabaseTarget::File(path) if create_missing => Connection::open(path),
        DatabaseTarget::File(path) => Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    };

    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} profile={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                profile.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, profile) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} profile={} duration_ms={}",
                mode,
                profile.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} profile={} duration_ms={} error_code=db_configure_failed error={}",
                mode,
                profile.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &Connection, profile: ConnectProfile) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    if profile == ConnectProfile::Verified {
        let report: String = conn.query_row("PRAGMA quick_check;", [], |row| row.get(0))?;
        if report != "ok" {
            return Err(DbError::IntegrityCheckFailed(report));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_database_url, DatabaseTarget};
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn parse_accepts_sqlite_schemes_and_plain_paths() {
        assert_eq!(
            parse_database_url("sqlite://data/mentor.db?mode=rwc").unwrap(),
            DatabaseTarget::File(PathBuf::from("data/mentor.db"))
        );
        assert_eq!(
            parse_database_url("sqlite:mentor.db").unwrap(),
            DatabaseTarget::File(PathBuf::from("mentor.db"))
        );
        assert_eq!(
            parse_database_url(" /tmp/mentor.db ").unwrap(),
            DatabaseTarget::File(PathBuf::from("/tmp/mentor.db"))
        );
        assert_eq!(
            parse_database_url("sqlite::memory:").unwrap(),
            DatabaseTarget::Memory
        );
    }

    #[test]
    fn parse_rejects_empty_and_network_urls() {
        assert!(matches!(
            parse_database_url("  "),
            Err(DbError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_database_url("mysql://user:pw@gateway.example.com:4000/mentor"),
            Err(DbError::InvalidUrl(_))
        ));
    }
}
