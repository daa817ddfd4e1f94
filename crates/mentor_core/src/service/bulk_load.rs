//! CSV directory to table migration.
//!
//! # Responsibility
//! - Load one CSV file verbatim into one table (`load_table`).
//! - Rebuild the schema and load the fixed file set in FK-safe order
//!   (`migrate_directory`).
//!
//! # Invariants
//! - Empty CSV fields are written as SQL NULL, never as empty strings.
//! - A table load is all-or-nothing; a failure rolls back that table only and
//!   the migration continues with the next file.
//! - Header names are spliced into SQL only after matching
//!   [`IDENTIFIER_PATTERN`].
//! - Schema bootstrap failures abort the migration.

use crate::db::schema::bootstrap_schema;
use crate::db::DbResult;
use crate::input::csv_table::CsvTable;
use crate::service::import_service::{ImportError, ImportResult};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};

pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(IDENTIFIER_PATTERN).expect("valid identifier regex"));

/// `(file name, table)` pairs in load order.
pub const MIGRATION_PLAN: &[(&str, &str)] = &[
    ("users.csv", "users"),
    ("mentor_student_allocations.csv", "mentor_student_allocations"),
    ("aptitude_tests.csv", "aptitude_tests"),
    ("aptitude_questions.csv", "aptitude_questions"),
    ("tasks.csv", "tasks"),
    ("problems.csv", "problems"),
    ("task_completions.csv", "task_completions"),
    ("problem_completions.csv", "problem_completions"),
    ("student_completed_aptitude.csv", "student_completed_aptitude"),
    ("submissions.csv", "submissions"),
    ("aptitude_submissions.csv", "aptitude_submissions"),
    ("aptitude_question_results.csv", "aptitude_question_results"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Imported(usize),
    /// Header only, nothing inserted.
    Empty,
    MissingFile,
    /// Rolled back; carries the error text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub file: String,
    pub table: String,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Source directory absent; nothing was touched.
    MissingDirectory(PathBuf),
    Completed(Vec<TableLoad>),
}

/// Loads `csv_path` into `table` inside one transaction.
///
/// Never returns an error: failures are logged, rolled back and reported as
/// [`LoadOutcome::Failed`].
pub fn load_table(conn: &Connection, csv_path: &Path, table: &str) -> LoadOutcome {
    if !csv_path.is_file() {
        warn!(
            "event=table_load module=bulk_load status=skipped table={} reason=missing_file",
            table
        );
        return LoadOutcome::MissingFile;
    }

    let rows = match CsvTable::read_path(csv_path) {
        Ok(rows) => rows,
        Err(err) => {
            error!(
                "event=table_load module=bulk_load status=error table={} stage=read error={}",
                table, err
            );
            return LoadOutcome::Failed(err.to_string());
        }
    };

    if rows.is_empty() {
        info!(
            "event=table_load module=bulk_load status=ok table={} rows=0",
            table
        );
        return LoadOutcome::Empty;
    }

    let sql = match insert_statement(table, rows.headers()) {
        Ok(sql) => sql,
        Err(err) => {
            error!(
                "event=table_load module=bulk_load status=error table={} stage=prepare error={}",
                table, err
            );
            return LoadOutcome::Failed(err.to_string());
        }
    };

    match insert_rows(conn, &sql, &rows) {
        Ok(count) => {
            info!(
                "event=table_load module=bulk_load status=ok table={} rows={}",
                table, count
            );
            LoadOutcome::Imported(count)
        }
        Err(err) => {
            error!(
                "event=table_load module=bulk_load status=rolled_back table={} statement=\"{}\" error={}",
                table, sql, err
            );
            LoadOutcome::Failed(err.to_string())
        }
    }
}

/// Rebuilds the schema and loads every file of [`MIGRATION_PLAN`] from `dir`.
///
/// # Errors
/// - Schema bootstrap failures propagate; table load failures do not.
pub fn migrate_directory(conn: &mut Connection, dir: &Path) -> DbResult<MigrationOutcome> {
    if !dir.is_dir() {
        warn!("event=migrate module=bulk_load status=skipped reason=missing_directory");
        return Ok(MigrationOutcome::MissingDirectory(dir.to_path_buf()));
    }

    bootstrap_schema(conn)?;

    let loads = MIGRATION_PLAN
        .iter()
        .map(|(file, table)| TableLoad {
            file: (*file).to_string(),
            table: (*table).to_string(),
            outcome: load_table(conn, &dir.join(file), table),
        })
        .collect::<Vec<_>>();

    let failed = loads
        .iter()
        .filter(|load| matches!(load.outcome, LoadOutcome::Failed(_)))
        .count();
    info!(
        "event=migrate module=bulk_load status=ok tables={} failed={}",
        loads.len(),
        failed
    );
    Ok(MigrationOutcome::Completed(loads))
}

fn insert_statement(table: &str, columns: &[String]) -> ImportResult<String> {
    if columns.is_empty() {
        return Err(ImportError::InvalidIdentifier(String::new()));
    }
    for identifier in std::iter::once(table).chain(columns.iter().map(String::as_str)) {
        if !IDENTIFIER_RE.is_match(identifier) {
            return Err(ImportError::InvalidIdentifier(identifier.to_string()));
        }
    }

    let placeholders = (1..=columns.len())
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    ))
}

fn insert_rows(conn: &Connection, sql: &str, rows: &CsvTable) -> ImportResult<usize> {
    // Dropping the transaction on `?` rolls back every row of this table.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(sql)?;
        for record in rows.records() {
            stmt.execute(params_from_iter(record.nullable_values()))?;
            count += 1;
        }
    }
    tx.commit()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::insert_statement;
    use crate::service::import_service::ImportError;

    #[test]
    fn insert_statement_uses_numbered_placeholders() {
        let sql = insert_statement("users", &["id".to_string(), "email".to_string()]).unwrap();
        assert_eq!(sql, "INSERT INTO users (id, email) VALUES (?1, ?2)");
    }

    #[test]
    fn insert_statement_rejects_unsafe_identifiers() {
        let err = insert_statement("users", &["id".to_string(), "name); DROP".to_string()])
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidIdentifier(value) if value == "name); DROP"));
    }
}
