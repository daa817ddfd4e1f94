//! Read-only verification and schema inspection.
//!
//! # Responsibility
//! - Aggregate counts and per-mentor listings after an import.
//! - Table census against the fixed schema.
//! - Column report files for one table.
//!
//! # Invariants
//! - Nothing in this module writes to the database.

use crate::db::schema::table_names;
use crate::db::{table_columns, table_exists, ColumnInfo};
use crate::model::identity::NameMatching;
use crate::model::user::{Role, User};
use crate::repo::allocation_repo::AllocationRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const RULE_WIDTH: usize = 60;
const NAME_COLUMN_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub mentors: i64,
    pub students: i64,
    pub allocations: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorReport {
    pub mentor: User,
    /// Students whose `mentor_id` points at the mentor.
    pub student_count: i64,
    /// Same students, ordered by name.
    pub students: Vec<User>,
    /// Allocation rows naming the mentor, historical ones included.
    pub allocation_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusEntry {
    pub table: String,
    pub present: bool,
    /// `None` when the table is absent.
    pub rows: Option<i64>,
}

/// Outcome of [`write_column_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnReport {
    Written(Vec<ColumnInfo>),
    /// The report file holds the inspection error instead of columns.
    InspectionFailed(String),
}

/// Verification facade over repository implementations.
pub struct VerifyService<U: UserRepository, A: AllocationRepository> {
    users: U,
    allocations: A,
}

impl<U: UserRepository, A: AllocationRepository> VerifyService<U, A> {
    pub fn new(users: U, allocations: A) -> Self {
        Self { users, allocations }
    }

    pub fn summary(&self) -> RepoResult<DatabaseSummary> {
        Ok(DatabaseSummary {
            mentors: self.users.count_by_role(Role::Mentor)?,
            students: self.users.count_by_role(Role::Student)?,
            allocations: self.allocations.count_all()?,
        })
    }

    /// Returns `None` when no mentor matches `name`.
    pub fn mentor_report(
        &self,
        name: &str,
        matching: NameMatching,
    ) -> RepoResult<Option<MentorReport>> {
        let Some(mentor) = self.users.find_by_name(Role::Mentor, name, matching)? else {
            return Ok(None);
        };

        Ok(Some(MentorReport {
            student_count: self.users.count_students_of(&mentor.id)?,
            students: self.users.list_students_of(&mentor.id)?,
            allocation_count: self.allocations.count_for_mentor(&mentor.id)?,
            mentor,
        }))
    }

    pub fn list_students(&self, limit: Option<u32>) -> RepoResult<Vec<User>> {
        self.users.list_by_role(Role::Student, limit)
    }
}

/// Presence and row count of every schema table.
pub fn table_census(conn: &Connection) -> RepoResult<Vec<CensusEntry>> {
    let mut entries = Vec::new();
    for table in table_names() {
        let present = table_exists(conn, table)?;
        let rows = if present {
            // `table` comes from the static schema registry.
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))?;
            Some(count)
        } else {
            None
        };
        entries.push(CensusEntry {
            table: table.to_string(),
            present,
            rows,
        });
    }
    Ok(entries)
}

/// Writes the column list of `table` to `path`.
///
/// Inspection failures are written into the file and returned as
/// [`ColumnReport::InspectionFailed`]; only I/O failures are errors.
pub fn write_column_report(
    conn: &Connection,
    table: &str,
    path: &Path,
) -> io::Result<ColumnReport> {
    let (text, report) = match table_columns(conn, table) {
        Ok(columns) => (render_columns(table, &columns), ColumnReport::Written(columns)),
        Err(err) => (
            format!("Error inspecting {table} table: {err}\n"),
            ColumnReport::InspectionFailed(err.to_string()),
        ),
    };
    fs::write(path, text)?;
    Ok(report)
}

pub fn render_columns(table: &str, columns: &[ColumnInfo]) -> String {
    let mut out = format!("Columns in '{table}' table:\n");
    for column in columns {
        let _ = writeln!(out, "- {} ({})", column.name, column.declared_type);
    }
    out
}

pub fn render_summary(summary: &DatabaseSummary) -> String {
    format!(
        "Database Summary:\n  Total Mentors: {}\n  Total Students: {}\n  Total Allocations: {}\n",
        summary.mentors, summary.students, summary.allocations
    )
}

pub fn render_mentor_report(name: &str, report: Option<&MentorReport>) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\n{name} Mentor Details:\n{rule}");

    let Some(report) = report else {
        let _ = writeln!(out, "{name} mentor not found!");
        return out;
    };

    let _ = writeln!(out, "ID: {}", report.mentor.id);
    let _ = writeln!(out, "Name: {}", report.mentor.name);
    let _ = writeln!(out, "Email: {}", report.mentor.email.as_deref().unwrap_or(""));
    let _ = writeln!(out, "Total Students: {}", report.student_count);

    let _ = writeln!(out, "\n{rule}\nStudents under {name}:\n{rule}");
    for (idx, student) in report.students.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:2}. {:<width$} ({})",
            idx + 1,
            student.name,
            student.email.as_deref().unwrap_or(""),
            width = NAME_COLUMN_WIDTH
        );
    }

    let _ = writeln!(out, "\n{rule}\nMentor-Student Allocations for {name}:\n{rule}");
    let _ = writeln!(out, "Total Allocations: {}", report.allocation_count);
    out
}

pub fn render_census(entries: &[CensusEntry]) -> String {
    let mut out = String::new();
    for (idx, entry) in entries.iter().enumerate() {
        match entry.rows {
            Some(rows) => {
                let _ = writeln!(out, "{:2}. {:<32} {rows} rows", idx + 1, entry.table);
            }
            None => {
                let _ = writeln!(out, "{:2}. {:<32} MISSING", idx + 1, entry.table);
            }
        }
    }
    let present = entries.iter().filter(|entry| entry.present).count();
    let _ = writeln!(out, "\n{present}/{} tables present", entries.len());
    out
}
