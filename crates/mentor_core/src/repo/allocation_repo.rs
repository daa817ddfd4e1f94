//! Allocation repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Insert is a single `INSERT .. ON CONFLICT DO NOTHING` guarded by the
//!   `(mentor_id, student_id)` primary key, so check and write cannot race.
//! - Historical rows are only removed through `remove_other_allocations`.

use crate::model::allocation::Allocation;
use crate::repo::RepoResult;
use rusqlite::{params, Connection};

/// Result of an allocation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    Created,
    AlreadyExists,
}

/// Repository interface for `mentor_student_allocations`.
pub trait AllocationRepository {
    /// Inserts the pair unless it already exists.
    fn insert_if_absent(&self, mentor_id: &str, student_id: &str)
        -> RepoResult<AllocationOutcome>;
    /// Deletes every allocation of `student_id` except the one to
    /// `keep_mentor_id`; returns the number of removed rows.
    fn remove_other_allocations(&self, student_id: &str, keep_mentor_id: &str)
        -> RepoResult<usize>;
    fn count_all(&self) -> RepoResult<i64>;
    fn count_for_mentor(&self, mentor_id: &str) -> RepoResult<i64>;
    /// Allocations of one student, ordered by mentor id.
    fn list_for_student(&self, student_id: &str) -> RepoResult<Vec<Allocation>>;
}

/// SQLite-backed allocation repository.
pub struct SqliteAllocationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAllocationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AllocationRepository for SqliteAllocationRepository<'_> {
    fn insert_if_absent(
        &self,
        mentor_id: &str,
        student_id: &str,
    ) -> RepoResult<AllocationOutcome> {
        let inserted = self.conn.execute(
            "INSERT INTO mentor_student_allocations (mentor_id, student_id)
             VALUES (?1, ?2)
             ON CONFLICT (mentor_id, student_id) DO NOTHING;",
            params![mentor_id, student_id],
        )?;

        Ok(if inserted == 0 {
            AllocationOutcome::AlreadyExists
        } else {
            AllocationOutcome::Created
        })
    }

    fn remove_other_allocations(
        &self,
        student_id: &str,
        keep_mentor_id: &str,
    ) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM mentor_student_allocations
             WHERE student_id = ?1
               AND mentor_id <> ?2;",
            params![student_id, keep_mentor_id],
        )?;
        Ok(removed)
    }

    fn count_all(&self) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM mentor_student_allocations;",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_for_mentor(&self, mentor_id: &str) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM mentor_student_allocations WHERE mentor_id = ?1;",
            [mentor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_for_student(&self, student_id: &str) -> RepoResult<Vec<Allocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT mentor_id, student_id
             FROM mentor_student_allocations
             WHERE student_id = ?1
             ORDER BY mentor_id ASC;",
        )?;
        let allocations = stmt
            .query_map([student_id], |row| {
                Ok(Allocation {
                    mentor_id: row.get(0)?,
                    student_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(allocations)
    }
}
