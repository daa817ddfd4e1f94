//! Mentor/student import use-case service.
//!
//! # Responsibility
//! - Resolve mentor and student names to stable ids, creating users on miss.
//! - Keep `users.mentor_id` in step with the sheet and write allocation rows.
//! - Report progress through caller-supplied [`ImportEvent`] callbacks.
//!
//! # Invariants
//! - Each resolution runs lookup and insert inside one immediate transaction.
//! - Re-running the same sheet creates no users and no allocations.
//! - Reassignment keeps older allocation rows unless
//!   [`AllocationPolicy::Replace`] is selected.

use crate::db::DbError;
use crate::input::allocation_sheet::MentorGroup;
use crate::input::InputError;
use crate::model::allocation::AllocationPolicy;
use crate::model::identity::{AccountDefaults, NameMatching};
use crate::model::user::{Role, User, UserId};
use crate::repo::allocation_repo::{
    AllocationOutcome, AllocationRepository, SqliteAllocationRepository,
};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug)]
pub enum ImportError {
    Repo(RepoError),
    Input(InputError),
    EmptyName(Role),
    /// Table or column name that cannot be spliced into SQL.
    InvalidIdentifier(String),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Input(err) => write!(f, "{err}"),
            Self::EmptyName(role) => write!(f, "{role} name cannot be empty"),
            Self::InvalidIdentifier(value) => write!(f, "invalid sql identifier `{value}`"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Input(err) => Some(err),
            Self::EmptyName(_) | Self::InvalidIdentifier(_) => None,
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<InputError> for ImportError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}

impl From<DbError> for ImportError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Knobs for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub matching: NameMatching,
    pub allocation_policy: AllocationPolicy,
    pub defaults: AccountDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMentor {
    pub id: UserId,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentResolution {
    Created,
    /// Existing student moved to the resolved mentor.
    Reassigned { previous_mentor: Option<UserId> },
    /// Existing student already pointed at the resolved mentor.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStudent {
    pub id: UserId,
    pub resolution: StudentResolution,
}

/// Result of one allocation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationWrite {
    pub outcome: AllocationOutcome,
    /// Older rows removed under [`AllocationPolicy::Replace`].
    pub removed: usize,
}

/// Progress notifications emitted by [`ImportService::import_groups`].
#[derive(Debug, Clone, Copy)]
pub enum ImportEvent<'a> {
    MentorStarted {
        mentor: &'a str,
        students: usize,
    },
    MentorResolved {
        mentor: &'a str,
        resolved: &'a ResolvedMentor,
    },
    StudentResolved {
        student: &'a str,
        resolved: &'a ResolvedStudent,
    },
    AllocationWritten {
        write: AllocationWrite,
    },
}

/// Counters for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub mentors_created: usize,
    pub mentors_matched: usize,
    pub students_created: usize,
    pub students_reassigned: usize,
    pub students_unchanged: usize,
    pub allocations_created: usize,
    pub allocations_existing: usize,
    pub allocations_removed: usize,
}

/// Returns the id of the mentor named `name`, creating the mentor on miss.
pub fn resolve_mentor_with<U: UserRepository>(
    users: &U,
    name: &str,
    options: &ImportOptions,
) -> ImportResult<ResolvedMentor> {
    let name = non_empty_name(name, Role::Mentor)?;

    if let Some(existing) = users.find_by_name(Role::Mentor, name, options.matching)? {
        debug!(
            "event=user_resolve module=import status=found role=mentor id={}",
            existing.id
        );
        return Ok(ResolvedMentor {
            id: existing.id,
            created: false,
        });
    }

    let user = new_account(Role::Mentor, name, &options.defaults);
    users.insert_user(&user)?;
    info!(
        "event=user_resolve module=import status=created role=mentor id={}",
        user.id
    );
    Ok(ResolvedMentor {
        id: user.id,
        created: true,
    })
}

/// Returns the id of the student named `name`, creating the student on miss
/// and pointing it at `mentor_id`.
pub fn resolve_student_with<U: UserRepository>(
    users: &U,
    name: &str,
    mentor_id: &str,
    options: &ImportOptions,
) -> ImportResult<ResolvedStudent> {
    let name = non_empty_name(name, Role::Student)?;

    if let Some(existing) = users.find_by_name(Role::Student, name, options.matching)? {
        if existing.mentor_id.as_deref() == Some(mentor_id) {
            debug!(
                "event=user_resolve module=import status=found role=student id={}",
                existing.id
            );
            return Ok(ResolvedStudent {
                id: existing.id,
                resolution: StudentResolution::Unchanged,
            });
        }

        users.set_mentor(&existing.id, mentor_id)?;
        info!(
            "event=user_resolve module=import status=reassigned role=student id={} mentor_id={}",
            existing.id, mentor_id
        );
        return Ok(ResolvedStudent {
            id: existing.id,
            resolution: StudentResolution::Reassigned {
                previous_mentor: existing.mentor_id,
            },
        });
    }

    let mut user = new_account(Role::Student, name, &options.defaults);
    user.mentor_id = Some(mentor_id.to_string());
    users.insert_user(&user)?;
    info!(
        "event=user_resolve module=import status=created role=student id={} mentor_id={}",
        user.id, mentor_id
    );
    Ok(ResolvedStudent {
        id: user.id,
        resolution: StudentResolution::Created,
    })
}

/// Ensures exactly one allocation row links the pair.
pub fn ensure_allocation_with<A: AllocationRepository>(
    allocations: &A,
    mentor_id: &str,
    student_id: &str,
    policy: AllocationPolicy,
) -> ImportResult<AllocationWrite> {
    let outcome = allocations.insert_if_absent(mentor_id, student_id)?;
    let removed = match policy {
        AllocationPolicy::Accumulate => 0,
        AllocationPolicy::Replace => allocations.remove_other_allocations(student_id, mentor_id)?,
    };

    debug!(
        "event=allocation_write module=import status={} removed={}",
        match outcome {
            AllocationOutcome::Created => "created",
            AllocationOutcome::AlreadyExists => "exists",
        },
        removed
    );
    Ok(AllocationWrite { outcome, removed })
}

fn non_empty_name(name: &str, role: Role) -> ImportResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ImportError::EmptyName(role));
    }
    Ok(trimmed)
}

fn new_account(role: Role, name: &str, defaults: &AccountDefaults) -> User {
    let mut user = User::new(role, name);
    user.email = Some(defaults.email_for(role, name));
    user.password = Some(defaults.password_for(role).to_string());
    user
}

/// SQLite-bound import service; every write is its own committed unit.
pub struct ImportService<'conn> {
    conn: &'conn Connection,
    options: ImportOptions,
}

impl<'conn> ImportService<'conn> {
    pub fn new(conn: &'conn Connection, options: ImportOptions) -> Self {
        Self { conn, options }
    }

    pub fn resolve_mentor(&self, name: &str) -> ImportResult<ResolvedMentor> {
        let tx = self.begin()?;
        let resolved = resolve_mentor_with(&SqliteUserRepository::new(&tx), name, &self.options)?;
        tx.commit()?;
        Ok(resolved)
    }

    pub fn resolve_student(&self, name: &str, mentor_id: &str) -> ImportResult<ResolvedStudent> {
        let tx = self.begin()?;
        let resolved = resolve_student_with(
            &SqliteUserRepository::new(&tx),
            name,
            mentor_id,
            &self.options,
        )?;
        tx.commit()?;
        Ok(resolved)
    }

    pub fn ensure_allocation(
        &self,
        mentor_id: &str,
        student_id: &str,
    ) -> ImportResult<AllocationWrite> {
        let tx = self.begin()?;
        let write = ensure_allocation_with(
            &SqliteAllocationRepository::new(&tx),
            mentor_id,
            student_id,
            self.options.allocation_policy,
        )?;
        tx.commit()?;
        Ok(write)
    }

    /// Imports grouped rows: mentor first, then each of its students and the
    /// allocation linking them.
    ///
    /// # Errors
    /// - Stops at the first failing write; earlier writes stay committed.
    pub fn import_groups<F>(
        &self,
        groups: &[MentorGroup],
        mut on_event: F,
    ) -> ImportResult<ImportReport>
    where
        F: FnMut(ImportEvent<'_>),
    {
        info!(
            "event=import_run module=import status=start mentors={} matching={}",
            groups.len(),
            self.options.matching.as_str()
        );
        let mut report = ImportReport::default();

        for group in groups {
            on_event(ImportEvent::MentorStarted {
                mentor: &group.mentor,
                students: group.students.len(),
            });

            let mentor = self.resolve_mentor(&group.mentor)?;
            if mentor.created {
                report.mentors_created += 1;
            } else {
                report.mentors_matched += 1;
            }
            on_event(ImportEvent::MentorResolved {
                mentor: &group.mentor,
                resolved: &mentor,
            });

            for student_name in &group.students {
                let student = self.resolve_student(student_name, &mentor.id)?;
                match student.resolution {
                    StudentResolution::Created => report.students_created += 1,
                    StudentResolution::Reassigned { .. } => report.students_reassigned += 1,
                    StudentResolution::Unchanged => report.students_unchanged += 1,
                }
                on_event(ImportEvent::StudentResolved {
                    student: student_name,
                    resolved: &student,
                });

                let write = self.ensure_allocation(&mentor.id, &student.id)?;
                match write.outcome {
                    AllocationOutcome::Created => report.allocations_created += 1,
                    AllocationOutcome::AlreadyExists => report.allocations_existing += 1,
                }
                report.allocations_removed += write.removed;
                on_event(ImportEvent::AllocationWritten { write });
            }
        }

        info!(
            "event=import_run module=import status=ok mentors_created={} students_created={} students_reassigned={} allocations_created={}",
            report.mentors_created,
            report.students_created,
            report.students_reassigned,
            report.allocations_created
        );
        Ok(report)
    }

    fn begin(&self) -> ImportResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}
