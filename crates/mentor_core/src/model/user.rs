//! User domain model.
//!
//! # Responsibility
//! - Define the identity record shared by mentors and students.
//! - Provide the single identifier strategy used by every import path.
//!
//! # Invariants
//! - `id` is stable and never reused for another user.
//! - `mentor_id` is meaningful only for `Role::Student`.
//! - `name` is the natural key inside one import run, but the schema does not
//!   enforce its uniqueness.

use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Users are keyed by opaque text ids (UUIDs for rows created by this tool,
/// legacy ids such as `student-001` for loaded rows).
pub type UserId = String;

/// Generates a new user identifier.
pub fn new_user_id() -> UserId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Mentor,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mentor" => Some(Self::Mentor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    /// Placeholder credential; never hashed by this tool.
    pub password: Option<String>,
    pub role: Role,
    pub name: String,
    pub avatar: Option<String>,
    pub specialization: Option<String>,
    pub mentor_id: Option<UserId>,
    pub batch: Option<String>,
    /// Text timestamp; `None` lets the store stamp the insert time.
    pub created_at: Option<String>,
}

impl User {
    /// Creates a user with a generated id and every optional field unset.
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            id: new_user_id(),
            email: None,
            password: None,
            role,
            name: name.into(),
            avatar: None,
            specialization: None,
            mentor_id: None,
            batch: None,
            created_at: None,
        }
    }
}
