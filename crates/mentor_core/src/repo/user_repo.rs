//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup-by-natural-key, insert and mentor reassignment over
//!   `users`.
//! - Provide read-only counts and listings for verification output.
//!
//! # Invariants
//! - Name lookups are scoped to one role and follow the caller's
//!   [`NameMatching`] policy.
//! - When duplicate names exist, the earliest inserted row wins.

use crate::model::identity::NameMatching;
use crate::model::user::{Role, User};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    password,
    role,
    name,
    avatar,
    specialization,
    mentor_id,
    batch,
    created_at
FROM users";

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Finds the first user with `role` whose name matches `name`.
    fn find_by_name(
        &self,
        role: Role,
        name: &str,
        matching: NameMatching,
    ) -> RepoResult<Option<User>>;
    fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    fn insert_user(&self, user: &User) -> RepoResult<()>;
    /// Points a student at a new mentor.
    fn set_mentor(&self, student_id: &str, mentor_id: &str) -> RepoResult<()>;
    fn count_by_role(&self, role: Role) -> RepoResult<i64>;
    fn count_students_of(&self, mentor_id: &str) -> RepoResult<i64>;
    /// Students whose `mentor_id` is `mentor_id`, ordered by name.
    fn list_students_of(&self, mentor_id: &str) -> RepoResult<Vec<User>>;
    fn list_by_role(&self, role: Role, limit: Option<u32>) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_by_name(
        &self,
        role: Role,
        name: &str,
        matching: NameMatching,
    ) -> RepoResult<Option<User>> {
        let name_clause = match matching {
            NameMatching::Exact => "trim(name) = ?2",
            NameMatching::CaseInsensitive => "upper(trim(name)) = upper(?2)",
        };
        let sql = format!(
            "{USER_SELECT_SQL}
             WHERE role = ?1
               AND {name_clause}
             ORDER BY rowid ASC
             LIMIT 1;"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![role.as_str(), name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn insert_user(&self, user: &User) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (
                id,
                email,
                password,
                role,
                name,
                avatar,
                specialization,
                mentor_id,
                batch,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, COALESCE(?10, CURRENT_TIMESTAMP));",
            params![
                user.id.as_str(),
                user.email.as_deref(),
                user.password.as_deref(),
                user.role.as_str(),
                user.name.as_str(),
                user.avatar.as_deref(),
                user.specialization.as_deref(),
                user.mentor_id.as_deref(),
                user.batch.as_deref(),
                user.created_at.as_deref(),
            ],
        )?;

        Ok(())
    }

    fn set_mentor(&self, student_id: &str, mentor_id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET mentor_id = ?1 WHERE id = ?2;",
            params![mentor_id, student_id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(student_id.to_string()));
        }

        Ok(())
    }

    fn count_by_role(&self, role: Role) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1;",
            [role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_students_of(&self, mentor_id: &str) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'student' AND mentor_id = ?1;",
            [mentor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_students_of(&self, mentor_id: &str) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             WHERE role = 'student'
               AND mentor_id = ?1
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([mentor_id])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn list_by_role(&self, role: Role, limit: Option<u32>) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE role = ? ORDER BY name ASC, id ASC");
        let mut bind_values = vec![Value::Text(role.as_str().to_string())];
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: String = row.get("id")?;
    let role = match row.get::<_, Option<String>>("role")? {
        Some(text) => Role::parse(&text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{text}` in users.role for `{id}`"))
        })?,
        None => {
            return Err(RepoError::InvalidData(format!(
                "missing role in users.role for `{id}`"
            )));
        }
    };

    Ok(User {
        email: row.get("email")?,
        password: row.get("password")?,
        role,
        name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
        avatar: row.get("avatar")?,
        specialization: row.get("specialization")?,
        mentor_id: row.get("mentor_id")?,
        batch: row.get("batch")?,
        created_at: timestamp_text(row, "created_at")?,
        id,
    })
}

/// `DATETIME` columns have numeric affinity, so rows loaded verbatim from CSV
/// may hold integers or reals; they are rendered as text.
fn timestamp_text(row: &Row<'_>, column: &str) -> RepoResult<Option<String>> {
    match row.get_ref(column)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(value) => Ok(Some(value.to_string())),
        ValueRef::Real(value) => Ok(Some(value.to_string())),
        ValueRef::Text(bytes) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(RepoError::InvalidData(format!(
            "blob value in users.{column}"
        ))),
    }
}
