//! Allocation schema registry, bootstrapper and ensure step.
//!
//! # Responsibility
//! - Declare the 12 tables in dependency order (referenced before referencing).
//! - Drop and recreate every table for a clean bulk migration.
//! - Create missing tables without dropping for incremental imports.
//!
//! # Invariants
//! - Drops run with `foreign_keys=OFF`; enforcement is restored afterwards,
//!   including when the bootstrap fails.
//! - Any failing statement aborts the bootstrap and rolls back the whole run.
//! - `name` has no uniqueness constraint in `users`.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

/// Version stamped into `PRAGMA user_version` by bootstrap/ensure.
pub const SCHEMA_VERSION: u32 = 1;

/// One table of the fixed schema.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    columns: &'static str,
    indexes: &'static [&'static str],
}

/// Tables in creation order.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "users",
        columns: "id VARCHAR(50) PRIMARY KEY,
        email VARCHAR(255),
        password VARCHAR(255),
        role VARCHAR(20),
        name VARCHAR(255),
        avatar VARCHAR(255),
        specialization VARCHAR(255),
        mentor_id VARCHAR(50),
        batch VARCHAR(20),
        created_at DATETIME",
        indexes: &["CREATE INDEX IF NOT EXISTS idx_users_role_name ON users (role, name)"],
    },
    TableDef {
        name: "mentor_student_allocations",
        columns: "mentor_id VARCHAR(50),
        student_id VARCHAR(50),
        PRIMARY KEY (mentor_id, student_id),
        FOREIGN KEY (mentor_id) REFERENCES users(id),
        FOREIGN KEY (student_id) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "tasks",
        columns: "id VARCHAR(50) PRIMARY KEY,
        mentor_id VARCHAR(50),
        title VARCHAR(255),
        description TEXT,
        requirements TEXT,
        difficulty VARCHAR(20),
        type VARCHAR(50),
        status VARCHAR(20),
        created_at DATETIME,
        FOREIGN KEY (mentor_id) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "task_completions",
        columns: "task_id VARCHAR(50),
        student_id VARCHAR(50),
        PRIMARY KEY (task_id, student_id),
        FOREIGN KEY (task_id) REFERENCES tasks(id),
        FOREIGN KEY (student_id) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "problems",
        columns: "id VARCHAR(50) PRIMARY KEY,
        title VARCHAR(255),
        description TEXT,
        expected_output TEXT,
        sample_input TEXT,
        difficulty VARCHAR(20),
        type VARCHAR(50),
        language VARCHAR(50),
        mentor_id VARCHAR(50),
        status VARCHAR(20),
        created_at DATETIME,
        FOREIGN KEY (mentor_id) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "problem_completions",
        columns: "problem_id VARCHAR(50),
        student_id VARCHAR(50),
        PRIMARY KEY (problem_id, student_id),
        FOREIGN KEY (problem_id) REFERENCES problems(id),
        FOREIGN KEY (student_id) REFERENCES users(id)",
        indexes: &[],
    },
    // problem_id/task_id stay without FKs: either may be null.
    TableDef {
        name: "submissions",
        columns: "id VARCHAR(50) PRIMARY KEY,
        student_id VARCHAR(50),
        problem_id VARCHAR(50),
        task_id VARCHAR(50),
        code MEDIUMTEXT,
        submission_type VARCHAR(20),
        file_name VARCHAR(255),
        language VARCHAR(50),
        score INT,
        status VARCHAR(20),
        feedback TEXT,
        ai_explanation TEXT,
        analysis_correctness VARCHAR(255),
        analysis_efficiency VARCHAR(255),
        analysis_code_style VARCHAR(255),
        analysis_best_practices VARCHAR(255),
        plagiarism_detected VARCHAR(10),
        copied_from VARCHAR(50),
        copied_from_name VARCHAR(255),
        tab_switches INT,
        integrity_violation VARCHAR(10),
        submitted_at DATETIME,
        FOREIGN KEY (student_id) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "aptitude_tests",
        columns: "id VARCHAR(50) PRIMARY KEY,
        title VARCHAR(255),
        type VARCHAR(50),
        difficulty VARCHAR(20),
        duration INT,
        total_questions INT,
        passing_score INT,
        status VARCHAR(20),
        created_by VARCHAR(50),
        created_at DATETIME,
        FOREIGN KEY (created_by) REFERENCES users(id)",
        indexes: &[],
    },
    TableDef {
        name: "aptitude_questions",
        columns: "test_id VARCHAR(50),
        question_id VARCHAR(50),
        question TEXT,
        option_1 TEXT,
        option_2 TEXT,
        option_3 TEXT,
        option_4 TEXT,
        correct_answer TEXT,
        explanation TEXT,
        category VARCHAR(100),
        PRIMARY KEY (test_id, question_id),
        FOREIGN KEY (test_id) REFERENCES aptitude_tests(id)",
        indexes: &[],
    },
    TableDef {
        name: "student_completed_aptitude",
        columns: "student_id VARCHAR(50),
        aptitude_test_id VARCHAR(50),
        PRIMARY KEY (student_id, aptitude_test_id),
        FOREIGN KEY (student_id) REFERENCES users(id),
        FOREIGN KEY (aptitude_test_id) REFERENCES aptitude_tests(id)",
        indexes: &[],
    },
    TableDef {
        name: "aptitude_submissions",
        columns: "id VARCHAR(50) PRIMARY KEY,
        test_id VARCHAR(50),
        test_title VARCHAR(255),
        student_id VARCHAR(50),
        correct_count INT,
        total_questions INT,
        score INT,
        status VARCHAR(20),
        time_spent INT,
        tab_switches INT,
        submitted_at DATETIME,
        FOREIGN KEY (test_id) REFERENCES aptitude_tests(id),
        FOREIGN KEY (student_id) REFERENCES users(id)",
        indexes: &[],
    },
    // No primary key: one submission may carry retried question rows.
    TableDef {
        name: "aptitude_question_results",
        columns: "submission_id VARCHAR(50),
        question_id VARCHAR(50),
        question TEXT,
        user_answer TEXT,
        correct_answer TEXT,
        is_correct VARCHAR(10),
        explanation TEXT,
        category VARCHAR(100),
        FOREIGN KEY (submission_id) REFERENCES aptitude_submissions(id)",
        indexes: &["CREATE INDEX IF NOT EXISTS idx_aptitude_question_results_submission
            ON aptitude_question_results (submission_id)"],
    },
];

impl TableDef {
    fn create_sql(&self, if_not_exists: bool) -> String {
        let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
        format!("CREATE TABLE {guard}{} (\n        {}\n    )", self.name, self.columns)
    }
}

/// Returns table names in creation order.
pub fn table_names() -> impl Iterator<Item = &'static str> {
    TABLES.iter().map(|table| table.name)
}

/// Drops and recreates all schema tables.
///
/// # Side effects
/// - Deletes every row of the 12 tables.
/// - Stamps `PRAGMA user_version` with [`SCHEMA_VERSION`].
///
/// # Errors
/// - Propagates the first failing statement; nothing is partially applied.
pub fn bootstrap_schema(conn: &mut Connection) -> DbResult<()> {
    info!("event=schema_bootstrap module=schema status=start tables={}", TABLES.len());

    // PRAGMA foreign_keys is a no-op inside a transaction.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let result = recreate_tables(conn);
    let restored = conn.execute_batch("PRAGMA foreign_keys = ON;");

    match (&result, &restored) {
        (Ok(()), Ok(())) => info!("event=schema_bootstrap module=schema status=ok"),
        _ => error!("event=schema_bootstrap module=schema status=error"),
    }

    result?;
    restored?;
    Ok(())
}

/// Creates missing tables without touching existing ones.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database was stamped by a newer tool.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let current = current_user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction()?;
    for table in TABLES {
        tx.execute_batch(&table.create_sql(true))?;
        for index in table.indexes {
            tx.execute_batch(index)?;
        }
    }
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;
    Ok(())
}

/// Returns the schema version stamped into the database.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn recreate_tables(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    for table in TABLES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", table.name))?;
    }
    for table in TABLES {
        tx.execute_batch(&table.create_sql(false))?;
        for index in table.indexes {
            tx.execute_batch(index)?;
        }
    }
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{table_names, TABLES};
    use std::collections::HashSet;

    #[test]
    fn registry_has_twelve_unique_tables() {
        let names = table_names().collect::<HashSet<_>>();
        assert_eq!(TABLES.len(), 12);
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn referenced_tables_are_declared_first() {
        let mut declared = HashSet::new();
        for table in TABLES {
            for segment in table.columns.split("REFERENCES ").skip(1) {
                let target = segment.split('(').next().unwrap().trim();
                assert!(
                    declared.contains(target) || target == table.name,
                    "{} references {target} before it is declared",
                    table.name
                );
            }
            declared.insert(table.name);
        }
    }
}
