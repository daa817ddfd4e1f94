use mentor_core::db::schema::{
    bootstrap_schema, current_user_version, ensure_schema, table_names, SCHEMA_VERSION,
};
use mentor_core::db::{list_tables, table_columns};
use mentor_core::{
    connect, connect_existing, open_db, open_db_in_memory, ConnectProfile, DbError,
};
use rusqlite::Connection;

fn foreign_keys_enabled(conn: &Connection) -> bool {
    conn.query_row("PRAGMA foreign_keys;", [], |row| row.get::<_, i64>(0))
        .unwrap()
        == 1
}

#[test]
fn bootstrap_creates_all_twelve_tables() {
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    let tables = list_tables(&conn).unwrap();
    assert_eq!(tables.len(), 12);
    for name in table_names() {
        assert!(tables.iter().any(|table| table == name), "missing {name}");
    }
    assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
    assert!(foreign_keys_enabled(&conn));
}

#[test]
fn bootstrap_twice_leaves_empty_tables() {
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, role, name) VALUES ('m1', 'mentor', 'HOD');
         INSERT INTO users (id, role, name, mentor_id) VALUES ('s1', 'student', 'ASHA', 'm1');
         INSERT INTO mentor_student_allocations (mentor_id, student_id) VALUES ('m1', 's1');",
    )
    .unwrap();

    bootstrap_schema(&mut conn).unwrap();

    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    let allocations: i64 = conn
        .query_row("SELECT COUNT(*) FROM mentor_student_allocations;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(users, 0);
    assert_eq!(allocations, 0);
    assert!(foreign_keys_enabled(&conn));
}

#[test]
fn allocation_foreign_keys_are_enforced_after_bootstrap() {
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    let result = conn.execute(
        "INSERT INTO mentor_student_allocations (mentor_id, student_id) VALUES ('x', 'y');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn failing_bootstrap_rolls_back_and_restores_foreign_keys() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id TEXT PRIMARY KEY, role TEXT, name TEXT);
         INSERT INTO users VALUES ('m1', 'mentor', 'HOD');
         CREATE VIEW aptitude_question_results AS SELECT 1 AS id;",
    )
    .unwrap();

    // DROP TABLE refuses to drop a view, so the transaction fails part way.
    let err = bootstrap_schema(&mut conn).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
    assert_eq!(current_user_version(&conn).unwrap(), 0);
    assert!(foreign_keys_enabled(&conn));
}

#[test]
fn ensure_schema_keeps_existing_rows() {
    let mut conn = open_db_in_memory().unwrap();
    ensure_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO users (id, role, name) VALUES ('m1', 'mentor', 'HOD');",
        [],
    )
    .unwrap();

    ensure_schema(&mut conn).unwrap();

    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
    assert_eq!(list_tables(&conn).unwrap().len(), 12);
}

#[test]
fn ensure_schema_rejects_newer_database() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();

    let err = ensure_schema(&mut conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion {
            db_version: 999,
            latest_supported: SCHEMA_VERSION
        }
    ));
}

#[test]
fn column_inspection_reports_declared_types() {
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    let columns = table_columns(&conn, "aptitude_tests").unwrap();
    assert!(columns.iter().any(|column| column.name == "id"));

    let err = table_columns(&conn, "no_such_table").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(table) if table == "no_such_table"));
}

#[test]
fn connect_falls_back_to_relaxed_profile_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");
    let url = format!("sqlite://{}", path.display());

    let (_conn, profile) = connect(&url).unwrap();
    assert_eq!(profile, ConnectProfile::Relaxed);
    assert!(path.exists());
}

#[test]
fn connect_uses_verified_profile_for_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.db");
    {
        let mut conn = open_db(&path).unwrap();
        ensure_schema(&mut conn).unwrap();
    }

    let (conn, profile) = connect(path.to_str().unwrap()).unwrap();
    assert_eq!(profile, ConnectProfile::Verified);
    assert_eq!(list_tables(&conn).unwrap().len(), 12);
}

#[test]
fn connect_rejects_network_urls() {
    let err = connect("mysql://root@localhost:4000/test").unwrap_err();
    assert!(matches!(err, DbError::InvalidUrl(_)));
}

#[test]
fn connect_fails_when_both_attempts_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("mentor.db");

    let err = connect(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, DbError::ConnectFailed { .. }));
    assert!(!path.exists());
}

#[test]
fn connect_existing_never_creates_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.db");

    let err = connect_existing(&format!("sqlite://{}", path.display())).unwrap_err();
    assert!(matches!(err, DbError::ConnectFailed { .. }));
    assert!(!path.exists());

    {
        let mut conn = open_db(&path).unwrap();
        ensure_schema(&mut conn).unwrap();
    }
    let (_conn, profile) = connect_existing(path.to_str().unwrap()).unwrap();
    assert_eq!(profile, ConnectProfile::Verified);
}
