use mentor_core::db::schema::bootstrap_schema;
use mentor_core::service::bulk_load::{
    load_table, migrate_directory, LoadOutcome, MigrationOutcome, MIGRATION_PLAN,
};
use mentor_core::{
    open_db_in_memory, NameMatching, SqliteAllocationRepository, SqliteUserRepository,
    VerifyService,
};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

fn write_csv(dir: &Path, file: &str, text: &str) {
    fs::write(dir.join(file), text).unwrap();
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn empty_fields_are_loaded_as_null() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        dir.path(),
        "users.csv",
        "id,email,role,name,mentor_id\nm1,hod@mentor.com,mentor,HOD,\ns1,,student,ASHA,m1\n",
    );
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    let outcome = load_table(&conn, &dir.path().join("users.csv"), "users");
    assert_eq!(outcome, LoadOutcome::Imported(2));

    let null_mentor: bool = conn
        .query_row(
            "SELECT mentor_id IS NULL FROM users WHERE id = 'm1';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let null_email: bool = conn
        .query_row(
            "SELECT email IS NULL FROM users WHERE id = 's1';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(null_mentor);
    assert!(null_email);
}

#[test]
fn header_only_file_is_empty_and_missing_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "tasks.csv", "id,title\n");
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    assert_eq!(
        load_table(&conn, &dir.path().join("tasks.csv"), "tasks"),
        LoadOutcome::Empty
    );
    assert_eq!(
        load_table(&conn, &dir.path().join("problems.csv"), "problems"),
        LoadOutcome::MissingFile
    );
}

#[test]
fn unsafe_header_is_rejected_before_any_insert() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        dir.path(),
        "users.csv",
        "id,\"name); DROP TABLE users; --\"\nm1,HOD\n",
    );
    let mut conn = open_db_in_memory().unwrap();
    bootstrap_schema(&mut conn).unwrap();

    let outcome = load_table(&conn, &dir.path().join("users.csv"), "users");
    assert!(matches!(outcome, LoadOutcome::Failed(_)));
    assert_eq!(count(&conn, "users"), 0);
}

#[test]
fn failing_table_rolls_back_and_migration_continues() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        dir.path(),
        "users.csv",
        "id,role,name\nm1,mentor,HOD\ns1,student,ASHA\n",
    );
    // Second row references an unknown student.
    write_csv(
        dir.path(),
        "mentor_student_allocations.csv",
        "mentor_id,student_id\nm1,s1\nm1,ghost\n",
    );
    write_csv(
        dir.path(),
        "tasks.csv",
        "id,mentor_id,title,difficulty\nt1,m1,Arrays,easy\n",
    );

    let mut conn = open_db_in_memory().unwrap();
    let outcome = migrate_directory(&mut conn, dir.path()).unwrap();
    let MigrationOutcome::Completed(loads) = outcome else {
        panic!("expected completed migration");
    };
    assert_eq!(loads.len(), MIGRATION_PLAN.len());

    let by_table = |table: &str| {
        loads
            .iter()
            .find(|load| load.table == table)
            .map(|load| load.outcome.clone())
            .unwrap()
    };
    assert_eq!(by_table("users"), LoadOutcome::Imported(2));
    assert!(matches!(
        by_table("mentor_student_allocations"),
        LoadOutcome::Failed(_)
    ));
    assert_eq!(by_table("tasks"), LoadOutcome::Imported(1));
    assert_eq!(by_table("submissions"), LoadOutcome::MissingFile);

    assert_eq!(count(&conn, "users"), 2);
    assert_eq!(count(&conn, "mentor_student_allocations"), 0);
    assert_eq!(count(&conn, "tasks"), 1);
}

#[test]
fn migration_replaces_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "users.csv", "id,role,name\nm1,mentor,HOD\n");

    let mut conn = open_db_in_memory().unwrap();
    migrate_directory(&mut conn, dir.path()).unwrap();
    migrate_directory(&mut conn, dir.path()).unwrap();

    assert_eq!(count(&conn, "users"), 1);
}

#[test]
fn missing_directory_leaves_database_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("csv_output");

    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE keep_me (id INTEGER);")
        .unwrap();

    let outcome = migrate_directory(&mut conn, &missing).unwrap();
    assert_eq!(outcome, MigrationOutcome::MissingDirectory(missing));

    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn numeric_timestamps_from_csv_are_readable_by_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        dir.path(),
        "users.csv",
        "id,role,name,mentor_id,created_at\n\
         m1,mentor,HOD,,1706958000\n\
         s1,student,ASHA,m1,1706958000.5\n",
    );

    let mut conn = open_db_in_memory().unwrap();
    migrate_directory(&mut conn, dir.path()).unwrap();

    let verify = VerifyService::new(
        SqliteUserRepository::new(&conn),
        SqliteAllocationRepository::new(&conn),
    );
    let students = verify.list_students(None).unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].created_at.as_deref(), Some("1706958000.5"));

    let report = verify
        .mentor_report("HOD", NameMatching::Exact)
        .unwrap()
        .unwrap();
    assert_eq!(report.mentor.created_at.as_deref(), Some("1706958000"));
    assert_eq!(report.student_count, 1);
}
