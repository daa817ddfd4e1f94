//! `mentorctl`: console entry point for the allocation import tooling.
//!
//! # Responsibility
//! - Map subcommands onto `mentor_core` services.
//! - Print progress and summaries to stdout; errors go to stderr.
//!
//! # Invariants
//! - Connection failure after the relaxed retry exits with status 1.
//! - A missing input file or directory prints a message and exits with 0.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use mentor_core::db::schema::{bootstrap_schema, ensure_schema};
use mentor_core::db::table_columns;
use mentor_core::service::bulk_load::{migrate_directory, LoadOutcome, MigrationOutcome};
use mentor_core::service::roster_service::{update_roster_file, RosterOptions};
use mentor_core::service::verify_service::{
    render_census, render_mentor_report, render_summary, table_census, write_column_report,
    ColumnReport,
};
use mentor_core::{
    connect, connect_existing, init_logging, AllocationOutcome, AllocationPolicy,
    AllocationSheet, ConnectProfile, ImportEvent, ImportOptions, ImportService, NameMatching,
    SqliteAllocationRepository, SqliteUserRepository, StudentResolution, ToolConfig,
    VerifyService,
};
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(
    name = "mentorctl",
    version,
    about = "Load, update and verify mentor/student allocations"
)]
struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Absolute directory for rolling log files; overrides MENTOR_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error; overrides MENTOR_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// How names are matched against existing users.
    #[arg(long, global = true, value_enum)]
    name_matching: Option<MatchingArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop and recreate all allocation tables.
    Bootstrap,
    /// Rebuild the schema and bulk load a directory of CSV exports.
    Migrate {
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Import a `Mentor,Student` sheet into users and allocations.
    Import {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Drop a student's older allocation rows when reassigning it.
        #[arg(long)]
        replace_allocations: bool,
    },
    /// Print database counts and the report for one mentor.
    Verify {
        #[arg(long, default_value = "HOD")]
        mentor: String,
        /// Also list up to this many students.
        #[arg(long)]
        students: Option<u32>,
    },
    /// Print presence and row counts of every schema table.
    Census,
    /// Write the column list of one table to a report file.
    Inspect {
        #[arg(long, default_value = "aptitude_tests")]
        table: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Apply a `Mentor,Student` sheet to the JSON roster file.
    Roster {
        #[arg(long)]
        users: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        batch: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MatchingArg {
    Exact,
    CaseInsensitive,
}

impl From<MatchingArg> for NameMatching {
    fn from(value: MatchingArg) -> Self {
        match value {
            MatchingArg::Exact => NameMatching::Exact,
            MatchingArg::CaseInsensitive => NameMatching::CaseInsensitive,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match ToolConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(matching) = cli.name_matching {
        config.name_matching = matching.into();
    }

    if let Some(dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, dir) {
            eprintln!("warning: file logging disabled: {err}");
        }
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &ToolConfig) -> CliResult<()> {
    match command {
        Command::Bootstrap => {
            let mut conn = connect_database(config, true)?;
            println!("Creating tables...");
            bootstrap_schema(&mut conn)?;
            println!("All tables created successfully.");
            Ok(())
        }
        Command::Migrate { csv_dir } => {
            let dir = csv_dir.unwrap_or_else(|| config.csv_dir.clone());
            if !dir.is_dir() {
                println!("CSV directory not found: {}", dir.display());
                return Ok(());
            }
            let mut conn = connect_database(config, true)?;
            run_migrate(&mut conn, dir)
        }
        Command::Import {
            csv,
            replace_allocations,
        } => {
            let csv = csv.unwrap_or_else(|| config.mentor_csv.clone());
            if !csv.is_file() {
                println!("CSV file not found: {}", csv.display());
                return Ok(());
            }
            let mut conn = connect_database(config, true)?;
            let options = ImportOptions {
                matching: config.name_matching,
                allocation_policy: if replace_allocations {
                    AllocationPolicy::Replace
                } else {
                    AllocationPolicy::Accumulate
                },
                ..ImportOptions::default()
            };
            run_import(&mut conn, csv, options)
        }
        Command::Verify { mentor, students } => {
            let conn = connect_database(config, false)?;
            run_verify(&conn, &mentor, students, config.name_matching)
        }
        Command::Census => {
            let conn = connect_database(config, false)?;
            print!("{}", render_census(&table_census(&conn)?));
            Ok(())
        }
        Command::Inspect { table, output } => {
            let output = output.unwrap_or_else(|| config.schema_report.clone());
            let conn = connect_database(config, false)?;
            run_inspect(&conn, &table, output)
        }
        Command::Roster { users, csv, batch } => {
            let options = RosterOptions {
                matching: config.name_matching,
                batch: batch.unwrap_or_else(|| config.roster_batch.clone()),
                ..RosterOptions::default()
            };
            run_roster(
                users.unwrap_or_else(|| config.roster_json.clone()),
                csv.unwrap_or_else(|| config.mentor_csv.clone()),
                &options,
            )
        }
    }
}

/// Read-only commands pass `create_missing = false` so a wrong url never
/// leaves an empty database file behind.
fn connect_database(config: &ToolConfig, create_missing: bool) -> CliResult<Connection> {
    let url = config.require_database_url()?;
    println!("Connecting to database...");
    let connected = if create_missing {
        connect(url)
    } else {
        connect_existing(url)
    };
    match connected {
        Ok((conn, ConnectProfile::Verified)) => {
            println!("Connection successful!");
            Ok(conn)
        }
        Ok((conn, ConnectProfile::Relaxed)) => {
            println!("Connection successful (fallback)!");
            Ok(conn)
        }
        Err(err) => {
            println!("Connection failed: {err}");
            Err(err.into())
        }
    }
}

fn run_migrate(conn: &mut Connection, dir: PathBuf) -> CliResult<()> {
    info!("event=command module=cli status=start command=migrate");
    match migrate_directory(conn, &dir)? {
        MigrationOutcome::MissingDirectory(dir) => {
            println!("CSV directory not found: {}", dir.display());
        }
        MigrationOutcome::Completed(loads) => {
            println!("All tables created successfully.");
            for load in loads {
                println!("Importing {} into {}...", load.file, load.table);
                match load.outcome {
                    LoadOutcome::Imported(count) => println!("  Imported {count} records."),
                    LoadOutcome::Empty => println!("  No data to import."),
                    LoadOutcome::MissingFile => println!("Skipping {} (not found)", load.file),
                    LoadOutcome::Failed(message) => {
                        println!("  Error importing {}: {message}", load.table)
                    }
                }
            }
            println!("\nData migration completed!");
        }
    }
    Ok(())
}

fn run_import(conn: &mut Connection, csv: PathBuf, options: ImportOptions) -> CliResult<()> {
    info!("event=command module=cli status=start command=import");
    ensure_schema(conn)?;

    println!("\nReading CSV file: {}", csv.display());
    let sheet = AllocationSheet::read_path(&csv)?;
    println!("Found {} student records\n", sheet.record_count);
    if sheet.skipped_rows > 0 {
        println!("Skipped {} rows with a blank name\n", sheet.skipped_rows);
    }

    let rule = "=".repeat(60);
    let service = ImportService::new(conn, options);
    service.import_groups(&sheet.groups, |event| match event {
        ImportEvent::MentorStarted { mentor, students } => {
            println!("\n{rule}\nProcessing Mentor: {mentor}\n{rule}");
            println!("\nProcessing {students} students:");
        }
        ImportEvent::MentorResolved { mentor, resolved } => {
            if resolved.created {
                println!("Created new mentor '{mentor}' with ID: {}", resolved.id);
            } else {
                println!("Mentor '{mentor}' found with ID: {}", resolved.id);
            }
        }
        ImportEvent::StudentResolved { student, resolved } => match &resolved.resolution {
            StudentResolution::Created => {
                println!("  Created new student '{student}' with ID: {}", resolved.id)
            }
            StudentResolution::Reassigned { .. } => {
                println!("  Updated student '{student}' - assigned to new mentor")
            }
            StudentResolution::Unchanged => println!(
                "  Student '{student}' already exists and is assigned to the correct mentor"
            ),
        },
        ImportEvent::AllocationWritten { write } => {
            match write.outcome {
                AllocationOutcome::Created => println!("    Created allocation record"),
                AllocationOutcome::AlreadyExists => println!("    Allocation already exists"),
            }
            if write.removed > 0 {
                println!("    Removed {} older allocation records", write.removed);
            }
        }
    })?;

    println!("\n{rule}\nData import completed successfully!\n{rule}\n");
    let verify = VerifyService::new(
        SqliteUserRepository::new(conn),
        SqliteAllocationRepository::new(conn),
    );
    print!("{}", render_summary(&verify.summary()?));
    Ok(())
}

fn run_verify(
    conn: &Connection,
    mentor: &str,
    students: Option<u32>,
    matching: NameMatching,
) -> CliResult<()> {
    let verify = VerifyService::new(
        SqliteUserRepository::new(conn),
        SqliteAllocationRepository::new(conn),
    );

    print!("{}", render_summary(&verify.summary()?));
    println!();
    let report = verify.mentor_report(mentor, matching)?;
    print!("{}", render_mentor_report(mentor, report.as_ref()));

    if let Some(limit) = students {
        println!("\nStudents (first {limit}):");
        for student in verify.list_students(Some(limit))? {
            println!("  {} {}", student.id, student.name);
        }
    }
    Ok(())
}

fn run_inspect(conn: &Connection, table: &str, output: PathBuf) -> CliResult<()> {
    println!("Writing to {}", output.display());
    match write_column_report(conn, table, &output)? {
        ColumnReport::Written(columns) => {
            println!("File written ({} columns)", columns.len());
        }
        ColumnReport::InspectionFailed(message) => {
            println!("Error: {message}");
            println!("Columns of 'users':");
            for column in table_columns(conn, "users")? {
                println!("- {}", column.name);
            }
        }
    }
    Ok(())
}

fn run_roster(users: PathBuf, csv: PathBuf, options: &RosterOptions) -> CliResult<()> {
    if !users.is_file() {
        println!("Roster file not found: {}", users.display());
        return Ok(());
    }
    if !csv.is_file() {
        println!("CSV file not found: {}", csv.display());
        return Ok(());
    }

    let sheet = AllocationSheet::read_path(&csv)?;
    let update = update_roster_file(&users, &sheet.groups, options)?;
    println!(
        "Mentors: {} matched, {} created",
        update.mentors_matched, update.mentors_created
    );
    println!(
        "Students: {} updated, {} created",
        update.students_updated, update.students_created
    );
    println!("Successfully updated user allocations.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Command};
    use mentor_core::ToolConfig;

    fn config_for(db_path: &std::path::Path) -> ToolConfig {
        let url = db_path.display().to_string();
        ToolConfig::from_lookup(|var| (var == "DATABASE_URL").then(|| url.clone())).unwrap()
    }

    #[test]
    fn read_only_commands_do_not_create_a_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("typo.db");
        let config = config_for(&db_path);

        assert!(run(Command::Census, &config).is_err());
        let verify = Command::Verify {
            mentor: "HOD".to_string(),
            students: None,
        };
        assert!(run(verify, &config).is_err());
        assert!(!db_path.exists());
    }

    #[test]
    fn import_with_missing_sheet_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("mentor.db");
        let config = config_for(&db_path);

        let import = Command::Import {
            csv: Some(dir.path().join("missing.csv")),
            replace_allocations: false,
        };
        run(import, &config).unwrap();
        assert!(!db_path.exists());

        let migrate = Command::Migrate {
            csv_dir: Some(dir.path().join("csv_output")),
        };
        run(migrate, &config).unwrap();
        assert!(!db_path.exists());
    }
}
