//! Core logic for the mentor allocation import tooling.
//!
//! Loads mentor/student sheets and CSV exports into the allocation schema,
//! keeps the JSON roster in step, and verifies the results.

pub mod config;
pub mod db;
pub mod input;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ToolConfig};
pub use db::{
    connect, connect_existing, open_db, open_db_in_memory, ConnectProfile, DbError, DbResult,
};
pub use input::allocation_sheet::{AllocationSheet, MentorGroup};
pub use input::{InputError, InputResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::allocation::{Allocation, AllocationPolicy};
pub use model::identity::{AccountDefaults, NameMatching};
pub use model::user::{Role, User, UserId};
pub use repo::allocation_repo::{
    AllocationOutcome, AllocationRepository, SqliteAllocationRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::import_service::{
    ImportError, ImportEvent, ImportOptions, ImportReport, ImportResult, ImportService,
    StudentResolution,
};
pub use service::verify_service::VerifyService;
