//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into import, migration, verification and
//!   roster use-cases.
//! - Keep console rendering out of core: services return reports and events,
//!   callers decide how to print them.

pub mod bulk_load;
pub mod import_service;
pub mod roster_service;
pub mod verify_service;
