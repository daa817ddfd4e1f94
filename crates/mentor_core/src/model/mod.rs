//! Domain model for mentors, students and allocations.
//!
//! # Responsibility
//! - Define canonical records used by import, verify and roster services.
//! - Keep natural-key matching and derived defaults in one place.
//!
//! # Invariants
//! - Every user carries a stable text id generated by [`user::new_user_id`]
//!   unless loaded verbatim from input.

pub mod allocation;
pub mod identity;
pub mod user;
