//! Mentor/student allocation model.

use crate::model::user::UserId;

/// "Mentor supervises student", keyed by both ids.
///
/// Rows accumulate: reassigning a student does not remove older rows unless
/// [`AllocationPolicy::Replace`] is selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub mentor_id: UserId,
    pub student_id: UserId,
}

/// What happens to a student's older allocation rows on reassignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Keep historical rows.
    #[default]
    Accumulate,
    /// Keep only the row for the current mentor.
    Replace,
}
