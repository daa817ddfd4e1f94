//! Allocation update for the JSON roster file.
//!
//! # Responsibility
//! - Apply a grouped mentor -> students mapping to an in-memory roster.
//! - Keep `mentorId` on students and `allocatedStudents` on mentors in step.
//!
//! # Invariants
//! - Every mentor named in the mapping ends with exactly the students listed
//!   under it, in mapping order and without duplicates.
//! - Names match under the same [`NameMatching`] policy as the database
//!   import; new users get ids from [`new_user_id`].
//! - Only `mentorId` and `allocatedStudents` of matched users are rewritten.

use crate::input::allocation_sheet::MentorGroup;
use crate::input::roster_file::{RosterFile, RosterUser};
use crate::input::InputResult;
use crate::model::identity::{AccountDefaults, NameMatching};
use crate::model::user::{new_user_id, Role};
use chrono::{SecondsFormat, Utc};
use log::info;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterOptions {
    pub matching: NameMatching,
    pub defaults: AccountDefaults,
    /// Batch assigned to created students.
    pub batch: String,
    pub mentor_avatar: String,
    pub student_avatar: String,
    pub mentor_specialization: String,
}

impl Default for RosterOptions {
    fn default() -> Self {
        Self {
            matching: NameMatching::default(),
            defaults: AccountDefaults::roster(),
            batch: "2026".to_string(),
            mentor_avatar: "👨‍🏫".to_string(),
            student_avatar: "🎓".to_string(),
            mentor_specialization: "Full Stack & Machine Learning".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterUpdate {
    pub mentors_matched: usize,
    pub mentors_created: usize,
    pub students_updated: usize,
    pub students_created: usize,
}

/// Applies `groups` to `roster`; `created_at` stamps new users.
pub fn apply_allocations(
    roster: &mut RosterFile,
    groups: &[MentorGroup],
    options: &RosterOptions,
    created_at: &str,
) -> RosterUpdate {
    let mut update = RosterUpdate::default();

    let mut mentor_indexes = Vec::with_capacity(groups.len());
    for group in groups {
        let idx = match find_user(&roster.users, Role::Mentor, &group.mentor, options.matching) {
            Some(idx) => {
                roster.users[idx].clear_allocations();
                update.mentors_matched += 1;
                idx
            }
            None => {
                roster
                    .users
                    .push(new_mentor(&group.mentor, options, created_at));
                update.mentors_created += 1;
                roster.users.len() - 1
            }
        };
        mentor_indexes.push(idx);
    }

    for (group, &mentor_idx) in groups.iter().zip(&mentor_indexes) {
        let mentor_id = roster.users[mentor_idx].id.clone();
        for student_name in &group.students {
            let student_id =
                match find_user(&roster.users, Role::Student, student_name, options.matching) {
                    Some(idx) => {
                        roster.users[idx].set_mentor_id(&mentor_id);
                        update.students_updated += 1;
                        roster.users[idx].id.clone()
                    }
                    None => {
                        let student = new_student(student_name, &mentor_id, options, created_at);
                        let id = student.id.clone();
                        roster.users.push(student);
                        update.students_created += 1;
                        id
                    }
                };

            roster.users[mentor_idx].allocate(&student_id);
        }
    }

    update
}

/// Reads the roster at `path`, applies `groups` and writes it back.
pub fn update_roster_file(
    path: &Path,
    groups: &[MentorGroup],
    options: &RosterOptions,
) -> InputResult<RosterUpdate> {
    let mut roster = RosterFile::read_path(path)?;
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let update = apply_allocations(&mut roster, groups, options, &created_at);
    roster.write_path(path)?;

    info!(
        "event=roster_update module=roster status=ok mentors_created={} students_created={} students_updated={}",
        update.mentors_created, update.students_created, update.students_updated
    );
    Ok(update)
}

fn find_user(
    users: &[RosterUser],
    role: Role,
    name: &str,
    matching: NameMatching,
) -> Option<usize> {
    users
        .iter()
        .position(|user| user.role == role.as_str() && matching.matches(&user.name, name))
}

fn new_mentor(name: &str, options: &RosterOptions, created_at: &str) -> RosterUser {
    let role = Role::Mentor;
    let mut mentor = RosterUser::new(new_user_id(), role.as_str(), name.trim());
    mentor.set_text("email", options.defaults.email_for(role, name));
    mentor.set_text("password", options.defaults.password_for(role));
    mentor.set_text("avatar", options.mentor_avatar.as_str());
    mentor.set_text("specialization", options.mentor_specialization.as_str());
    mentor.clear_allocations();
    mentor.set_text("createdAt", created_at);
    mentor
}

fn new_student(
    name: &str,
    mentor_id: &str,
    options: &RosterOptions,
    created_at: &str,
) -> RosterUser {
    let role = Role::Student;
    let mut student = RosterUser::new(new_user_id(), role.as_str(), name.trim());
    student.set_text("email", options.defaults.email_for(role, name));
    student.set_text("password", options.defaults.password_for(role));
    student.set_text("avatar", options.student_avatar.as_str());
    student.set_mentor_id(mentor_id);
    student.set_text("batch", options.batch.as_str());
    student.set_text("createdAt", created_at);
    student
}
