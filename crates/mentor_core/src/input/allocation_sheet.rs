//! `Mentor,Student` allocation sheets.
//!
//! # Invariants
//! - Groups keep the order in which each mentor first appears.
//! - Mentor grouping uses exact trimmed names; the resolver applies the
//!   configured matching policy afterwards.
//! - Rows with a blank mentor or student are skipped and counted.

use crate::input::csv_table::CsvTable;
use crate::input::{InputError, InputResult};
use log::warn;
use std::collections::HashMap;
use std::path::Path;

pub const MENTOR_COLUMN: &str = "Mentor";
pub const STUDENT_COLUMN: &str = "Student";

/// One mentor and the students listed under it, in sheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorGroup {
    pub mentor: String,
    pub students: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationSheet {
    pub groups: Vec<MentorGroup>,
    /// Data rows read from the file, skipped ones included.
    pub record_count: usize,
    pub skipped_rows: usize,
}

impl AllocationSheet {
    pub fn read_path(path: impl AsRef<Path>) -> InputResult<Self> {
        let table = CsvTable::read_path(path)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &CsvTable) -> InputResult<Self> {
        for column in [MENTOR_COLUMN, STUDENT_COLUMN] {
            if !table.has_column(column) {
                return Err(InputError::MissingColumn(column.to_string()));
            }
        }

        let mut groups: Vec<MentorGroup> = Vec::new();
        let mut index_by_mentor: HashMap<String, usize> = HashMap::new();
        let mut skipped_rows = 0;

        for (row_idx, record) in table.records().enumerate() {
            let mentor = record.get(MENTOR_COLUMN).unwrap_or_default().trim();
            let student = record.get(STUDENT_COLUMN).unwrap_or_default().trim();
            if mentor.is_empty() || student.is_empty() {
                warn!(
                    "event=sheet_row module=input status=skipped row={} reason=blank_name",
                    row_idx + 1
                );
                skipped_rows += 1;
                continue;
            }

            let idx = *index_by_mentor
                .entry(mentor.to_string())
                .or_insert_with(|| {
                    groups.push(MentorGroup {
                        mentor: mentor.to_string(),
                        students: Vec::new(),
                    });
                    groups.len() - 1
                });
            groups[idx].students.push(student.to_string());
        }

        Ok(Self {
            groups,
            record_count: table.len(),
            skipped_rows,
        })
    }

    pub fn student_count(&self) -> usize {
        self.groups.iter().map(|group| group.students.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocationSheet, MentorGroup};
    use crate::input::csv_table::CsvTable;
    use crate::input::InputError;

    #[test]
    fn groups_by_first_appearance_and_skips_blank_rows() {
        let table = CsvTable::from_reader(
            "Mentor,Student\n\
             HEMA PRIYA,PRABANJAN\n\
             RAKSHITA,ANUSHREE\n\
             HEMA PRIYA, SANJEEV KUMAR\n\
             ,ORPHAN\n"
                .as_bytes(),
        )
        .unwrap();

        let sheet = AllocationSheet::from_table(&table).unwrap();
        assert_eq!(sheet.record_count, 4);
        assert_eq!(sheet.skipped_rows, 1);
        assert_eq!(sheet.student_count(), 3);
        assert_eq!(
            sheet.groups,
            vec![
                MentorGroup {
                    mentor: "HEMA PRIYA".to_string(),
                    students: vec!["PRABANJAN".to_string(), "SANJEEV KUMAR".to_string()],
                },
                MentorGroup {
                    mentor: "RAKSHITA".to_string(),
                    students: vec!["ANUSHREE".to_string()],
                },
            ]
        );
    }

    #[test]
    fn missing_student_column_is_reported() {
        let table = CsvTable::from_reader("Mentor,Learner\nA,B\n".as_bytes()).unwrap();
        let err = AllocationSheet::from_table(&table).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn(column) if column == "Student"));
    }
}
