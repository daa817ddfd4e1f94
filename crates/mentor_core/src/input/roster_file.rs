//! JSON roster file (`{ "users": [...] }`).
//!
//! # Invariants
//! - Only `id`, `role` and `name` are typed; every other key stays a raw JSON
//!   value in `fields` and is written back unchanged unless an accessor sets it.
//! - Output uses two-space indentation.

use crate::input::InputResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const MENTOR_ID_KEY: &str = "mentorId";
pub const ALLOCATED_STUDENTS_KEY: &str = "allocatedStudents";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterFile {
    pub users: Vec<RosterUser>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One user entry. `role` stays free text because the roster also holds
/// accounts other than mentors and students.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterUser {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RosterUser {
    pub fn new(id: String, role: &str, name: &str) -> Self {
        Self {
            id,
            role: role.to_string(),
            name: name.to_string(),
            fields: Map::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String value of `key`; `None` when absent, null or not a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), Value::String(value.into()));
    }

    pub fn mentor_id(&self) -> Option<&str> {
        self.text(MENTOR_ID_KEY)
    }

    pub fn set_mentor_id(&mut self, mentor_id: &str) {
        self.set_text(MENTOR_ID_KEY, mentor_id);
    }

    /// String entries of `allocatedStudents`, empty when the key is absent.
    pub fn allocated_students(&self) -> Vec<&str> {
        match self.fields.get(ALLOCATED_STUDENTS_KEY) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn clear_allocations(&mut self) {
        self.fields
            .insert(ALLOCATED_STUDENTS_KEY.to_string(), Value::Array(Vec::new()));
    }

    /// Appends `student_id` to `allocatedStudents` unless already listed.
    /// A missing or non-array value is replaced by a fresh list.
    pub fn allocate(&mut self, student_id: &str) {
        let entry = self
            .fields
            .entry(ALLOCATED_STUDENTS_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            if !items.iter().any(|item| item.as_str() == Some(student_id)) {
                items.push(Value::String(student_id.to_string()));
            }
        }
    }
}

impl RosterFile {
    pub fn read_path(path: impl AsRef<Path>) -> InputResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> InputResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> InputResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_path(&self, path: impl AsRef<Path>) -> InputResult<()> {
        let mut text = self.to_json()?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RosterFile, RosterUser};
    use serde_json::{json, Value};

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let input = r#"{
            "users": [
                {"id": "mentor-001", "role": "mentor", "name": "HEMA PRIYA",
                 "allocatedStudents": [], "phone": "555-0100"}
            ],
            "version": 3
        }"#;

        let roster = RosterFile::from_json(input).unwrap();
        assert!(roster.users[0].allocated_students().is_empty());

        let rewritten = roster.to_json().unwrap();
        assert!(rewritten.contains("\"phone\": \"555-0100\""));
        assert!(rewritten.contains("\"version\": 3"));
        assert!(rewritten.contains("\"allocatedStudents\": []"));
        assert!(!rewritten.contains("mentorId"));
    }

    #[test]
    fn null_and_non_string_values_are_kept_verbatim() {
        let input = json!({
            "users": [
                {"id": "s1", "role": "student", "name": "ASHA",
                 "mentorId": null, "batch": 2026, "avatar": null}
            ]
        });

        let roster = RosterFile::from_json(&input.to_string()).unwrap();
        assert_eq!(roster.users[0].mentor_id(), None);

        let rewritten: Value = serde_json::from_str(&roster.to_json().unwrap()).unwrap();
        assert_eq!(rewritten, input);
    }

    #[test]
    fn allocate_skips_duplicates_and_replaces_non_arrays() {
        let mut mentor = RosterUser::new("m1".to_string(), "mentor", "HOD");
        mentor.fields.insert("allocatedStudents".to_string(), Value::Null);

        mentor.allocate("s1");
        mentor.allocate("s1");
        mentor.allocate("s2");
        assert_eq!(mentor.allocated_students(), vec!["s1", "s2"]);

        mentor.clear_allocations();
        assert!(mentor.allocated_students().is_empty());
    }
}
