//! Natural-key matching and derived account defaults.
//!
//! # Responsibility
//! - Decide when two names denote the same person ([`NameMatching`]).
//! - Derive placeholder emails and passwords for users created by imports.
//!
//! # Invariants
//! - The database and roster backends share one matching policy. Case folding
//!   is ASCII-only so Rust comparisons agree with SQLite `upper()`.
//! - Derived emails only contain `[a-z0-9.]` before the `@`.

use crate::model::user::Role;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static LOCAL_PART_DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9.]+").expect("valid local part regex"));
static REPEATED_DOTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{2,}").expect("valid dots regex"));

const FALLBACK_LOCAL_PART: &str = "user";

/// Name comparison policy for entity resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatching {
    /// Byte-for-byte equality after trimming.
    Exact,
    /// ASCII case-insensitive equality after trimming.
    #[default]
    CaseInsensitive,
}

impl NameMatching {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "exact" => Some(Self::Exact),
            "case_insensitive" | "nocase" => Some(Self::CaseInsensitive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::CaseInsensitive => "case_insensitive",
        }
    }

    /// Compares two names under this policy.
    pub fn matches(self, left: &str, right: &str) -> bool {
        let (left, right) = (left.trim(), right.trim());
        match self {
            Self::Exact => left == right,
            Self::CaseInsensitive => left.eq_ignore_ascii_case(right),
        }
    }
}

/// How whitespace inside a name maps into the email local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStyle {
    /// `HEMA PRIYA` -> `hema.priya`
    Dotted,
    /// `HEMA PRIYA` -> `hemapriya`
    Compact,
}

/// Placeholder credentials assigned to users created by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDefaults {
    pub email_style: EmailStyle,
    pub mentor_email_domain: String,
    pub student_email_domain: String,
    pub mentor_password: String,
    pub student_password: String,
}

impl AccountDefaults {
    /// Defaults used by the database import.
    pub fn database() -> Self {
        Self {
            email_style: EmailStyle::Dotted,
            mentor_email_domain: "mentor.com".to_string(),
            student_email_domain: "student.com".to_string(),
            mentor_password: "hod123".to_string(),
            student_password: "student123".to_string(),
        }
    }

    /// Defaults used by the roster file update.
    pub fn roster() -> Self {
        Self {
            email_style: EmailStyle::Compact,
            mentor_email_domain: "edu.com".to_string(),
            student_email_domain: "edu.com".to_string(),
            mentor_password: "password123".to_string(),
            student_password: "password123".to_string(),
        }
    }

    pub fn email_for(&self, role: Role, name: &str) -> String {
        let domain = match role {
            Role::Mentor => &self.mentor_email_domain,
            Role::Student => &self.student_email_domain,
        };
        derive_email(name, self.email_style, domain)
    }

    pub fn password_for(&self, role: Role) -> &str {
        match role {
            Role::Mentor => &self.mentor_password,
            Role::Student => &self.student_password,
        }
    }
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self::database()
    }
}

/// Derives a placeholder email address from a display name.
pub fn derive_email(name: &str, style: EmailStyle, domain: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let separator = match style {
        EmailStyle::Dotted => ".",
        EmailStyle::Compact => "",
    };
    let joined = WHITESPACE_RE.replace_all(&lowered, separator);
    let stripped = LOCAL_PART_DISALLOWED_RE.replace_all(&joined, "");
    let collapsed = REPEATED_DOTS_RE.replace_all(&stripped, ".");
    let local_part = collapsed.trim_matches('.');

    let local_part = if local_part.is_empty() {
        FALLBACK_LOCAL_PART
    } else {
        local_part
    };
    format!("{local_part}@{domain}")
}

#[cfg(test)]
mod tests {
    use super::{derive_email, AccountDefaults, EmailStyle, NameMatching};
    use crate::model::user::Role;

    #[test]
    fn dotted_email_strips_symbols_and_collapses_dots() {
        assert_eq!(
            derive_email("HARINI P (B SEC)", EmailStyle::Dotted, "student.com"),
            "harini.p.b.sec@student.com"
        );
        assert_eq!(
            derive_email("  al_raafath  ", EmailStyle::Dotted, "student.com"),
            "alraafath@student.com"
        );
    }

    #[test]
    fn compact_email_removes_whitespace() {
        assert_eq!(
            derive_email("NITHYA SHRI B.", EmailStyle::Compact, "edu.com"),
            "nithyashrib@edu.com"
        );
    }

    #[test]
    fn email_falls_back_when_name_has_no_usable_characters() {
        assert_eq!(
            derive_email("(--)", EmailStyle::Dotted, "mentor.com"),
            "user@mentor.com"
        );
    }

    #[test]
    fn database_defaults_follow_role() {
        let defaults = AccountDefaults::database();
        assert_eq!(
            defaults.email_for(Role::Mentor, "HEMA PRIYA"),
            "hema.priya@mentor.com"
        );
        assert_eq!(defaults.password_for(Role::Mentor), "hod123");
        assert_eq!(defaults.password_for(Role::Student), "student123");
    }

    #[test]
    fn matching_policies_compare_trimmed_names() {
        assert!(NameMatching::Exact.matches("HEMA PRIYA ", "HEMA PRIYA"));
        assert!(!NameMatching::Exact.matches("Hema Priya", "HEMA PRIYA"));
        assert!(NameMatching::CaseInsensitive.matches("Hema Priya", "HEMA PRIYA"));
        assert_eq!(
            NameMatching::parse("case-insensitive"),
            Some(NameMatching::CaseInsensitive)
        );
        assert_eq!(NameMatching::parse("EXACT"), Some(NameMatching::Exact));
        assert_eq!(NameMatching::parse("fuzzy"), None);
    }
}
