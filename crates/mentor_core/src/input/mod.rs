//! Input file readers.
//!
//! # Responsibility
//! - Parse delimited files into ordered records keyed by header name.
//! - Group `Mentor,Student` sheets by mentor in first-appearance order.
//! - Read and rewrite the JSON roster file without dropping unknown fields.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod allocation_sheet;
pub mod csv_table;
pub mod roster_file;

pub type InputResult<T> = Result<T, InputError>;

#[derive(Debug)]
pub enum InputError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    MissingColumn(String),
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::MissingColumn(column) => write!(f, "missing required column `{column}`"),
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::MissingColumn(_) => None,
        }
    }
}

impl From<std::io::Error> for InputError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for InputError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for InputError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
