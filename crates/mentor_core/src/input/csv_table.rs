//! Header-keyed CSV records.
//!
//! # Invariants
//! - Header order is preserved; it becomes the column list of bulk inserts.
//! - Header names are trimmed and a leading UTF-8 BOM is dropped.
//! - Every row has exactly as many values as there are headers.

use crate::input::InputResult;
use std::io::Read;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Fully read CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl CsvTable {
    pub fn read_path(path: impl AsRef<Path>) -> InputResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(path)?;
        Self::collect(reader)
    }

    pub fn from_reader<R: Read>(input: R) -> InputResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(input);
        Self::collect(reader)
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> InputResult<Self> {
        let headers = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                if idx == 0 {
                    header.trim_start_matches(UTF8_BOM).trim().to_string()
                } else {
                    header.to_string()
                }
            })
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            headers: &self.headers,
            values,
        })
    }
}

impl<'a> Record<'a> {
    /// Returns the raw value under `column`.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let values = self.values;
        self.headers
            .iter()
            .position(|header| header == column)
            .and_then(|idx| values.get(idx))
            .map(String::as_str)
    }

    /// Values in header order with empty strings mapped to `None`.
    pub fn nullable_values(&self) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let values = self.values;
        values
            .iter()
            .map(|value| (!value.is_empty()).then_some(value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::CsvTable;

    #[test]
    fn reads_headers_in_order_and_strips_bom() {
        let input = "\u{feff}Mentor , Student\nHEMA PRIYA,PRABANJAN\n";
        let table = CsvTable::from_reader(input.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["Mentor", "Student"]);
        let record = table.records().next().unwrap();
        assert_eq!(record.get("Mentor"), Some("HEMA PRIYA"));
        assert_eq!(record.get("Student"), Some("PRABANJAN"));
        assert_eq!(record.get("Batch"), None);
    }

    #[test]
    fn nullable_values_map_empty_fields_to_none() {
        let table = CsvTable::from_reader("id,email,batch\nu1,,2026\n".as_bytes()).unwrap();
        let values = table
            .records()
            .next()
            .unwrap()
            .nullable_values()
            .collect::<Vec<_>>();
        assert_eq!(values, vec![Some("u1"), None, Some("2026")]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = CsvTable::from_reader("a,b\n1,2,3\n".as_bytes());
        assert!(err.is_err());
    }
}
