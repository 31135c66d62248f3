//! Source row normalization
//!
//! Turns raw CSV rows into canonical [`ContactRecord`]s. The unique id column
//! becomes `externalReference`, the required columns map onto their fields and
//! every other column lands in `embeddedData`.

use tracing::{debug, warn};

use crate::models::{ContactRecord, EmbeddedData};
use crate::source::SourceRow;

/// Required CSV columns other than the unique id. Capitalization matters.
pub const EMAIL_COLUMN: &str = "Email";
pub const FIRST_NAME_COLUMN: &str = "FirstName";
pub const LAST_NAME_COLUMN: &str = "LastName";

/// Normalized source set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub contacts: Vec<ContactRecord>,
    /// Rows dropped because their unique id was missing or empty
    pub skipped_rows: usize,
}

/// Normalize raw rows, keyed by `unique_id_column`
pub fn normalize_rows(rows: Vec<SourceRow>, unique_id_column: &str) -> Normalized {
    let mut normalized = Normalized::default();

    for (line, row) in rows.into_iter().enumerate() {
        match normalize_row(row, unique_id_column) {
            Some(contact) => normalized.contacts.push(contact),
            None => {
                debug!(row = line + 1, column = unique_id_column, "Row has no unique id");
                normalized.skipped_rows += 1;
            }
        }
    }

    if normalized.skipped_rows > 0 {
        warn!(
            skipped = normalized.skipped_rows,
            column = unique_id_column,
            "Dropped source rows without a unique id"
        );
    }

    normalized
}

fn normalize_row(row: SourceRow, unique_id_column: &str) -> Option<ContactRecord> {
    match row.get(unique_id_column) {
        Some(id) if !id.is_empty() => {}
        _ => return None,
    }

    let mut contact = ContactRecord::default();
    let mut embedded = EmbeddedData::new();

    for (column, value) in row {
        if column == unique_id_column {
            contact.external_reference = value;
            continue;
        }
        match column.as_str() {
            EMAIL_COLUMN => contact.email = value,
            FIRST_NAME_COLUMN => contact.first_name = value,
            LAST_NAME_COLUMN => contact.last_name = value,
            // The remote service truncates embedded values at the first comma
            _ => {
                embedded.insert(column, value.replace(',', ""));
            }
        }
    }

    contact.embedded_data = (!embedded.is_empty()).then_some(embedded);
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> SourceRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // Test 1: Required columns are renamed and custom columns become embedded data
    #[test]
    fn test_normalize_full_row() {
        let rows = vec![row(&[
            ("UniqueID", "A1"),
            ("Email", "a@x.com"),
            ("FirstName", "A"),
            ("LastName", "One"),
            ("Dept", "Computer Science, BS"),
        ])];

        let normalized = normalize_rows(rows, "UniqueID");

        assert_eq!(normalized.skipped_rows, 0);
        assert_eq!(
            normalized.contacts,
            vec![ContactRecord::new("A1", "a@x.com", "A", "One")
                .with_embedded("Dept", "Computer Science BS")]
        );
    }

    // Test 2: Rows without a unique id are dropped and counted
    #[test]
    fn test_rows_without_unique_id_are_skipped() {
        let rows = vec![
            row(&[("UniqueID", ""), ("Email", "x@x.com")]),
            row(&[("Email", "y@x.com")]),
            row(&[("UniqueID", "B2"), ("Email", "b@x.com")]),
        ];

        let normalized = normalize_rows(rows, "UniqueID");

        assert_eq!(normalized.skipped_rows, 2);
        assert_eq!(normalized.contacts.len(), 1);
        assert_eq!(normalized.contacts[0].external_reference, "B2");
    }

    // Test 3: No custom columns means no embedded data at all
    #[test]
    fn test_empty_embedded_data_is_absent() {
        let rows = vec![row(&[
            ("UniqueID", "C3"),
            ("Email", "c@x.com"),
            ("FirstName", "C"),
            ("LastName", "Three"),
        ])];

        let normalized = normalize_rows(rows, "UniqueID");

        assert_eq!(normalized.contacts[0].embedded_data, None);
    }

    // Test 4: Custom unique id column and case-sensitive required columns
    #[test]
    fn test_custom_unique_id_column() {
        let rows = vec![row(&[("StudentID", "S9"), ("email", "lower@x.com")])];

        let normalized = normalize_rows(rows, "StudentID");
        let contact = &normalized.contacts[0];

        assert_eq!(contact.external_reference, "S9");
        assert_eq!(contact.email, "");
        assert_eq!(
            contact.embedded().get("email").map(String::as_str),
            Some("lower@x.com")
        );
    }
}
