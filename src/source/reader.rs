//! CSV extract reading
//!
//! Extracts routinely carry U+FEFF (zero-width no-break space) characters,
//! most often as a byte order mark in front of the first header. They are
//! stripped everywhere before parsing.

use std::path::Path;

use tracing::debug;

use super::SourceRow;
use crate::config::MailingListConfig;
use crate::error::FileError;

const ZERO_WIDTH_NO_BREAK_SPACE: char = '\u{FEFF}';

/// Read the raw bytes of a source file
pub async fn read_source_file(dir: &Path, name: &str) -> Result<Vec<u8>, FileError> {
    let path = dir.join(name);
    debug!(path = %path.display(), "Reading source file");

    tokio::fs::read(&path).await.map_err(|e| FileError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Parse CSV content with a header row into one map per record
pub fn parse_rows(content: &[u8]) -> Result<Vec<SourceRow>, FileError> {
    let text = String::from_utf8_lossy(content).replace(ZERO_WIDTH_NO_BREAK_SPACE, "");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FileError::Csv(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FileError::Csv(e.to_string()))?;
        let row: SourceRow = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Parse a mailing list configuration file with `MailingListID,csv` columns
pub fn parse_list_configs(content: &[u8]) -> Result<Vec<MailingListConfig>, FileError> {
    let text = String::from_utf8_lossy(content).replace(ZERO_WIDTH_NO_BREAK_SPACE, "");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<MailingListConfig>()
        .map(|entry| entry.map_err(|e| FileError::Config(e.to_string())))
        .collect()
}
