//! Source side of a mailing list: the CSV extract and its content hash

pub mod hash;
pub mod reader;

use std::collections::BTreeMap;

/// One CSV record keyed by column header
pub type SourceRow = BTreeMap<String, String>;

pub use hash::HashStore;
pub use reader::{parse_list_configs, parse_rows, read_source_file};
