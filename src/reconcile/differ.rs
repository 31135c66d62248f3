//! Equality comparison for matched contact pairs

use crate::models::{ContactRecord, EmbeddedData};

/// Outcome of comparing a matched pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to do for this contact
    Unchanged,
    /// The remote contact must be updated from the source
    NeedsUpdate {
        /// Embedded keys the remote holds a value for but the source lacks;
        /// the update sends them empty so the stale value is cleared
        clear_keys: Vec<String>,
    },
}

/// One directional embedded-data pass of `left` against `right`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedPass {
    pub mismatch: bool,
    /// Keys with a non-empty value on the left and absent on the right
    pub missing_on_right: Vec<String>,
}

/// Compare a source contact with its remote counterpart
pub fn compare(source: &ContactRecord, remote: &ContactRecord) -> Verdict {
    let top_level_equal = top_level_matches(source, remote);
    let forward = embedded_pass(source.embedded(), remote.embedded());
    let backward = embedded_pass(remote.embedded(), source.embedded());

    if top_level_equal && !forward.mismatch && !backward.mismatch {
        Verdict::Unchanged
    } else {
        Verdict::NeedsUpdate {
            clear_keys: backward.missing_on_right,
        }
    }
}

/// Every non-empty source field must equal the remote field of the same name
fn top_level_matches(source: &ContactRecord, remote: &ContactRecord) -> bool {
    source
        .top_level_fields()
        .into_iter()
        .zip(remote.top_level_fields())
        .all(|((_, ours), (_, theirs))| ours.is_empty() || ours == theirs)
}

/// Check each `left` entry against `right`
///
/// A key missing on the right counts as a mismatch unless its left value is
/// already empty; a key present on both sides must carry the same value.
pub fn embedded_pass(left: &EmbeddedData, right: &EmbeddedData) -> EmbeddedPass {
    let mut pass = EmbeddedPass::default();

    for (key, value) in left {
        match right.get(key) {
            None if !value.is_empty() => {
                pass.mismatch = true;
                pass.missing_on_right.push(key.clone());
            }
            Some(other) if other != value => pass.mismatch = true,
            _ => {}
        }
    }

    pass
}
