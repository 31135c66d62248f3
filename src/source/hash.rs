//! Content hash gate
//!
//! Keeps the SHA-256 digest of every list's last fully synced source file so
//! an unchanged extract can skip reconciliation entirely.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ReportError;

/// Persistent `{listId: sha256-hex}` map
#[derive(Debug, Default)]
pub struct HashStore {
    path: PathBuf,
    committed: BTreeMap<String, String>,
    pending: HashMap<String, String>,
}

impl HashStore {
    /// Load the store from `path`; a missing or unreadable file yields an empty store
    pub async fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let committed = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Hash file is not valid JSON, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read hash file, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            committed,
            pending: HashMap::new(),
        }
    }

    /// Hex SHA-256 digest of `content`
    pub fn digest(content: &[u8]) -> String {
        format!("{:x}", Sha256::digest(content))
    }

    /// Whether `content` matches the digest stored for `list_id`
    ///
    /// The fresh digest is remembered and only persisted by [`HashStore::commit`].
    pub fn check_unchanged(&mut self, list_id: &str, content: &[u8]) -> bool {
        let digest = Self::digest(content);
        let unchanged = self.committed.get(list_id) == Some(&digest);
        debug!(list_id = list_id, unchanged = unchanged, "Checked source hash");

        self.pending.insert(list_id.to_string(), digest);
        unchanged
    }

    /// Promote the pending digest of `list_id`
    pub fn commit(&mut self, list_id: &str) {
        if let Some(digest) = self.pending.remove(list_id) {
            self.committed.insert(list_id.to_string(), digest);
        }
    }

    pub fn get(&self, list_id: &str) -> Option<&str> {
        self.committed.get(list_id).map(String::as_str)
    }

    /// Write the committed digests back to disk
    pub async fn save(&self) -> Result<(), ReportError> {
        let json = serde_json::to_vec_pretty(&self.committed)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
