//! Remote contact API trait definition

use async_trait::async_trait;

use crate::error::SyncError;
use crate::models::ContactRecord;

/// Read and mutate the contacts of a remote mailing list
///
/// Each call is a single request as far as the caller is concerned; retrying
/// is left to the caller. Implementations must be shareable across the
/// concurrent operations of one action group.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactApi: Send + Sync {
    /// Every contact currently on the list
    async fn fetch_all(&self, list_id: &str) -> Result<Vec<ContactRecord>, SyncError>;

    /// Create `contact` on the list
    async fn create(&self, list_id: &str, contact: &ContactRecord) -> Result<(), SyncError>;

    /// Overwrite the remote contact `id` with `contact`
    async fn update(
        &self,
        list_id: &str,
        id: &str,
        contact: &ContactRecord,
    ) -> Result<(), SyncError>;

    /// Remove the remote contact `id`
    async fn delete(&self, list_id: &str, id: &str) -> Result<(), SyncError>;
}
