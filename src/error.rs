//! Error types for contact-sync
//!
//! Failures are split by blast radius: a [`FileError`] costs one mailing list,
//! a [`ContactError`] costs one contact, and an [`AppError`] is reserved for
//! the run as a whole. All error types use `thiserror`.

use thiserror::Error;

/// Remote API and transport errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Network timeout
    #[error("Network timeout")]
    NetworkTimeout,

    /// Connection refused
    #[error("Connection refused")]
    ConnectionRefused,

    /// Rate limited by the remote service
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unexpected HTTP status
    #[error("Status Code: {0}")]
    ServerError(u16),

    /// Invalid data received
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Unauthorized
    #[error("Unauthorized")]
    Unauthorized,

    /// Generic network error
    #[error("Network error: {0}")]
    Network(String),
}

/// Errors that abort the remaining stages of a single mailing list
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FileError {
    /// Source file could not be read
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// Source file is not valid CSV
    #[error("Failed to parse CSV: {0}")]
    Csv(String),

    /// Remote contacts could not be fetched, even after retrying
    #[error("Failed to fetch remote contacts after {attempts} attempt(s): {error}")]
    Fetch { attempts: u32, error: SyncError },

    /// Mailing list entry is unusable
    #[error("Invalid mailing list configuration: {0}")]
    Config(String),
}

/// Errors that affect exactly one contact
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContactError {
    /// Contact is not eligible for creation
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// Update or delete requested for a contact the remote never assigned an id to
    #[error("remote id undefined")]
    MissingRemoteId,

    /// Every attempt against the remote API failed
    #[error("{error} (after {attempts} attempt(s))")]
    Remote { attempts: u32, error: SyncError },
}

impl ContactError {
    /// Whether another run over the same source could succeed
    ///
    /// Validation failures repeat for identical input; remote failures may not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ContactError::MissingRequiredField(_))
    }
}

/// Report sink errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error while writing a report
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Report serialization error: {0}")]
    Serialization(String),
}

/// Notification sink errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotifyError {
    /// Delivery failed
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Run-level error type
///
/// Only configuration failures stop a run; everything else is recorded on the
/// affected list or contact.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// List-level error
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// Report error
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Notification error
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Sync error
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}
