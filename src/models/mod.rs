//! Domain models for contact-sync
//!
//! This module contains the core domain models used throughout the application.

pub mod contact;
pub mod report;
pub mod unit;

// Re-export commonly used types
pub use contact::{ContactRecord, EmbeddedData};
pub use report::{Action, ActionCounts, FailedContact, ReconciliationReport};
pub use unit::{Stage, SyncUnit};
