//! contact-sync - Keeps remote mailing lists in line with CSV contact extracts
//!
//! Each run reads one CSV extract per mailing list, reconciles it against the
//! contacts the remote service holds, and applies the resulting adds, updates
//! and deletes with bounded concurrency and retry.

pub mod apply;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod source;
pub mod sync;
