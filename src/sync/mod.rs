//! Sync orchestration
//!
//! # Components
//!
//! - [`retry`]: bounded retry with a fixed delay, shared by fetch and apply
//! - [`runner`]: one run over every configured mailing list
//! - [`scheduler`]: repeats runs on an interval until shutdown

pub mod retry;
pub mod runner;
pub mod scheduler;

pub use retry::{Exhausted, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use runner::SyncRunner;
pub use scheduler::{SchedulerConfig, SyncScheduler, Syncable};
