//! Remote mailing list service
//!
//! - [`traits`]: the `ContactApi` trait the sync engine talks to
//! - [`qualtrics`]: HTTP implementation against the Qualtrics v3 API

pub mod qualtrics;
pub mod traits;

pub use qualtrics::QualtricsClient;
pub use traits::ContactApi;

#[cfg(test)]
pub use traits::MockContactApi;
