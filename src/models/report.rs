//! Reconciliation report model
//!
//! The report is the single record of what a mailing list needs and what
//! actually happened to it during apply.

use serde::Serialize;
use std::fmt;

use super::contact::ContactRecord;
use crate::error::{ContactError, FileError};

/// Action group applied to the remote list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    Add,
    Update,
    Delete,
}

impl Action {
    /// Groups in the order they are applied
    pub const ALL: [Action; 3] = [Action::Add, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "Add",
            Action::Update => "Update",
            Action::Delete => "Delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact that could not be brought in line with the source
#[derive(Debug, Clone, PartialEq)]
pub struct FailedContact {
    pub contact: ContactRecord,
    pub action: Action,
    pub error: ContactError,
}

/// Successful remote operations per action group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ActionCounts {
    pub fn get(&self, action: Action) -> usize {
        match action {
            Action::Add => self.added,
            Action::Update => self.updated,
            Action::Delete => self.deleted,
        }
    }

    pub fn increment(&mut self, action: Action) {
        match action {
            Action::Add => self.added += 1,
            Action::Update => self.updated += 1,
            Action::Delete => self.deleted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Per-list outcome of reconciliation and apply
///
/// A contact sits in at most one of `to_add`, `to_update`, `to_delete` and
/// `failed`. Contacts that were matched and found identical appear nowhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub to_add: Vec<ContactRecord>,
    pub to_update: Vec<ContactRecord>,
    pub to_delete: Vec<ContactRecord>,
    pub failed: Vec<FailedContact>,
    /// Set when the list could not be processed; no partition exists then
    pub file_error: Option<FileError>,
    /// Set by the hash gate when the source is unchanged since the last run
    pub matching_hash: bool,
    /// Source rows dropped for lacking a unique id
    pub skipped_rows: usize,
    /// Successful remote calls per action group
    pub completed: ActionCounts,
}

impl ReconciliationReport {
    pub fn bucket(&self, action: Action) -> &Vec<ContactRecord> {
        match action {
            Action::Add => &self.to_add,
            Action::Update => &self.to_update,
            Action::Delete => &self.to_delete,
        }
    }

    pub fn bucket_mut(&mut self, action: Action) -> &mut Vec<ContactRecord> {
        match action {
            Action::Add => &mut self.to_add,
            Action::Update => &mut self.to_update,
            Action::Delete => &mut self.to_delete,
        }
    }

    /// Record a contact failure; the caller has already taken it out of its bucket
    pub fn fail(&mut self, contact: ContactRecord, action: Action, error: ContactError) {
        self.failed.push(FailedContact {
            contact,
            action,
            error,
        });
    }

    /// Number of failures for one action group
    pub fn failed_count(&self, action: Action) -> usize {
        self.failed.iter().filter(|f| f.action == action).count()
    }

    /// Changes still standing in the three action buckets
    pub fn changes_to_make(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Whether this list should trigger the failure notification
    pub fn has_errors(&self) -> bool {
        self.file_error.is_some() || !self.failed.is_empty()
    }

    /// Whether the same source must be reconciled again next run
    ///
    /// False when the only failures are validation failures, which an
    /// unchanged source would reproduce.
    pub fn needs_rerun(&self) -> bool {
        self.file_error.is_some() || self.failed.iter().any(|f| f.error.is_transient())
    }
}
