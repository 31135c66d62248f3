//! Pairing of source and remote contacts by `externalReference`
//!
//! Both sides are sorted ascending by key. Each source contact is looked up in
//! the remote set with a binary search; matched remote entries are marked as
//! consumed instead of being removed, so the remote set itself stays intact.

use std::cmp::Ordering;

use crate::models::ContactRecord;

/// Result of pairing a source set with a remote set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairing {
    /// `(source, remote)` pairs sharing a key
    pub matched: Vec<(ContactRecord, ContactRecord)>,
    /// Source contacts with no remote counterpart
    pub source_only: Vec<ContactRecord>,
    /// Remote contacts never claimed by a source contact
    pub remote_only: Vec<ContactRecord>,
}

/// Ordering used for sorting and searching: exact, case-sensitive byte order
pub fn by_reference(a: &ContactRecord, b: &ContactRecord) -> Ordering {
    a.external_reference.cmp(&b.external_reference)
}

/// Sort contacts ascending by `externalReference`
pub fn sort_by_reference(contacts: &mut [ContactRecord]) {
    contacts.sort_by(by_reference);
}

/// Pair `source` with `remote`; `remote` must already be sorted by key
pub fn match_contacts(source: &[ContactRecord], remote: &[ContactRecord]) -> Pairing {
    debug_assert!(
        remote.windows(2).all(|w| by_reference(&w[0], &w[1]) != Ordering::Greater),
        "remote contacts must be sorted by externalReference"
    );

    let mut consumed = vec![false; remote.len()];
    let mut pairing = Pairing::default();

    for contact in source {
        match find_unconsumed(remote, &consumed, &contact.external_reference) {
            Some(index) => {
                consumed[index] = true;
                pairing
                    .matched
                    .push((contact.clone(), remote[index].clone()));
            }
            None => pairing.source_only.push(contact.clone()),
        }
    }

    pairing.remote_only = remote
        .iter()
        .zip(&consumed)
        .filter(|(_, taken)| !**taken)
        .map(|(contact, _)| contact.clone())
        .collect();

    pairing
}

/// First remote entry with `key` that has not been claimed yet
fn find_unconsumed(remote: &[ContactRecord], consumed: &[bool], key: &str) -> Option<usize> {
    let start = remote.partition_point(|r| r.external_reference.as_str() < key);
    (start..remote.len())
        .take_while(|&i| remote[i].external_reference == key)
        .find(|&i| !consumed[i])
}
