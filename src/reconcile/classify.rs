//! Aggregation of matcher and differ output into action buckets

use crate::error::ContactError;
use crate::models::{Action, ContactRecord, EmbeddedData, ReconciliationReport};

use super::differ::{compare, Verdict};
use super::matcher::Pairing;

/// Fill the add/update/delete buckets of `report` from a pairing
pub fn aggregate(pairing: Pairing, report: &mut ReconciliationReport) {
    report.to_add.extend(pairing.source_only);
    report.to_delete.extend(pairing.remote_only);

    for (mut source, remote) in pairing.matched {
        match compare(&source, &remote) {
            Verdict::Unchanged => {}
            Verdict::NeedsUpdate { clear_keys } => {
                source.id = remote.id;
                if !clear_keys.is_empty() {
                    let embedded = source.embedded_data.get_or_insert_with(EmbeddedData::new);
                    for key in clear_keys {
                        embedded.insert(key, String::new());
                    }
                }
                report.to_update.push(source);
            }
        }
    }
}

/// Move add candidates with an empty required field to `failed` and shape the rest for creation
pub fn filter_add_candidates(report: &mut ReconciliationReport) {
    let candidates = std::mem::take(&mut report.to_add);

    for contact in candidates {
        match contact.missing_required_field() {
            Some(field) => {
                tracing::warn!(
                    contact = %contact.external_reference,
                    field = field,
                    "Contact missing required field"
                );
                report.fail(contact, Action::Add, ContactError::MissingRequiredField(field));
            }
            None => report.to_add.push(prepare_for_create(contact)),
        }
    }
}

/// The create endpoint rejects empty embedded values
fn prepare_for_create(mut contact: ContactRecord) -> ContactRecord {
    if let Some(embedded) = contact.embedded_data.as_mut() {
        embedded.retain(|_, value| !value.is_empty());
        if embedded.is_empty() {
            contact.embedded_data = None;
        }
    }
    contact
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairing(
        matched: Vec<(ContactRecord, ContactRecord)>,
        source_only: Vec<ContactRecord>,
        remote_only: Vec<ContactRecord>,
    ) -> Pairing {
        Pairing {
            matched,
            source_only,
            remote_only,
        }
    }

    // Test 1: Mismatched pairs become updates carrying the remote id
    #[test]
    fn test_update_receives_remote_id() {
        let source = ContactRecord::new("A1", "a@x.com", "A", "One").with_embedded("dept", "CS");
        let remote = ContactRecord::new("A1", "a@x.com", "A", "One")
            .with_id("99")
            .with_embedded("dept", "MATH");

        let mut report = ReconciliationReport::default();
        aggregate(pairing(vec![(source, remote)], vec![], vec![]), &mut report);

        assert_eq!(
            report.to_update,
            vec![ContactRecord::new("A1", "a@x.com", "A", "One")
                .with_id("99")
                .with_embedded("dept", "CS")]
        );
        assert!(report.to_add.is_empty());
        assert!(report.to_delete.is_empty());
    }

    // Test 2: Stale remote keys are sent empty on update
    #[test]
    fn test_update_clears_stale_keys() {
        let source = ContactRecord::new("A1", "a@x.com", "A", "One");
        let remote = ContactRecord::new("A1", "a@x.com", "A", "One")
            .with_id("99")
            .with_embedded("minor", "Art");

        let mut report = ReconciliationReport::default();
        aggregate(pairing(vec![(source, remote)], vec![], vec![]), &mut report);

        assert_eq!(
            report.to_update[0].embedded().get("minor").map(String::as_str),
            Some("")
        );
    }

    // Test 3: Unchanged pairs land in no bucket
    #[test]
    fn test_unchanged_pairs_dropped() {
        let source = ContactRecord::new("A1", "a@x.com", "A", "One");
        let remote = source.clone().with_id("1");

        let mut report = ReconciliationReport::default();
        aggregate(pairing(vec![(source, remote)], vec![], vec![]), &mut report);

        assert_eq!(report.changes_to_make(), 0);
    }

    // Test 4: Add candidates missing a required field fail validation
    #[test]
    fn test_filter_add_candidates() {
        let mut report = ReconciliationReport {
            to_add: vec![
                ContactRecord::new("C3", "", "C", "Three"),
                ContactRecord::new("D4", "d@x.com", "D", "Four"),
            ],
            ..Default::default()
        };

        filter_add_candidates(&mut report);

        assert_eq!(report.to_add, vec![ContactRecord::new("D4", "d@x.com", "D", "Four")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].action, Action::Add);
        assert_eq!(report.failed[0].contact.external_reference, "C3");
        assert!(report.failed[0]
            .error
            .to_string()
            .starts_with("missing required field"));
    }

    // Test 5: Empty embedded values are stripped before creation
    #[test]
    fn test_prepare_for_create_strips_empty_values() {
        let mut report = ReconciliationReport {
            to_add: vec![
                ContactRecord::new("E5", "e@x.com", "E", "Five")
                    .with_embedded("dept", "")
                    .with_embedded("year", "2"),
                ContactRecord::new("F6", "f@x.com", "F", "Six").with_embedded("dept", ""),
            ],
            ..Default::default()
        };

        filter_add_candidates(&mut report);

        assert_eq!(report.to_add[0].embedded().len(), 1);
        assert_eq!(report.to_add[1].embedded_data, None);
    }
}
