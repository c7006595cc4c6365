//! Internal domain models and merge rules for album credits.
//!
//! These types are OUR types - they don't change when the external model
//! API changes. The loosely-typed structured response is validated and
//! converted at the client boundary, so the merge logic has exactly one
//! input shape: the same typed credits used by manual edits.
//!
//! # Merge rules
//!
//! Enrichment is additive (merge/append only):
//! - Producer is only set when the field is currently null.
//! - Musicians are appended only when the musician name is not already on
//!   the album. Dedup is by name only (not instrument) so one musician
//!   does not appear twice.
//! - Personnel are appended only for new (name, role) pairs.
//! - Other details are appended only for new (value, type) pairs.
//!
//! All comparisons are case-insensitive.

use std::collections::HashSet;

use crate::model::{DetailEntry, MusicianCredit, StaffCredit};

/// Credits returned by the external model for one album.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumFacts {
    pub producer: Option<String>,
    pub musicians: Vec<MusicianCredit>,
    pub personnel: Vec<StaffCredit>,
    pub other_details: Vec<DetailEntry>,
}

impl AlbumFacts {
    /// True when the model returned nothing usable.
    pub fn is_empty(&self) -> bool {
        self.producer.is_none()
            && self.musicians.is_empty()
            && self.personnel.is_empty()
            && self.other_details.is_empty()
    }
}

/// Errors that can occur during enrichment
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    #[error("No API key configured for enrichment")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,
}

/// Append musicians from `incoming` whose name is not already present.
///
/// Deduplication is by name only (case-insensitive) so the same person
/// never appears twice on an album regardless of instrument differences.
pub fn merge_musicians(
    existing: &[MusicianCredit],
    incoming: &[MusicianCredit],
) -> Vec<MusicianCredit> {
    let mut seen: HashSet<String> = existing.iter().map(|m| m.name.to_lowercase()).collect();
    let mut merged = existing.to_vec();
    for credit in incoming {
        if seen.insert(credit.name.to_lowercase()) {
            merged.push(credit.clone());
        }
    }
    merged
}

/// Append personnel from `incoming` whose (name, role) pair is not
/// already present.
pub fn merge_personnel(existing: &[StaffCredit], incoming: &[StaffCredit]) -> Vec<StaffCredit> {
    let mut seen: HashSet<(String, String)> = existing
        .iter()
        .map(|p| (p.name.to_lowercase(), p.role.to_lowercase()))
        .collect();
    let mut merged = existing.to_vec();
    for credit in incoming {
        if seen.insert((credit.name.to_lowercase(), credit.role.to_lowercase())) {
            merged.push(credit.clone());
        }
    }
    merged
}

/// Append details from `incoming` whose (value, type) pair is not
/// already present.
pub fn merge_details(existing: &[DetailEntry], incoming: &[DetailEntry]) -> Vec<DetailEntry> {
    let mut seen: HashSet<(String, String)> = existing
        .iter()
        .map(|d| (d.value.to_lowercase(), d.detail_type.to_lowercase()))
        .collect();
    let mut merged = existing.to_vec();
    for entry in incoming {
        if seen.insert((entry.value.to_lowercase(), entry.detail_type.to_lowercase())) {
            merged.push(entry.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn musician(name: &str, instrument: &str) -> MusicianCredit {
        MusicianCredit {
            name: name.to_string(),
            instrument: instrument.to_string(),
        }
    }

    fn staff(name: &str, role: &str) -> StaffCredit {
        StaffCredit {
            name: name.to_string(),
            role: role.to_string(),
        }
    }

    fn detail(value: &str, detail_type: &str) -> DetailEntry {
        DetailEntry {
            value: value.to_string(),
            detail_type: detail_type.to_string(),
        }
    }

    #[test]
    fn test_merge_musicians_dedups_by_name_only() {
        let existing = vec![musician("John Bonham", "Drums")];
        let incoming = vec![
            // Same person, different instrument and case - suppressed
            musician("JOHN BONHAM", "Percussion"),
            musician("Jimmy Page", "Guitar"),
        ];

        let merged = merge_musicians(&existing, &incoming);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "John Bonham");
        assert_eq!(merged[1].name, "Jimmy Page");
    }

    #[test]
    fn test_merge_personnel_keyed_by_name_and_role() {
        let existing = vec![staff("Andy Johns", "Engineer")];
        let incoming = vec![
            staff("andy johns", "engineer"),     // duplicate pair - suppressed
            staff("Andy Johns", "Mix Engineer"), // same name, new role - kept
        ];

        let merged = merge_personnel(&existing, &incoming);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].role, "Mix Engineer");
    }

    #[test]
    fn test_merge_details_keyed_by_value_and_type() {
        let existing = vec![detail("Abbey Road Studios", "Recording Studio")];
        let incoming = vec![
            detail("abbey road studios", "recording studio"),
            detail("Abbey Road Studios", "Mastering Studio"),
            detail("Sterling Sound", "Mastering Studio"),
        ];

        let merged = merge_details(&existing, &incoming);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_preserves_existing_order_and_appends() {
        let existing = vec![musician("A", "Guitar"), musician("B", "Bass")];
        let incoming = vec![musician("C", "Drums")];

        let merged = merge_musicians(&existing, &incoming);
        assert_eq!(merged[0].name, "A");
        assert_eq!(merged[1].name, "B");
        assert_eq!(merged[2].name, "C");
    }

    #[test]
    fn test_merge_dedups_within_incoming() {
        let incoming = vec![musician("A", "Guitar"), musician("a", "Bass")];
        let merged = merge_musicians(&[], &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].instrument, "Guitar");
    }

    #[test]
    fn test_empty_facts() {
        assert!(AlbumFacts::default().is_empty());
        let facts = AlbumFacts {
            producer: Some("Jimmy Page".to_string()),
            ..Default::default()
        };
        assert!(!facts.is_empty());
    }

    fn arb_musicians() -> impl Strategy<Value = Vec<MusicianCredit>> {
        proptest::collection::vec(
            ("[A-Za-z]{1,8}", "[A-Za-z]{1,8}").prop_map(|(name, instrument)| MusicianCredit {
                name,
                instrument,
            }),
            0..8,
        )
    }

    proptest! {
        /// Merging the same incoming set twice adds nothing the second time.
        #[test]
        fn prop_merge_is_idempotent(existing in arb_musicians(), incoming in arb_musicians()) {
            let once = merge_musicians(&existing, &incoming);
            let twice = merge_musicians(&once, &incoming);
            prop_assert_eq!(once, twice);
        }

        /// Merge never removes or reorders existing credits.
        #[test]
        fn prop_merge_preserves_existing_prefix(existing in arb_musicians(), incoming in arb_musicians()) {
            let merged = merge_musicians(&existing, &incoming);
            prop_assert!(merged.len() >= existing.len());
            prop_assert_eq!(&merged[..existing.len()], &existing[..]);
        }

        /// No two entries in the result share a case-folded name.
        #[test]
        fn prop_merge_result_has_unique_names(incoming in arb_musicians()) {
            let merged = merge_musicians(&[], &incoming);
            let names: std::collections::HashSet<String> =
                merged.iter().map(|m| m.name.to_lowercase()).collect();
            prop_assert_eq!(names.len(), merged.len());
        }
    }
}
