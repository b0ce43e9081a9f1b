//! Drug-drug and drug-allergy interaction records.
//!
//! Records are generated per call and never persisted by the engine. Two
//! records describing the same unordered pair are merged with
//! [`merge_interactions`]; the higher-ranked severity always wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::InteractionSeverity;

/// Prefix used for the `drug2` side of an allergy finding.
pub const ALLERGY_PREFIX: &str = "allergy:";

/// One detected interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteractionRecord {
    pub drug1: String,
    /// The second drug, or `allergy:<substance>` for allergy findings.
    pub drug2: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub mechanism: String,
    pub management: String,
    /// Where the record came from: `knowledge-base`, `allergy-screen`, or an
    /// enrichment service name.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl DrugInteractionRecord {
    /// Order-independent key identifying the pair this record is about.
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.drug1, &self.drug2)
    }

    pub fn is_allergy(&self) -> bool {
        self.drug2.starts_with(ALLERGY_PREFIX)
    }

    /// True if `name` is one of the two participants.
    pub fn involves(&self, name: &str) -> bool {
        self.drug1 == name || self.drug2 == name
    }
}

/// An unordered pair of names, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

/// Deduplicate records by pair key and sort them for presentation.
///
/// For each pair the record with the highest severity is kept; on a severity
/// tie the first one seen is kept. The output is sorted by descending
/// severity, then by `drug1`, then by `drug2`, so it does not depend on the
/// order the records arrived in (except for exact severity ties between
/// different sources on the same pair).
pub fn merge_interactions(
    records: impl IntoIterator<Item = DrugInteractionRecord>,
) -> Vec<DrugInteractionRecord> {
    let mut by_pair: BTreeMap<PairKey, DrugInteractionRecord> = BTreeMap::new();
    for record in records {
        let key = record.pair_key();
        match by_pair.get(&key) {
            Some(existing) if existing.severity >= record.severity => {}
            _ => {
                by_pair.insert(key, record);
            }
        }
    }

    let mut merged: Vec<DrugInteractionRecord> = by_pair.into_values().collect();
    sort_interactions(&mut merged);
    merged
}

/// Sort by descending severity, then lexicographically by names.
pub fn sort_interactions(records: &mut [DrugInteractionRecord]) {
    records.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.drug1.cmp(&b.drug1))
            .then_with(|| a.drug2.cmp(&b.drug2))
    });
}
