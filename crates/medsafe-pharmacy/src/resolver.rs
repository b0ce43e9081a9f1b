//! Medication name resolution.
//!
//! [`NameResolver::normalize`] folds case, whitespace, and brand names onto a
//! canonical generic; it is idempotent because no generic in the knowledge
//! base is itself a brand. [`NameResolver::match_medications`] decides whether
//! two list entries refer to the same therapy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use medsafe_contracts::medication::Medication;
use medsafe_core::traits::NameNormalizer;

use crate::knowledge::DrugKnowledgeBase;

/// Minimum similarity ratio for a fuzzy (typo) match.
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// How two names were matched, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Same normalized name.
    Exact,
    /// Different drugs in the same therapeutic class.
    Class,
    /// Same external code.
    Code,
    /// Names within typo distance.
    Fuzzy,
}

#[derive(Debug, Clone)]
pub struct NameResolver {
    kb: Arc<DrugKnowledgeBase>,
}

impl NameResolver {
    pub fn new(kb: Arc<DrugKnowledgeBase>) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &DrugKnowledgeBase {
        &self.kb
    }

    /// Lowercase, trim, collapse inner whitespace, then map brand to generic.
    pub fn normalize(&self, name: &str) -> String {
        let folded = name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match self.kb.generic_for_brand(&folded) {
            Some(generic) => generic.to_string(),
            None => folded,
        }
    }

    /// The normalized name of a list entry, falling back to its code when the
    /// name is blank.
    pub fn normalize_medication(&self, med: &Medication) -> String {
        let name = self.normalize(&med.name);
        if !name.is_empty() {
            return name;
        }
        med.code
            .as_deref()
            .and_then(|code| self.kb.generic_for_code(code))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Match two bare names (no code step).
    pub fn match_names(&self, a: &str, b: &str) -> Option<MatchKind> {
        let (a, b) = (self.normalize(a), self.normalize(b));
        self.match_normalized(&a, &b, None, None)
    }

    /// Match two list entries: Exact, then Class, then Code, then Fuzzy.
    pub fn match_medications(&self, a: &Medication, b: &Medication) -> Option<MatchKind> {
        let (na, nb) = (self.normalize_medication(a), self.normalize_medication(b));
        self.match_normalized(&na, &nb, a.code.as_deref(), b.code.as_deref())
    }

    pub fn is_same(&self, a: &Medication, b: &Medication) -> bool {
        self.match_medications(a, b).is_some()
    }

    pub(crate) fn match_normalized(
        &self,
        a: &str,
        b: &str,
        code_a: Option<&str>,
        code_b: Option<&str>,
    ) -> Option<MatchKind> {
        if !a.is_empty() && a == b {
            return Some(MatchKind::Exact);
        }
        if !a.is_empty() && !b.is_empty() && self.kb.shared_class(a, b).is_some() {
            return Some(MatchKind::Class);
        }
        if let (Some(ca), Some(cb)) = (code_a.map(str::trim), code_b.map(str::trim)) {
            if !ca.is_empty() && ca == cb {
                return Some(MatchKind::Code);
            }
        }
        if !a.is_empty() && !b.is_empty() && similarity(a, b) > FUZZY_THRESHOLD {
            return Some(MatchKind::Fuzzy);
        }
        None
    }
}

impl NameNormalizer for NameResolver {
    fn normalize(&self, name: &str) -> String {
        NameResolver::normalize(self, name)
    }

    fn normalize_medication(&self, medication: &Medication) -> String {
        NameResolver::normalize_medication(self, medication)
    }
}

/// `1 - distance / longer length`, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
