//! Drug-drug and drug-allergy screening.
//!
//! Every unordered pair of distinct normalized names is looked up once. The
//! result goes through `merge_interactions`, which keeps the most severe
//! record per pair and sorts the output, so the list does not depend on the
//! input order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use medsafe_contracts::{
    error::MedsafeResult,
    interaction::{merge_interactions, DrugInteractionRecord, ALLERGY_PREFIX},
    medication::Medication,
    severity::InteractionSeverity,
};
use medsafe_core::traits::InteractionScreen;

use crate::{knowledge::DrugKnowledgeBase, resolver::NameResolver};

pub const KNOWLEDGE_BASE_SOURCE: &str = "knowledge-base";
pub const ALLERGY_SOURCE: &str = "allergy-screen";

#[derive(Debug, Clone)]
pub struct InteractionChecker {
    resolver: NameResolver,
}

impl InteractionChecker {
    pub fn new(kb: Arc<DrugKnowledgeBase>) -> Self {
        Self {
            resolver: NameResolver::new(kb),
        }
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Screen with the current time as the record timestamp.
    pub fn check(&self, medications: &[Medication], allergies: &[String]) -> Vec<DrugInteractionRecord> {
        self.check_at(medications, allergies, Utc::now())
    }

    pub fn check_at(
        &self,
        medications: &[Medication],
        allergies: &[String],
        at: DateTime<Utc>,
    ) -> Vec<DrugInteractionRecord> {
        let mut names: Vec<String> = medications
            .iter()
            .map(|m| self.resolver.normalize_medication(m))
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();

        let allergies: Vec<String> = allergies
            .iter()
            .map(|a| self.resolver.normalize(a))
            .filter(|a| !a.is_empty())
            .collect();

        let kb = self.resolver.knowledge_base();
        let mut records = Vec::new();

        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                if let Some(template) = kb.strongest_interaction(a, b) {
                    records.push(DrugInteractionRecord {
                        drug1: a.clone(),
                        drug2: b.clone(),
                        severity: template.severity,
                        description: template.description.clone(),
                        mechanism: template.mechanism.clone(),
                        management: template.management.clone(),
                        source: KNOWLEDGE_BASE_SOURCE.to_string(),
                        timestamp: at,
                    });
                }
            }
        }

        for drug in &names {
            for allergy in &allergies {
                if let Some(record) = self.allergy_record(drug, allergy, at) {
                    records.push(record);
                }
            }
        }

        let merged = merge_interactions(records);
        debug!(
            medications = names.len(),
            allergies = allergies.len(),
            findings = merged.len(),
            "interaction screen complete"
        );
        merged
    }

    fn allergy_record(&self, drug: &str, allergy: &str, at: DateTime<Utc>) -> Option<DrugInteractionRecord> {
        let kb = self.resolver.knowledge_base();

        let (severity, description, mechanism) = if contains_term(drug, allergy) || contains_term(allergy, drug) {
            (
                InteractionSeverity::Contraindicated,
                format!("Patient is allergic to {allergy}"),
                "Documented allergy to this substance".to_string(),
            )
        } else {
            let allergy_classes = kb.allergy_classes_of(allergy);
            let drug_classes = kb.allergy_classes_of(drug);

            if let Some(shared) = drug_classes.iter().find(|c| allergy_classes.contains(*c)) {
                (
                    InteractionSeverity::Major,
                    format!("{drug} belongs to the {shared} allergy class ({allergy} allergy)"),
                    format!("Cross-reactivity within {shared}"),
                )
            } else {
                let related = drug_classes.iter().find(|dc| {
                    allergy_classes.iter().any(|ac| {
                        kb.allergy_class(ac)
                            .is_some_and(|class| class.related.iter().any(|r| r == *dc))
                    })
                })?;
                (
                    InteractionSeverity::Moderate,
                    format!("{drug} is in {related}, which can cross-react with a {allergy} allergy"),
                    format!("Partial cross-reactivity with {related}"),
                )
            }
        };

        Some(DrugInteractionRecord {
            drug1: drug.to_string(),
            drug2: format!("{ALLERGY_PREFIX}{allergy}"),
            severity,
            description,
            mechanism,
            management: "Confirm the allergy history and choose an alternative agent".to_string(),
            source: ALLERGY_SOURCE.to_string(),
            timestamp: at,
        })
    }
}

/// True if `term` occurs in `text` as whole words: "codeine" matches
/// "codeine phosphate" but "iron" does not match "environmental".
fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    text.match_indices(term).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl InteractionScreen for InteractionChecker {
    fn screen(
        &self,
        medications: &[Medication],
        allergies: &[String],
        at: DateTime<Utc>,
    ) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        Ok(self.check_at(medications, allergies, at))
    }
}
