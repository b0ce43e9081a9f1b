//! Medication reconciliation across a care transition.
//!
//! The current list (what the patient was taking) is compared against the
//! incoming list (what the new setting intends to give). Every current entry
//! yields exactly one finding; incoming entries yield an Add when they match
//! nothing, and duplicate-therapy findings when the incoming list repeats a
//! drug or a therapeutic class.
//!
//! Matching runs in two passes so an exact match is never stolen by a looser
//! one: first every current entry looks for an unmatched incoming entry with
//! the same normalized name, then the leftovers fall back to class, code, and
//! fuzzy matching.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use medsafe_contracts::{
    error::MedsafeResult,
    medication::Medication,
    reconciliation::{DiscrepancyType, ReconciliationAction, ReconciliationFinding},
    validation::ValidationContext,
};
use medsafe_core::{config::ReconciliationConfig, traits::MedicationReconciler};

use crate::{
    interactions::InteractionChecker,
    knowledge::DrugKnowledgeBase,
    resolver::{MatchKind, NameResolver},
};

const OMISSION_CONFIDENCE: f64 = 0.8;
const COMMISSION_CONFIDENCE: f64 = 0.9;
const EXACT_DUPLICATE_CONFIDENCE: f64 = 0.95;
const CLASS_DUPLICATE_CONFIDENCE: f64 = 0.85;

pub struct ReconciliationEngine {
    checker: InteractionChecker,
    config: ReconciliationConfig,
}

/// Per-entry duplicate status of the incoming list.
#[derive(Debug, Clone, PartialEq)]
enum Duplicate {
    None,
    /// Same drug as an earlier incoming entry.
    Exact { earlier: usize },
    /// Same therapeutic class as an earlier incoming entry.
    Class { earlier: usize, class: String },
}

impl ReconciliationEngine {
    pub fn new(kb: Arc<DrugKnowledgeBase>, config: ReconciliationConfig) -> Self {
        Self {
            checker: InteractionChecker::new(kb),
            config,
        }
    }

    fn resolver(&self) -> &NameResolver {
        self.checker.resolver()
    }

    pub fn reconcile_lists(
        &self,
        current: &[Medication],
        incoming: &[Medication],
        ctx: &ValidationContext,
    ) -> Vec<ReconciliationFinding> {
        let resolver = self.resolver();
        let current_names: Vec<String> = current.iter().map(|m| resolver.normalize_medication(m)).collect();
        let incoming_names: Vec<String> = incoming.iter().map(|m| resolver.normalize_medication(m)).collect();

        let duplicates = self.find_duplicates(&current_names, &incoming_names);
        let matches = self.match_lists(current, incoming, &current_names, &incoming_names, &duplicates);

        let mut findings = Vec::with_capacity(current.len() + incoming.len());
        let mut matched_incoming = vec![false; incoming.len()];

        for (i, cur) in current.iter().enumerate() {
            match matches[i] {
                Some((j, kind)) => {
                    matched_incoming[j] = true;
                    findings.push(compare(cur, &incoming[j], &current_names[i], &incoming_names[j], kind));
                }
                None => findings.push(ReconciliationFinding::new(
                    with_normalized(cur, &current_names[i]),
                    ReconciliationAction::Discontinue,
                    Some(DiscrepancyType::Omission),
                    "not present on the incoming list",
                    OMISSION_CONFIDENCE,
                )),
            }
        }

        for (j, inc) in incoming.iter().enumerate() {
            let name = &incoming_names[j];
            match &duplicates[j] {
                Duplicate::Exact { earlier } => findings.push(ReconciliationFinding::new(
                    with_normalized(inc, name),
                    ReconciliationAction::Discontinue,
                    Some(DiscrepancyType::DuplicateTherapy),
                    format!(
                        "duplicates incoming entry {} ({}); remove the later entry",
                        earlier + 1,
                        incoming[*earlier].name
                    ),
                    EXACT_DUPLICATE_CONFIDENCE,
                )),
                Duplicate::Class { earlier, class } => {
                    let mut finding = ReconciliationFinding::new(
                        with_normalized(inc, name),
                        ReconciliationAction::Modify,
                        Some(DiscrepancyType::DuplicateTherapy),
                        format!(
                            "same therapeutic class ({}) as {}; review for redundant therapy",
                            class, incoming_names[*earlier]
                        ),
                        CLASS_DUPLICATE_CONFIDENCE,
                    );
                    finding.alternatives.push(incoming_names[*earlier].clone());
                    findings.push(finding);
                }
                Duplicate::None if !matched_incoming[j] => findings.push(ReconciliationFinding::new(
                    with_normalized(inc, name),
                    ReconciliationAction::Add,
                    Some(DiscrepancyType::Commission),
                    "new on the incoming list",
                    COMMISSION_CONFIDENCE,
                )),
                Duplicate::None => {}
            }
        }

        if self.config.attach_interactions {
            self.attach_warnings(&mut findings, incoming, &duplicates, ctx);
        }

        findings.sort_by_key(rank);

        debug!(
            current = current.len(),
            incoming = incoming.len(),
            findings = findings.len(),
            actionable = findings.iter().filter(|f| f.is_actionable()).count(),
            "reconciliation complete"
        );
        findings
    }

    /// Flag repeated drugs and repeated classes on the incoming list.
    ///
    /// Repetition already present on the current list is carried over without
    /// a finding.
    fn find_duplicates(&self, current_names: &[String], incoming_names: &[String]) -> Vec<Duplicate> {
        let kb = self.resolver().knowledge_base();

        let mut current_counts: HashMap<&str, usize> = HashMap::new();
        for name in current_names.iter().filter(|n| !n.is_empty()) {
            *current_counts.entry(name.as_str()).or_default() += 1;
        }

        let mut duplicates = vec![Duplicate::None; incoming_names.len()];
        let mut seen: HashMap<&str, (usize, usize)> = HashMap::new();

        for (j, name) in incoming_names.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            let (first, count) = {
                let entry = seen.entry(name.as_str()).or_insert((j, 0));
                entry.1 += 1;
                *entry
            };
            let carried = current_counts.get(name.as_str()).copied().unwrap_or(0).max(1);
            if count > carried {
                duplicates[j] = Duplicate::Exact { earlier: first };
                continue;
            }

            for (k, other) in incoming_names[..j].iter().enumerate() {
                if other.is_empty() || other == name || duplicates[k] != Duplicate::None {
                    continue;
                }
                let Some(class) = kb.shared_class(other, name) else {
                    continue;
                };
                let already_current =
                    current_counts.contains_key(name.as_str()) && current_counts.contains_key(other.as_str());
                if !already_current {
                    duplicates[j] = Duplicate::Class {
                        earlier: k,
                        class: class.to_string(),
                    };
                    break;
                }
            }
        }
        duplicates
    }

    /// Best incoming match for each current entry.
    fn match_lists(
        &self,
        current: &[Medication],
        incoming: &[Medication],
        current_names: &[String],
        incoming_names: &[String],
        duplicates: &[Duplicate],
    ) -> Vec<Option<(usize, MatchKind)>> {
        let resolver = self.resolver();

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (j, name) in incoming_names.iter().enumerate() {
            if !name.is_empty() && !matches!(duplicates[j], Duplicate::Exact { .. }) {
                index.entry(name.as_str()).or_default().push(j);
            }
        }

        let mut taken = vec![false; incoming.len()];
        let mut matches: Vec<Option<(usize, MatchKind)>> = vec![None; current.len()];

        for (i, name) in current_names.iter().enumerate() {
            let hit = index
                .get(name.as_str())
                .and_then(|candidates| candidates.iter().copied().find(|&j| !taken[j]));
            if let Some(j) = hit {
                taken[j] = true;
                matches[i] = Some((j, MatchKind::Exact));
            }
        }

        for (i, cur) in current.iter().enumerate() {
            if matches[i].is_some() {
                continue;
            }
            let best = (0..incoming.len())
                .filter(|&j| !taken[j] && !matches!(duplicates[j], Duplicate::Exact { .. }))
                .filter_map(|j| {
                    resolver
                        .match_normalized(
                            &current_names[i],
                            &incoming_names[j],
                            cur.code.as_deref(),
                            incoming[j].code.as_deref(),
                        )
                        .map(|kind| (j, kind))
                })
                .min_by_key(|&(j, kind)| (kind, j));
            if let Some((j, kind)) = best {
                taken[j] = true;
                matches[i] = Some((j, kind));
            }
        }
        matches
    }

    fn attach_warnings(
        &self,
        findings: &mut [ReconciliationFinding],
        incoming: &[Medication],
        duplicates: &[Duplicate],
        ctx: &ValidationContext,
    ) {
        let screened: Vec<Medication> = incoming
            .iter()
            .zip(duplicates)
            .filter(|(_, dup)| !matches!(dup, Duplicate::Exact { .. }))
            .map(|(m, _)| m.clone())
            .collect();
        let records = self.checker.check_at(&screened, &ctx.allergies, ctx.reference_time);
        if records.is_empty() {
            return;
        }

        // Omitted drugs are not on the incoming list; a later duplicate still
        // is until someone removes it.
        for finding in findings
            .iter_mut()
            .filter(|f| f.discrepancy != Some(DiscrepancyType::Omission))
        {
            let Some(name) = finding.medication.normalized_name.as_deref() else {
                continue;
            };
            finding.warnings = records.iter().filter(|r| r.involves(name)).cloned().collect();
        }
    }
}

impl MedicationReconciler for ReconciliationEngine {
    fn reconcile(
        &self,
        current: &[Medication],
        incoming: &[Medication],
        ctx: &ValidationContext,
    ) -> MedsafeResult<Vec<ReconciliationFinding>> {
        Ok(self.reconcile_lists(current, incoming, ctx))
    }
}

fn rank(finding: &ReconciliationFinding) -> u8 {
    if finding.action == ReconciliationAction::Discontinue {
        0
    } else if !finding.warnings.is_empty() {
        1
    } else if finding.discrepancy == Some(DiscrepancyType::DuplicateTherapy) {
        2
    } else {
        3
    }
}

fn with_normalized(med: &Medication, normalized: &str) -> Medication {
    let mut med = med.clone();
    if !normalized.is_empty() {
        med.normalized_name = Some(normalized.to_string());
    }
    med
}

fn compare(
    cur: &Medication,
    inc: &Medication,
    current_name: &str,
    incoming_name: &str,
    kind: MatchKind,
) -> ReconciliationFinding {
    let mut changes: Vec<(&str, DiscrepancyType, String)> = Vec::new();

    if !cur.same_dose(inc) {
        changes.push((
            "dose",
            DiscrepancyType::Dose,
            format!("dose changed from {} to {}", describe_dose(cur), describe_dose(inc)),
        ));
    }
    if cur.parsed_frequency() != inc.parsed_frequency() {
        changes.push((
            "frequency",
            DiscrepancyType::Frequency,
            format!(
                "frequency changed from {} to {}",
                describe(cur.frequency.as_deref()),
                describe(inc.frequency.as_deref())
            ),
        ));
    }
    if cur.parsed_route() != inc.parsed_route() {
        changes.push((
            "route",
            DiscrepancyType::Route,
            format!(
                "route changed from {} to {}",
                describe(cur.route.as_deref()),
                describe(inc.route.as_deref())
            ),
        ));
    }

    let confidence = match kind {
        MatchKind::Exact => 0.95,
        MatchKind::Code => 0.9,
        MatchKind::Fuzzy => 0.75,
        MatchKind::Class => 0.7,
    };

    let mut reasons: Vec<String> = changes.iter().map(|(_, _, reason)| reason.clone()).collect();
    if kind != MatchKind::Exact {
        reasons.push(format!("'{}' matched to '{}' ({:?} match)", cur.name, inc.name, kind).to_lowercase());
    }

    let (action, discrepancy) = match changes.first() {
        Some((_, discrepancy, _)) => (ReconciliationAction::Modify, Some(*discrepancy)),
        None if kind != MatchKind::Exact => (ReconciliationAction::Continue, Some(DiscrepancyType::NameVariation)),
        None => (ReconciliationAction::Continue, None),
    };
    let reason = if reasons.is_empty() {
        "unchanged across the transition".to_string()
    } else {
        reasons.join("; ")
    };

    let mut finding = ReconciliationFinding::new(with_normalized(inc, incoming_name), action, discrepancy, reason, confidence);
    finding.changed_fields = changes.iter().map(|(field, _, _)| field.to_string()).collect();
    if kind != MatchKind::Exact && !current_name.is_empty() && current_name != incoming_name {
        finding.alternatives.push(current_name.to_string());
    }
    finding
}

fn describe(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("unspecified")
}

fn describe_dose(med: &Medication) -> String {
    match (med.dose.as_deref(), med.unit.as_deref()) {
        (Some(dose), Some(unit)) => format!("{} {}", dose.trim(), unit.trim()),
        (Some(dose), None) => dose.trim().to_string(),
        _ => "unspecified".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use medsafe_contracts::{
        medication::Medication,
        reconciliation::{DiscrepancyType, ReconciliationAction},
        severity::InteractionSeverity,
        validation::ValidationContext,
    };
    use medsafe_core::config::ReconciliationConfig;

    use super::ReconciliationEngine;
    use crate::knowledge::DrugKnowledgeBase;

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(Arc::new(DrugKnowledgeBase::standard()), ReconciliationConfig::default())
    }

    fn ctx() -> ValidationContext {
        ValidationContext::empty(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    fn home_list() -> Vec<Medication> {
        vec![
            Medication::named("Warfarin").with_dose("5", "mg").with_frequency("daily").with_route("po"),
            Medication::named("Aspirin").with_dose("81", "mg").with_frequency("daily").with_route("oral"),
            Medication::named("Clopidogrel").with_dose("75", "mg").with_frequency("once daily"),
            Medication::named("Metformin").with_dose("500", "mg").with_frequency("bid"),
        ]
    }

    #[test]
    fn identical_lists_only_continue() {
        let findings = engine().reconcile_lists(&home_list(), &home_list(), &ctx());
        assert_eq!(findings.len(), 4);
        assert!(findings.iter().all(|f| f.action == ReconciliationAction::Continue));
        assert!(findings.iter().all(|f| f.discrepancy.is_none()));
    }

    #[test]
    fn warfarin_and_coumadin_is_one_duplicate() {
        let incoming = vec![Medication::named("warfarin"), Medication::named("coumadin")];
        let findings = engine().reconcile_lists(&[], &incoming, &ctx());

        let duplicates: Vec<_> = findings
            .iter()
            .filter(|f| f.discrepancy == Some(DiscrepancyType::DuplicateTherapy))
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].confidence >= 0.9);
        assert_eq!(duplicates[0].action, ReconciliationAction::Discontinue);
        assert_eq!(duplicates[0].medication.name, "coumadin");

        let adds = findings.iter().filter(|f| f.action == ReconciliationAction::Add).count();
        assert_eq!(adds, 1);
    }

    #[test]
    fn sig_changes_are_modifications() {
        let current = vec![Medication::named("Metformin").with_dose("500", "mg").with_frequency("bid").with_route("po")];
        let incoming = vec![Medication::named("metformin")
            .with_dose("1000", "milligrams")
            .with_frequency("twice daily")
            .with_route("IV")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.action, ReconciliationAction::Modify);
        assert_eq!(f.discrepancy, Some(DiscrepancyType::Dose));
        assert_eq!(f.changed_fields, vec!["dose".to_string(), "route".to_string()]);
        assert!(f.reason.contains("500 mg"));
    }

    #[test]
    fn equivalent_sig_spellings_are_unchanged() {
        let current = vec![Medication::named("Lisinopril").with_dose("10", "mg").with_frequency("qd").with_route("po")];
        let incoming = vec![Medication::named("lisinopril").with_dose("10.0", "milligrams").with_frequency("once daily").with_route("oral")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());
        assert_eq!(findings[0].action, ReconciliationAction::Continue);
        assert!(findings[0].changed_fields.is_empty());
    }

    #[test]
    fn omissions_and_additions() {
        let current = vec![Medication::named("metformin"), Medication::named("atorvastatin")];
        let incoming = vec![Medication::named("metformin"), Medication::named("furosemide")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());

        assert_eq!(findings[0].action, ReconciliationAction::Discontinue);
        assert_eq!(findings[0].discrepancy, Some(DiscrepancyType::Omission));
        assert!((findings[0].confidence - 0.8).abs() < 1e-9);

        let add = findings.iter().find(|f| f.action == ReconciliationAction::Add).unwrap();
        assert_eq!(add.medication.name, "furosemide");
        assert!((add.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn non_exact_match_is_a_name_variation() {
        let current = vec![Medication::named("lisinoprl")];
        let incoming = vec![Medication::named("lisinopril")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].action, ReconciliationAction::Continue);
        assert_eq!(findings[0].discrepancy, Some(DiscrepancyType::NameVariation));
    }

    #[test]
    fn exact_matches_are_not_stolen_by_class_matches() {
        let current = vec![Medication::named("lisinopril"), Medication::named("enalapril")];
        let incoming = vec![Medication::named("enalapril")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());

        let discontinued: Vec<_> = findings
            .iter()
            .filter(|f| f.action == ReconciliationAction::Discontinue)
            .map(|f| f.medication.name.as_str())
            .collect();
        assert_eq!(discontinued, vec!["lisinopril"]);
    }

    #[test]
    fn new_class_duplicate_is_flagged() {
        let current = vec![Medication::named("aspirin")];
        let incoming = vec![Medication::named("aspirin"), Medication::named("Plavix")];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());

        let dup = findings
            .iter()
            .find(|f| f.discrepancy == Some(DiscrepancyType::DuplicateTherapy))
            .unwrap();
        assert_eq!(dup.action, ReconciliationAction::Modify);
        assert!((dup.confidence - 0.85).abs() < 1e-9);
        assert_eq!(dup.medication.normalized_name.as_deref(), Some("clopidogrel"));
        assert!(!findings.iter().any(|f| f.action == ReconciliationAction::Add));
    }

    #[test]
    fn interaction_warnings_are_attached_and_ordered() {
        let current = vec![Medication::named("warfarin"), Medication::named("atorvastatin")];
        let incoming = vec![
            Medication::named("metformin"),
            Medication::named("warfarin"),
            Medication::named("Advil"),
        ];
        let findings = engine().reconcile_lists(&current, &incoming, &ctx());

        assert_eq!(findings[0].action, ReconciliationAction::Discontinue);
        assert_eq!(findings[0].medication.name, "atorvastatin");

        assert!(!findings[1].warnings.is_empty());
        assert!(!findings[2].warnings.is_empty());
        assert_eq!(findings[1].warnings[0].severity, InteractionSeverity::Major);
        assert!(findings[3].warnings.is_empty());
        assert_eq!(findings[3].medication.name, "metformin");
    }

    #[test]
    fn later_duplicate_carries_the_warnings_of_its_drug() {
        let incoming = vec![
            Medication::named("warfarin"),
            Medication::named("Advil"),
            Medication::named("Coumadin"),
        ];
        let findings = engine().reconcile_lists(&[], &incoming, &ctx());

        let duplicate = findings
            .iter()
            .find(|f| f.discrepancy == Some(DiscrepancyType::DuplicateTherapy))
            .unwrap();
        assert_eq!(duplicate.action, ReconciliationAction::Discontinue);
        assert_eq!(duplicate.medication.name, "Coumadin");
        assert_eq!(duplicate.warnings.len(), 1);
        assert!(duplicate.warnings[0].involves("ibuprofen"));
    }

    #[test]
    fn warnings_can_be_switched_off() {
        let engine = ReconciliationEngine::new(
            Arc::new(DrugKnowledgeBase::standard()),
            ReconciliationConfig {
                attach_interactions: false,
            },
        );
        let incoming = vec![Medication::named("warfarin"), Medication::named("aspirin")];
        let findings = engine.reconcile_lists(&[], &incoming, &ctx());
        assert!(findings.iter().all(|f| f.warnings.is_empty()));
    }
}
