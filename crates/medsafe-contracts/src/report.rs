//! The merged validation report and its summary.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    interaction::{DrugInteractionRecord, PairKey},
    reconciliation::ReconciliationFinding,
    severity::{InteractionSeverity, Severity},
    validation::ValidationResult,
};

/// Field path → every result produced for it.
pub type FieldResults = BTreeMap<String, Vec<ValidationResult>>;

/// Aggregate counts and the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_issues: usize,
    pub critical_issues: usize,
    pub warnings: usize,
    pub passed: bool,
}

impl ValidationSummary {
    /// Compute the summary from the merged sections.
    ///
    /// A report passes only if no field, cross-field, or interaction result
    /// is Error or Critical. Reconciliation findings are advisory, except
    /// Contraindicated interaction warnings attached to them.
    pub fn compute(
        field_results: &FieldResults,
        cross_field_results: &[ValidationResult],
        interactions: &[DrugInteractionRecord],
        reconciliation: Option<&[ReconciliationFinding]>,
    ) -> Self {
        let issues: Vec<&ValidationResult> = field_results
            .values()
            .flatten()
            .chain(cross_field_results.iter())
            .filter(|r| r.is_issue())
            .collect();

        let mut total_issues = issues.len() + interactions.len();
        let mut critical_issues = issues
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .count();
        let mut warnings = issues
            .iter()
            .filter(|r| r.severity == Severity::Warning)
            .count();
        let mut blocking = issues.iter().any(|r| r.severity.is_blocking());

        for record in interactions {
            let mapped = record.severity.as_validation_severity();
            match mapped {
                Severity::Critical => critical_issues += 1,
                Severity::Warning => warnings += 1,
                _ => {}
            }
            blocking |= mapped.is_blocking();
        }

        if let Some(findings) = reconciliation {
            total_issues += findings.iter().filter(|f| f.is_actionable()).count();

            // Contraindications surfaced only through reconciliation still
            // fail the report; count each pair once.
            let seen: BTreeSet<PairKey> = interactions.iter().map(|r| r.pair_key()).collect();
            let surfaced: BTreeSet<PairKey> = findings
                .iter()
                .flat_map(|f| f.warnings.iter())
                .filter(|w| w.severity == InteractionSeverity::Contraindicated)
                .map(|w| w.pair_key())
                .collect();
            if !surfaced.is_empty() {
                blocking = true;
            }
            critical_issues += surfaced.difference(&seen).count();
        }

        Self {
            total_issues,
            critical_issues,
            warnings,
            passed: !blocking,
        }
    }
}

/// The complete output of one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub field_results: FieldResults,
    pub cross_field_results: Vec<ValidationResult>,
    pub interaction_findings: Vec<DrugInteractionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation_findings: Option<Vec<ReconciliationFinding>>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Every failing field and cross-field result.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationResult> {
        self.field_results
            .values()
            .flatten()
            .chain(self.cross_field_results.iter())
            .filter(|r| r.is_issue())
    }

    /// Failing results with Critical severity.
    pub fn critical_results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.issues().filter(|r| r.severity == Severity::Critical)
    }

    /// True if anything in the report warrants a critical alert.
    pub fn has_critical(&self) -> bool {
        self.summary.critical_issues > 0
    }

    /// Results recorded for one concrete field path.
    pub fn results_for(&self, field: &str) -> &[ValidationResult] {
        self.field_results
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
