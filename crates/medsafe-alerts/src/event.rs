//! Alert payloads and chain entries.
//!
//! `CriticalAlert` is the clinically relevant extract of one report.
//! `AlertEvent` wraps it with a sequence number and the hashes that link it
//! to the rest of the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medsafe_contracts::{
    interaction::DrugInteractionRecord,
    report::{ValidationReport, ValidationSummary},
    severity::InteractionSeverity,
    validation::ValidationResult,
};

/// What a clinician is paged about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalAlert {
    pub run_id: Uuid,
    pub raised_at: DateTime<Utc>,
    /// Critical field and cross-field results.
    pub critical_results: Vec<ValidationResult>,
    /// Contraindicated interactions, from screening or reconciliation.
    pub contraindications: Vec<DrugInteractionRecord>,
    pub summary: ValidationSummary,
}

impl CriticalAlert {
    pub fn from_report(report: &ValidationReport) -> Self {
        let mut contraindications: Vec<DrugInteractionRecord> = report
            .interaction_findings
            .iter()
            .filter(|r| r.severity == InteractionSeverity::Contraindicated)
            .cloned()
            .collect();

        for finding in report.reconciliation_findings.iter().flatten() {
            for warning in &finding.warnings {
                let known = contraindications.iter().any(|c| c.pair_key() == warning.pair_key());
                if warning.severity == InteractionSeverity::Contraindicated && !known {
                    contraindications.push(warning.clone());
                }
            }
        }

        Self {
            run_id: report.run_id,
            raised_at: report.generated_at,
            critical_results: report.critical_results().cloned().collect(),
            contraindications,
            summary: report.summary,
        }
    }

    /// Number of distinct critical items carried by the alert.
    pub fn item_count(&self) -> usize {
        self.critical_results.len() + self.contraindications.len()
    }
}

/// One link in the alert hash chain.
///
/// Editing any field, including the embedded alert, invalidates `this_hash`
/// and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    pub dispatcher_id: String,
    pub alert: CriticalAlert,
    pub prev_hash: String,
    pub this_hash: String,
}

impl AlertEvent {
    /// `prev_hash` of the first event.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of the whole log, as returned by `export_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLog {
    pub dispatcher_id: String,
    pub events: Vec<AlertEvent>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last event; empty for an empty log.
    pub terminal_hash: String,
}
