//! Medication reconciliation findings.

use serde::{Deserialize, Serialize};

use crate::{interaction::DrugInteractionRecord, medication::Medication};

/// What the reconciler recommends doing with a medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationAction {
    Continue,
    Modify,
    Discontinue,
    Add,
    Substitute,
}

/// The kind of discrepancy between the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    Omission,
    Commission,
    Dose,
    Frequency,
    Route,
    DuplicateTherapy,
    NameVariation,
}

/// One reconciliation finding for one medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationFinding {
    pub medication: Medication,
    pub action: ReconciliationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<DiscrepancyType>,
    pub reason: String,
    /// Names of the sig fields that differ (`dose`, `frequency`, `route`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// Heuristic confidence in [0, 1].
    pub confidence: f64,
    /// Interaction warnings this medication participates in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DrugInteractionRecord>,
}

impl ReconciliationFinding {
    pub fn new(
        medication: Medication,
        action: ReconciliationAction,
        discrepancy: Option<DiscrepancyType>,
        reason: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            medication,
            action,
            discrepancy,
            reason: reason.into(),
            changed_fields: Vec::new(),
            alternatives: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            warnings: Vec::new(),
        }
    }

    /// True for findings that ask the clinician to do something.
    pub fn is_actionable(&self) -> bool {
        self.action != ReconciliationAction::Continue
    }
}
