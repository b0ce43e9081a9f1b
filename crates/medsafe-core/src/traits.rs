//! Trait definitions for the MEDSAFE pipeline.
//!
//! Two families of traits live here:
//!
//! - **Stages**: `FieldValidator`, `ConsistencyValidator`,
//!   `InteractionScreen`, `MedicationReconciler`. Pure computations over the
//!   payload and the read-only knowledge base. They return `Err` only for
//!   infrastructure faults; bad data becomes results.
//! - **Collaborators**: `TerminologyService`, `InteractionEnrichmentService`,
//!   `AlertDispatcher`, `CacheService`. External systems that may block or
//!   fail. The orchestrator bounds every call with a timeout and never treats
//!   a failure as a pass.
//!
//! `NameNormalizer` and `CodeSystemValidator` are small pure seams shared
//! between stages.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use medsafe_contracts::{
    error::MedsafeResult,
    interaction::DrugInteractionRecord,
    medication::Medication,
    payload::PatientPayload,
    reconciliation::ReconciliationFinding,
    report::{FieldResults, ValidationReport},
    validation::{ValidationContext, ValidationResult},
};

/// Outcome of checking one code against one code system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeVerification {
    pub is_valid: bool,
    /// False when the validator does not know the code system at all.
    #[serde(default = "default_true")]
    pub recognized_system: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl CodeVerification {
    pub fn valid() -> Self {
        Self { is_valid: true, recognized_system: true, issues: Vec::new() }
    }

    pub fn invalid(issue: impl Into<String>) -> Self {
        Self { is_valid: false, recognized_system: true, issues: vec![issue.into()] }
    }

    pub fn unrecognized(system: &str) -> Self {
        Self {
            is_valid: false,
            recognized_system: false,
            issues: vec![format!("code system '{system}' is not recognized")],
        }
    }
}

// ── Pure seams ────────────────────────────────────────────────────────────────

/// Maps a medication name onto its canonical generic identifier.
///
/// Implementations must be idempotent: `normalize(normalize(x)) == normalize(x)`.
pub trait NameNormalizer: Send + Sync {
    fn normalize(&self, name: &str) -> String;

    /// Normalized identifier of a list entry. Implementations that know
    /// external codes fall back to the code when the name is blank.
    fn normalize_medication(&self, medication: &Medication) -> String {
        self.normalize(&medication.name)
    }
}

/// Checks the syntactic shape of a code within a named code system.
///
/// Used by the `Code` field rule. Must be pure; external lookups belong in
/// `TerminologyService`.
pub trait CodeSystemValidator: Send + Sync {
    fn validate(&self, code: &str, system: &str) -> CodeVerification;
}

// ── Stages ────────────────────────────────────────────────────────────────────

/// Atomic per-field rule evaluation over the raw JSON payload.
pub trait FieldValidator: Send + Sync {
    fn validate_fields(&self, payload: &Value, ctx: &ValidationContext) -> MedsafeResult<FieldResults>;
}

/// Multi-field consistency checks over the typed payload.
pub trait ConsistencyValidator: Send + Sync {
    fn validate(
        &self,
        payload: &PatientPayload,
        ctx: &ValidationContext,
    ) -> MedsafeResult<Vec<ValidationResult>>;
}

/// Pairwise drug-drug and drug-allergy screening.
pub trait InteractionScreen: Send + Sync {
    /// Return deduplicated, sorted records. `at` stamps every record.
    fn screen(
        &self,
        medications: &[Medication],
        allergies: &[String],
        at: DateTime<Utc>,
    ) -> MedsafeResult<Vec<DrugInteractionRecord>>;
}

/// Compares two medication lists across a care transition.
pub trait MedicationReconciler: Send + Sync {
    fn reconcile(
        &self,
        current: &[Medication],
        incoming: &[Medication],
        ctx: &ValidationContext,
    ) -> MedsafeResult<Vec<ReconciliationFinding>>;
}

// ── Collaborators ─────────────────────────────────────────────────────────────

/// External terminology service (ICD-10, SNOMED CT, LOINC, RxNorm lookups).
pub trait TerminologyService: Send + Sync {
    fn validate_code(&self, code: &str, system: &str) -> MedsafeResult<CodeVerification>;
}

/// External interaction data source. Augments the built-in knowledge base;
/// it can add or escalate findings but never remove them.
pub trait InteractionEnrichmentService: Send + Sync {
    /// Name recorded as the `source` of records this service contributes.
    fn name(&self) -> &str;

    fn lookup(&self, drug_a: &str, drug_b: &str) -> MedsafeResult<Vec<DrugInteractionRecord>>;
}

/// Receives reports containing critical findings. Fire-and-forget: a
/// failure here is logged and never changes the validation outcome.
pub trait AlertDispatcher: Send + Sync {
    fn notify_critical(&self, report: &ValidationReport) -> MedsafeResult<()>;
}

/// Key-value cache used only on the enrichment path.
pub trait CacheService: Send + Sync {
    fn get(&self, key: &str) -> MedsafeResult<Option<Value>>;

    fn set(&self, key: &str, value: Value, ttl: Duration) -> MedsafeResult<()>;
}
