//! Validation result and context types.
//!
//! `ValidationResult` is the unit every field rule and cross-field check
//! produces. `ValidationContext` is the read-only patient snapshot those
//! rules are evaluated against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{payload::PatientPayload, severity::Severity};

/// The broad family a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Required,
    Format,
    Range,
    Consistency,
    Completeness,
    Temporal,
    Clinical,
    Regulatory,
    Demographic,
    Safety,
    Cultural,
}

/// The outcome of evaluating one rule against one field.
///
/// Value type: two results with the same fields are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Concrete field path, e.g. `medications[0].dose` or `blood_pressure`.
    pub field: String,
    /// Identifier of the rule that produced this result.
    pub rule: String,
    pub is_valid: bool,
    pub message: String,
    pub severity: Severity,
    pub category: RuleCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationResult {
    /// A passing result. Passing results always carry `Info` severity.
    pub fn pass(
        field: impl Into<String>,
        rule: impl Into<String>,
        category: RuleCategory,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            is_valid: true,
            message: message.into(),
            severity: Severity::Info,
            category,
            suggestion: None,
            timestamp,
        }
    }

    /// A failing result with the given severity.
    pub fn fail(
        field: impl Into<String>,
        rule: impl Into<String>,
        category: RuleCategory,
        severity: Severity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            is_valid: false,
            message: message.into(),
            severity,
            category,
            suggestion: None,
            timestamp,
        }
    }

    /// Attach a suggested correction.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// The synthetic result the orchestrator emits when it cannot complete a
    /// validation run.
    pub fn system_failure(reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::fail(
            "system",
            "system_failure",
            RuleCategory::Safety,
            Severity::Critical,
            format!("validation could not be completed: {}", reason.into()),
            timestamp,
        )
        .with_suggestion("treat this payload as unvalidated and review manually")
    }

    /// True when this result should count against the report.
    pub fn is_issue(&self) -> bool {
        !self.is_valid
    }
}

/// Patient gender as far as validation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    /// Lenient parse: accepts `m`/`male`, `f`/`female`, `other`, and
    /// anything else as `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "man" => Gender::Male,
            "f" | "female" | "woman" => Gender::Female,
            "o" | "other" | "non-binary" | "nonbinary" => Gender::Other,
            _ => Gender::Unknown,
        }
    }
}

/// Read-only snapshot of patient attributes a rule may consult.
///
/// Built once per validation call and shared by every rule and check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Age in years, either stated or derived from the birth date.
    pub age: Option<f64>,
    pub gender: Gender,
    pub pregnant: bool,
    /// Lowercased allergy substances.
    pub allergies: Vec<String>,
    /// Medication names exactly as supplied.
    pub existing_medications: Vec<String>,
    /// Diagnosis codes.
    pub existing_conditions: Vec<String>,
    /// Lowercased religious, cultural, and dietary tags.
    pub cultural_tags: Vec<String>,
    pub fasting: bool,
    /// Lowercased clinical setting, e.g. `inpatient`, `emergency`.
    pub clinical_setting: Option<String>,
    /// "Now" for this validation run. Date rules compare against this.
    pub reference_time: DateTime<Utc>,
}

impl ValidationContext {
    /// An empty context anchored at `reference_time`.
    pub fn empty(reference_time: DateTime<Utc>) -> Self {
        Self {
            age: None,
            gender: Gender::Unknown,
            pregnant: false,
            allergies: Vec::new(),
            existing_medications: Vec::new(),
            existing_conditions: Vec::new(),
            cultural_tags: Vec::new(),
            fasting: false,
            clinical_setting: None,
            reference_time,
        }
    }

    /// Derive the context from a parsed payload.
    pub fn from_payload(payload: &PatientPayload, reference_time: DateTime<Utc>) -> Self {
        let patient = &payload.patient;

        let derived_age = patient
            .birth_date
            .as_deref()
            .and_then(parse_date)
            .and_then(|birth| age_in_years(birth, reference_time.date_naive()))
            .map(f64::from);

        let mut cultural_tags: Vec<String> = patient
            .religious_affiliation
            .iter()
            .chain(patient.cultural_background.iter())
            .chain(patient.dietary_restrictions.iter())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        cultural_tags.sort();
        cultural_tags.dedup();

        Self {
            age: patient.age.or(derived_age),
            gender: patient
                .gender
                .as_deref()
                .map(Gender::parse)
                .unwrap_or(Gender::Unknown),
            pregnant: patient.pregnant.unwrap_or(false),
            allergies: patient
                .allergies
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            existing_medications: payload.medications.iter().map(|m| m.name.clone()).collect(),
            existing_conditions: payload.diagnoses.iter().filter_map(|d| d.code.clone()).collect(),
            cultural_tags,
            fasting: patient.fasting.unwrap_or(false),
            clinical_setting: payload
                .clinical_setting
                .as_deref()
                .map(|s| s.trim().to_lowercase()),
            reference_time,
        }
    }

    /// True if any cultural tag contains `needle`.
    pub fn has_tag(&self, needle: &str) -> bool {
        self.cultural_tags.iter().any(|t| t.contains(needle))
    }
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Whole years elapsed between `birth` and `on`. `None` if `birth` is after `on`.
pub fn age_in_years(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    on.years_since(birth)
}
