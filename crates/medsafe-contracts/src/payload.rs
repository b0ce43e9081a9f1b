//! Typed view of the inbound patient payload.
//!
//! Parsing is deliberately forgiving (see `lenient`): a wrong-typed value is
//! dropped here and reported by the field rules that run on the raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::medication::Medication;

/// Demographics and patient-level attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::boolean")]
    pub pregnant: Option<bool>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub pregnancy_weeks: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::string_list")]
    pub allergies: Vec<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub religious_affiliation: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub cultural_background: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string_list")]
    pub dietary_restrictions: Vec<String>,
    #[serde(default, deserialize_with = "crate::lenient::boolean")]
    pub fasting: Option<bool>,
}

impl PatientInfo {
    /// True if any pregnancy-related field is populated affirmatively.
    pub fn has_pregnancy_data(&self) -> bool {
        self.pregnant == Some(true) || self.pregnancy_weeks.is_some()
    }
}

/// A single laboratory result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub test: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub collection_date: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub result_date: Option<String>,
}

/// Vital signs at the time of the encounter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub systolic: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub diastolic: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub respiratory_rate: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub oxygen_saturation: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::number")]
    pub height: Option<f64>,
}

/// A coded diagnosis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub system: Option<String>,
}

/// The full inbound payload.
///
/// `incoming_medications`, when present, is the list on the other side of a
/// care transition and triggers reconciliation against `medications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPayload {
    #[serde(default, deserialize_with = "crate::lenient::object")]
    pub patient: PatientInfo,
    #[serde(default, deserialize_with = "crate::lenient::list")]
    pub medications: Vec<Medication>,
    #[serde(default, deserialize_with = "crate::lenient::optional_list")]
    pub incoming_medications: Option<Vec<Medication>>,
    #[serde(default, deserialize_with = "crate::lenient::list")]
    pub lab_results: Vec<LabResult>,
    #[serde(default, deserialize_with = "crate::lenient::object")]
    pub vitals: Vitals,
    #[serde(default, deserialize_with = "crate::lenient::list")]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub clinical_setting: Option<String>,
}

impl PatientPayload {
    /// Parse from raw JSON. Fails only when the top level is not an object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}
