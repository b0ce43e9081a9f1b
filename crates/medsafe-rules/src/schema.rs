//! The field validation stage.
//!
//! `FieldRuleValidator` implements `FieldValidator` from `medsafe-core`.
//! It runs in two phases:
//!
//! 1. **Structural**: the payload is validated against [`payload_schema`]
//!    using the `jsonschema` crate. Container shapes are constrained, along
//!    with the text fields that typed parsing would otherwise blank out
//!    (medication names, allergy and dietary entries). Other scalars are left
//!    to the field rules so numeric strings and the like are judged by the
//!    rule that owns them.
//! 2. **Rules**: every rule in the engine is resolved against the payload.
//!
//! Structural violations are Error results under the field `payload`.

use serde_json::{json, Value};
use tracing::{debug, warn};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    report::FieldResults,
    severity::Severity,
    validation::{RuleCategory, ValidationContext, ValidationResult},
};
use medsafe_core::traits::FieldValidator;

use crate::engine::RuleEngine;

/// The JSON Schema every inbound payload must satisfy.
pub fn payload_schema() -> Value {
    let text = json!({ "type": ["string", "null"] });
    let text_list = json!({
        "type": ["array", "string", "null"],
        "items": { "type": "string" }
    });
    let medication_list = json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "name": text.clone(),
                "normalizedName": text.clone(),
                "source": text.clone()
            }
        }
    });

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "MEDSAFE patient payload",
        "type": "object",
        "properties": {
            "patient": {
                "type": "object",
                "properties": {
                    "allergies": text_list.clone(),
                    "dietaryRestrictions": text_list
                }
            },
            "medications": medication_list.clone(),
            "incomingMedications": medication_list,
            "labResults": {
                "type": "array",
                "items": { "type": "object" }
            },
            "vitals": { "type": ["object", "null"] },
            "diagnoses": {
                "type": "array",
                "items": { "type": "object" }
            },
            "clinicalSetting": text
        },
        "required": ["patient"]
    })
}

/// Field rules preceded by a structural JSON Schema check.
pub struct FieldRuleValidator {
    engine: RuleEngine,
    schema: jsonschema::Validator,
}

impl FieldRuleValidator {
    /// Wrap `engine` with the default payload schema.
    pub fn new(engine: RuleEngine) -> MedsafeResult<Self> {
        Self::with_schema(engine, &payload_schema())
    }

    /// Wrap `engine` with a caller-supplied schema document.
    ///
    /// Returns `SchemaValidation` if the document does not compile.
    pub fn with_schema(engine: RuleEngine, schema: &Value) -> MedsafeResult<Self> {
        let schema = jsonschema::validator_for(schema).map_err(|e| MedsafeError::SchemaValidation {
            reason: format!("invalid JSON Schema document: {e}"),
        })?;
        Ok(Self { engine, schema })
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    fn structural(&self, payload: &Value, ctx: &ValidationContext) -> Vec<ValidationResult> {
        self.schema
            .iter_errors(payload)
            .map(|error| {
                let location = error.instance_path.to_string();
                let location = if location.is_empty() { "/".to_string() } else { location };
                let message = format!("structure violation at {location}: {error}");
                warn!(%message, "structural validation failure");
                ValidationResult::fail(
                    "payload",
                    "payload_schema",
                    RuleCategory::Format,
                    Severity::Error,
                    message,
                    ctx.reference_time,
                )
            })
            .collect()
    }
}

impl FieldValidator for FieldRuleValidator {
    fn validate_fields(&self, payload: &Value, ctx: &ValidationContext) -> MedsafeResult<FieldResults> {
        let structural = self.structural(payload, ctx);
        let mut results = self.engine.validate_payload(payload, ctx);

        if !structural.is_empty() {
            results.entry("payload".to_string()).or_default().extend(structural);
        }

        debug!(
            fields = results.len(),
            failures = results.values().flatten().filter(|r| !r.is_valid).count(),
            "field validation complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use medsafe_contracts::{error::MedsafeError, severity::Severity, validation::ValidationContext};
    use medsafe_core::traits::FieldValidator;

    use crate::engine::RuleEngine;

    use super::FieldRuleValidator;

    fn ctx() -> ValidationContext {
        ValidationContext::empty(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn well_shaped_payload_has_no_structural_findings() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let payload = json!({
            "patient": { "age": "45", "allergies": ["penicillin"] },
            "medications": [{ "name": "warfarin", "dose": 5 }],
            "vitals": { "systolic": "120" }
        });
        let results = validator.validate_fields(&payload, &ctx()).unwrap();
        assert!(!results.contains_key("payload"));
    }

    #[test]
    fn wrong_container_shapes_are_errors_under_payload() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let payload = json!({
            "patient": { "age": 45 },
            "medications": "warfarin 5mg daily"
        });
        let results = validator.validate_fields(&payload, &ctx()).unwrap();
        let structural = &results["payload"];
        assert!(!structural.is_empty());
        assert!(structural.iter().all(|r| !r.is_valid && r.severity == Severity::Error));
        assert!(structural[0].message.contains("/medications"));
    }

    #[test]
    fn non_string_allergy_entries_are_structural_errors() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let payload = json!({
            "patient": {
                "allergies": ["sulfa", { "substance": "penicillin" }],
                "dietaryRestrictions": [7]
            }
        });
        let results = validator.validate_fields(&payload, &ctx()).unwrap();
        let structural = &results["payload"];
        assert_eq!(structural.len(), 2);
        assert!(structural.iter().any(|r| r.message.contains("/patient/allergies/1")));
        assert!(structural.iter().any(|r| r.message.contains("/patient/dietaryRestrictions/0")));

        let single = json!({ "patient": { "allergies": "sulfa" } });
        assert!(!validator.validate_fields(&single, &ctx()).unwrap().contains_key("payload"));
    }

    #[test]
    fn malformed_list_elements_are_structural_errors() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let payload = json!({
            "patient": {},
            "medications": [{ "name": "warfarin" }, { "name": ["aspirin"] }, 42, null],
            "incomingMedications": [{ "name": { "brand": "Advil" } }],
            "labResults": ["INR 2.4"],
            "diagnoses": [null]
        });
        let results = validator.validate_fields(&payload, &ctx()).unwrap();
        let locations: Vec<&str> = results["payload"].iter().map(|r| r.message.as_str()).collect();

        for expected in [
            "/medications/1/name",
            "/medications/2",
            "/medications/3",
            "/incomingMedications/0/name",
            "/labResults/0",
            "/diagnoses/0",
        ] {
            assert!(
                locations.iter().any(|m| m.contains(&format!("at {expected}:"))),
                "no structural finding at {expected}: {locations:?}"
            );
        }
    }

    #[test]
    fn null_medication_name_is_allowed_structurally() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let payload = json!({ "patient": {}, "medications": [{ "name": null, "code": 11289 }] });
        let results = validator.validate_fields(&payload, &ctx()).unwrap();
        assert!(!results.contains_key("payload"));
    }

    #[test]
    fn missing_patient_is_structural_error() {
        let validator = FieldRuleValidator::new(RuleEngine::default()).unwrap();
        let results = validator.validate_fields(&json!({ "medications": [] }), &ctx()).unwrap();
        assert_eq!(results["payload"][0].rule, "payload_schema");
    }

    #[test]
    fn invalid_schema_document_is_rejected() {
        let bad = json!({ "type": "not-a-real-type" });
        match FieldRuleValidator::with_schema(RuleEngine::default(), &bad) {
            Err(MedsafeError::SchemaValidation { .. }) => {}
            Err(other) => panic!("expected SchemaValidation, got {:?}", other),
            Ok(_) => panic!("expected SchemaValidation, got a validator"),
        }
    }
}
