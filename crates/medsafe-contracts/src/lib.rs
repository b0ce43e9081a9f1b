//! # medsafe-contracts
//!
//! Shared types, severities, reports, and errors for the MEDSAFE
//! clinical-safety engine.
//!
//! All crates in the workspace import from here. No validation logic lives in
//! this crate, only data definitions, merge semantics, and error types.

pub mod error;
pub mod interaction;
pub mod lenient;
pub mod medication;
pub mod payload;
pub mod reconciliation;
pub mod report;
pub mod severity;
pub mod validation;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use error::MedsafeError;
    use interaction::{merge_interactions, DrugInteractionRecord, PairKey};
    use medication::{Frequency, Medication, Route};
    use payload::PatientPayload;
    use reconciliation::{DiscrepancyType, ReconciliationAction, ReconciliationFinding};
    use report::{FieldResults, ValidationSummary};
    use severity::{InteractionSeverity, Severity};
    use validation::{Gender, RuleCategory, ValidationContext, ValidationResult};

    fn at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(a: &str, b: &str, severity: InteractionSeverity, source: &str) -> DrugInteractionRecord {
        DrugInteractionRecord {
            drug1: a.to_string(),
            drug2: b.to_string(),
            severity,
            description: format!("{a} + {b}"),
            mechanism: String::new(),
            management: String::new(),
            source: source.to_string(),
            timestamp: at(),
        }
    }

    // ── Severity ordering ────────────────────────────────────────────────────

    #[test]
    fn severity_order_is_total() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::Warning.merge(Severity::Critical), Severity::Critical);
        assert_eq!(Severity::Critical.merge(Severity::Info), Severity::Critical);
    }

    #[test]
    fn interaction_severity_order_is_total() {
        use InteractionSeverity::*;
        let ordered = [Unknown, Minor, Moderate, Major, Contraindicated];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should rank below {:?}", pair[0], pair[1]);
        }
        assert_eq!(Minor.merge(Major), Major);
        assert_eq!(Contraindicated.merge(Unknown), Contraindicated);
    }

    #[test]
    fn interaction_severity_maps_onto_validation_severity() {
        assert_eq!(
            InteractionSeverity::Contraindicated.as_validation_severity(),
            Severity::Critical
        );
        assert_eq!(InteractionSeverity::Major.as_validation_severity(), Severity::Error);
        assert_eq!(InteractionSeverity::Moderate.as_validation_severity(), Severity::Warning);
        assert_eq!(InteractionSeverity::Unknown.as_validation_severity(), Severity::Info);
    }

    #[test]
    fn interaction_severity_lenient_parse() {
        assert_eq!(InteractionSeverity::parse("HIGH"), Some(InteractionSeverity::Major));
        assert_eq!(InteractionSeverity::parse(" medium "), Some(InteractionSeverity::Moderate));
        assert_eq!(InteractionSeverity::parse("bogus"), None);
    }

    // ── Interaction merge ────────────────────────────────────────────────────

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(PairKey::new("warfarin", "aspirin"), PairKey::new("aspirin", "warfarin"));
        assert_eq!(PairKey::new("b", "a").first(), "a");
    }

    #[test]
    fn merge_keeps_highest_severity_regardless_of_arrival_order() {
        let low = record("warfarin", "aspirin", InteractionSeverity::Moderate, "a");
        let high = record("aspirin", "warfarin", InteractionSeverity::Major, "b");

        let forward = merge_interactions(vec![low.clone(), high.clone()]);
        let backward = merge_interactions(vec![high, low]);

        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].severity, InteractionSeverity::Major);
        assert_eq!(backward[0].severity, InteractionSeverity::Major);
    }

    #[test]
    fn merge_never_drops_contraindicated() {
        let records = vec![
            record("a", "b", InteractionSeverity::Contraindicated, "kb"),
            record("b", "a", InteractionSeverity::Minor, "enrichment"),
            record("b", "a", InteractionSeverity::Unknown, "enrichment"),
        ];
        let merged = merge_interactions(records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].severity, InteractionSeverity::Contraindicated);
    }

    #[test]
    fn merge_sorts_by_severity_then_name() {
        let merged = merge_interactions(vec![
            record("c", "d", InteractionSeverity::Minor, "kb"),
            record("b", "z", InteractionSeverity::Major, "kb"),
            record("a", "z", InteractionSeverity::Major, "kb"),
        ]);
        let names: Vec<&str> = merged.iter().map(|r| r.drug1.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    // ── Payload parsing ──────────────────────────────────────────────────────

    #[test]
    fn payload_parses_camel_case_fields() {
        let payload = PatientPayload::from_value(&json!({
            "patient": {
                "age": 58,
                "gender": "M",
                "allergies": ["Penicillin"],
                "religiousAffiliation": "Islam"
            },
            "medications": [
                { "name": "Warfarin", "dose": 5, "unit": "mg", "frequency": "qd", "route": "po" }
            ],
            "labResults": [{ "test": "INR", "value": 2.4, "collectionDate": "2026-02-01" }],
            "vitals": { "systolic": 138, "diastolic": "88" },
            "diagnoses": [{ "code": "I10", "system": "ICD-10" }]
        }))
        .unwrap();

        assert_eq!(payload.patient.age, Some(58.0));
        assert_eq!(payload.medications[0].dose.as_deref(), Some("5"));
        assert_eq!(payload.vitals.diastolic, Some(88.0));
        assert_eq!(payload.lab_results[0].collection_date.as_deref(), Some("2026-02-01"));
        assert_eq!(payload.patient.religious_affiliation.as_deref(), Some("Islam"));
    }

    #[test]
    fn payload_tolerates_wrong_typed_values() {
        let payload = PatientPayload::from_value(&json!({
            "patient": { "age": "not a number", "allergies": "sulfa" },
            "medications": [42, { "name": "aspirin" }],
            "vitals": "garbage"
        }))
        .unwrap();

        assert_eq!(payload.patient.age, None);
        assert_eq!(payload.patient.allergies, vec!["sulfa".to_string()]);
        assert_eq!(payload.medications.len(), 1);
        assert_eq!(payload.vitals.systolic, None);
    }

    #[test]
    fn medication_with_wrong_typed_name_is_kept() {
        let payload = PatientPayload::from_value(&json!({
            "patient": {},
            "medications": [
                { "name": ["aspirin"], "dose": 81, "source": 7 },
                { "name": null, "code": 11289 },
                { "name": "warfarin" }
            ]
        }))
        .unwrap();

        assert_eq!(payload.medications.len(), 3);
        assert_eq!(payload.medications[0].name, "");
        assert_eq!(payload.medications[0].dose.as_deref(), Some("81"));
        assert_eq!(payload.medications[0].source.as_deref(), Some("7"));
        assert_eq!(payload.medications[1].code.as_deref(), Some("11289"));
        assert_eq!(payload.medications[2].name, "warfarin");
    }

    #[test]
    fn payload_rejects_non_object_top_level() {
        assert!(PatientPayload::from_value(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn context_derives_age_from_birth_date() {
        let payload = PatientPayload::from_value(&json!({
            "patient": { "birthDate": "1986-01-15", "gender": "female", "pregnant": "yes" }
        }))
        .unwrap();
        let ctx = ValidationContext::from_payload(&payload, at());
        assert_eq!(ctx.age, Some(40.0));
        assert_eq!(ctx.gender, Gender::Female);
        assert!(ctx.pregnant);
    }

    // ── Sig normalization ────────────────────────────────────────────────────

    #[test]
    fn frequency_abbreviations_fold() {
        assert_eq!(Frequency::parse("BID"), Frequency::parse("twice daily"));
        assert_eq!(Frequency::parse("q.i.d."), Frequency::FourTimesDaily);
        assert_eq!(Frequency::parse("q4h"), Frequency::EveryHours(4));
        assert_eq!(Frequency::parse("every 4 hours"), Frequency::EveryHours(4));
        assert_eq!(Frequency::EveryHours(4).doses_per_day(), Some(6.0));
    }

    #[test]
    fn route_abbreviations_fold() {
        assert_eq!(Route::parse("PO"), Route::Oral);
        assert_eq!(Route::parse("by mouth"), Route::Oral);
        assert_eq!(Route::parse("subq"), Route::Subcutaneous);
    }

    #[test]
    fn dose_comparison_is_numeric_and_unit_aware() {
        let a = Medication::named("metformin").with_dose("500", "mg");
        let b = Medication::named("metformin").with_dose("500.0", "milligrams");
        let c = Medication::named("metformin").with_dose("1000", "mg");
        assert!(a.same_dose(&b));
        assert!(!a.same_dose(&c));
    }

    // ── Summary ──────────────────────────────────────────────────────────────

    #[test]
    fn summary_fails_on_error_result() {
        let mut fields = FieldResults::new();
        fields.insert(
            "patient.age".to_string(),
            vec![ValidationResult::fail(
                "patient.age",
                "patient_age_range",
                RuleCategory::Range,
                Severity::Error,
                "out of range",
                at(),
            )],
        );
        let summary = ValidationSummary::compute(&fields, &[], &[], None);
        assert!(!summary.passed);
        assert_eq!(summary.total_issues, 1);
    }

    #[test]
    fn summary_passes_with_only_warnings_and_info() {
        let cross = vec![ValidationResult::fail(
            "patient.age",
            "age_consistency",
            RuleCategory::Consistency,
            Severity::Warning,
            "mismatch",
            at(),
        )];
        let interactions = vec![record("a", "b", InteractionSeverity::Minor, "kb")];
        let summary = ValidationSummary::compute(&FieldResults::new(), &cross, &interactions, None);
        assert!(summary.passed);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.total_issues, 2);
    }

    #[test]
    fn summary_fails_on_major_interaction() {
        let interactions = vec![record("aspirin", "warfarin", InteractionSeverity::Major, "kb")];
        let summary = ValidationSummary::compute(&FieldResults::new(), &[], &interactions, None);
        assert!(!summary.passed);
        assert_eq!(summary.critical_issues, 0);
    }

    #[test]
    fn summary_reconciliation_is_advisory_except_contraindications() {
        let advisory = ReconciliationFinding::new(
            Medication::named("lisinopril"),
            ReconciliationAction::Discontinue,
            Some(DiscrepancyType::Omission),
            "missing",
            0.8,
        );
        let summary =
            ValidationSummary::compute(&FieldResults::new(), &[], &[], Some(&[advisory.clone()]));
        assert!(summary.passed);
        assert_eq!(summary.total_issues, 1);

        let mut flagged = advisory;
        flagged.warnings.push(record(
            "clarithromycin",
            "simvastatin",
            InteractionSeverity::Contraindicated,
            "kb",
        ));
        let summary = ValidationSummary::compute(&FieldResults::new(), &[], &[], Some(&[flagged]));
        assert!(!summary.passed);
        assert_eq!(summary.critical_issues, 1);
    }

    // ── ValidationResult serde ───────────────────────────────────────────────

    #[test]
    fn validation_result_serializes_with_camel_case_keys() {
        let result = ValidationResult::fail(
            "blood_pressure",
            "bp_consistency",
            RuleCategory::Consistency,
            Severity::Error,
            "systolic must exceed diastolic",
            at(),
        )
        .with_suggestion("re-measure");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isValid"], json!(false));
        assert_eq!(json["severity"], json!("error"));
        assert_eq!(json["category"], json!("consistency"));
        assert_eq!(json["rule"], json!("bp_consistency"));
        assert_eq!(json["suggestion"], json!("re-measure"));
    }

    #[test]
    fn system_failure_is_critical() {
        let result = ValidationResult::system_failure("stage panicked", at());
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.field, "system");
        assert!(!result.is_valid);
    }

    // ── MedsafeError display messages ────────────────────────────────────────

    #[test]
    fn error_collaborator_unavailable_display() {
        let err = MedsafeError::CollaboratorUnavailable {
            service: "terminology".to_string(),
            reason: "timed out after 2000ms".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("terminology"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn error_invalid_rule_display() {
        let err = MedsafeError::InvalidRule {
            rule_id: "patient_gender_format".to_string(),
            reason: "regex parse error".to_string(),
        };
        assert!(err.to_string().contains("patient_gender_format"));
    }
}
