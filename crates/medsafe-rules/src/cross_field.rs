//! Multi-field consistency checks.
//!
//! `CrossFieldValidator` implements `ConsistencyValidator`. Each check is
//! independent and order-insensitive; the validator simply concatenates what
//! they return. Medication names go through the injected `NameNormalizer`
//! first, so a brand name is gated the same way as its generic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use medsafe_contracts::{
    error::MedsafeResult,
    payload::PatientPayload,
    severity::Severity,
    validation::{age_in_years, parse_date, Gender, RuleCategory, ValidationContext, ValidationResult},
};
use medsafe_core::traits::{ConsistencyValidator, NameNormalizer};

/// Age-gated denylist tier: drugs flagged for patients younger than
/// `under_years`.
struct PediatricTier {
    under_years: f64,
    severity: Severity,
    drugs: &'static [&'static str],
}

const PEDIATRIC_TIERS: &[PediatricTier] = &[
    PediatricTier {
        under_years: 1.0,
        severity: Severity::Critical,
        drugs: &["chloramphenicol", "ceftriaxone"],
    },
    PediatricTier {
        under_years: 2.0,
        severity: Severity::Critical,
        drugs: &["promethazine", "loperamide", "benzocaine"],
    },
    PediatricTier {
        under_years: 6.0,
        severity: Severity::Error,
        drugs: &["pseudoephedrine", "diphenhydramine", "dextromethorphan", "phenylephrine"],
    },
    PediatricTier {
        under_years: 12.0,
        severity: Severity::Error,
        drugs: &["codeine", "tramadol", "tetracycline", "doxycycline"],
    },
    PediatricTier {
        under_years: 18.0,
        severity: Severity::Warning,
        drugs: &["aspirin", "ciprofloxacin", "levofloxacin", "moxifloxacin"],
    },
];

/// Teratogens that must not be given during pregnancy.
const PREGNANCY_CONTRAINDICATED: &[&str] = &[
    "isotretinoin",
    "methotrexate",
    "warfarin",
    "misoprostol",
    "thalidomide",
    "valproate",
    "mycophenolate",
    "leflunomide",
];

/// An ingredient that conflicts with a dietary or cultural tag.
struct DietaryConflict {
    drugs: &'static [&'static str],
    tags: &'static [&'static str],
    ingredient: &'static str,
    alternative: &'static str,
}

const DIETARY_CONFLICTS: &[DietaryConflict] = &[
    DietaryConflict {
        drugs: &["heparin", "enoxaparin", "dalteparin", "pancrelipase"],
        tags: &["halal", "kosher", "muslim", "islam", "jewish", "judaism", "vegan", "vegetarian", "pork"],
        ingredient: "porcine-derived material",
        alternative: "discuss fondaparinux or a non-porcine product with the patient",
    },
    DietaryConflict {
        drugs: &["omeprazole", "esomeprazole", "lansoprazole", "fluoxetine", "duloxetine"],
        tags: &["vegan", "vegetarian", "halal", "kosher", "hindu", "gelatin"],
        ingredient: "gelatin capsule shell",
        alternative: "request a tablet or vegetarian capsule formulation",
    },
    DietaryConflict {
        drugs: &["phenobarbital", "dextromethorphan", "guaifenesin"],
        tags: &["muslim", "islam", "halal", "alcohol", "lds", "mormon"],
        ingredient: "alcohol-containing liquid formulation",
        alternative: "request an alcohol-free formulation",
    },
];

/// The cross-field consistency stage.
pub struct CrossFieldValidator {
    normalizer: Arc<dyn NameNormalizer>,
}

impl CrossFieldValidator {
    pub fn new(normalizer: Arc<dyn NameNormalizer>) -> Self {
        Self { normalizer }
    }

    /// (field path, normalized name) for every named medication.
    fn medication_names(&self, payload: &PatientPayload) -> Vec<(String, String)> {
        payload
            .medications
            .iter()
            .enumerate()
            .map(|(i, m)| (format!("medications[{i}].name"), self.normalizer.normalize_medication(m)))
            .filter(|(_, name)| !name.is_empty())
            .collect()
    }
}

impl ConsistencyValidator for CrossFieldValidator {
    fn validate(&self, payload: &PatientPayload, ctx: &ValidationContext) -> MedsafeResult<Vec<ValidationResult>> {
        let at = ctx.reference_time;
        let names = self.medication_names(payload);

        let mut results = Vec::new();
        results.extend(bp_consistency(payload, at));
        results.extend(lab_date_order(payload, at));
        results.extend(age_consistency(payload, at));
        results.extend(gender_pregnancy(payload, ctx));
        results.extend(pediatric_medication(&names, ctx));
        results.extend(pregnancy_medication(&names, ctx));
        results.extend(dietary_conflict(&names, ctx));
        results.extend(fasting_timing(payload, ctx));

        debug!(
            checks = results.len(),
            failures = results.iter().filter(|r| !r.is_valid).count(),
            "cross-field validation complete"
        );
        Ok(results)
    }
}

fn bp_consistency(payload: &PatientPayload, at: DateTime<Utc>) -> Option<ValidationResult> {
    let (systolic, diastolic) = (payload.vitals.systolic?, payload.vitals.diastolic?);
    Some(if systolic <= diastolic {
        ValidationResult::fail(
            "blood_pressure",
            "bp_consistency",
            RuleCategory::Consistency,
            Severity::Error,
            format!("systolic pressure {systolic} must be greater than diastolic pressure {diastolic}"),
            at,
        )
        .with_suggestion("check whether systolic and diastolic values were swapped")
    } else {
        ValidationResult::pass(
            "blood_pressure",
            "bp_consistency",
            RuleCategory::Consistency,
            "systolic exceeds diastolic",
            at,
        )
    })
}

fn lab_date_order(payload: &PatientPayload, at: DateTime<Utc>) -> Vec<ValidationResult> {
    payload
        .lab_results
        .iter()
        .enumerate()
        .filter_map(|(i, lab)| {
            let collected = lab.collection_date.as_deref().and_then(parse_date)?;
            let resulted = lab.result_date.as_deref().and_then(parse_date)?;
            let field = format!("labResults[{i}]");
            Some(if collected > resulted {
                ValidationResult::fail(
                    field,
                    "lab_date_order",
                    RuleCategory::Temporal,
                    Severity::Error,
                    format!("collection date {collected} is after result date {resulted}"),
                    at,
                )
            } else {
                ValidationResult::pass(field, "lab_date_order", RuleCategory::Temporal, "collected before resulted", at)
            })
        })
        .collect()
}

fn age_consistency(payload: &PatientPayload, at: DateTime<Utc>) -> Option<ValidationResult> {
    let stated = payload.patient.age?;
    let birth_date = payload.patient.birth_date.as_deref()?;
    let derived = age_in_years(parse_date(birth_date)?, at.date_naive())?;

    Some(if (stated - f64::from(derived)).abs() > 1.0 {
        ValidationResult::fail(
            "patient.age",
            "age_consistency",
            RuleCategory::Consistency,
            Severity::Warning,
            format!("stated age {stated} does not match birth date {birth_date} (age {derived})"),
            at,
        )
        .with_suggestion(format!("correct age to {derived}"))
    } else {
        ValidationResult::pass(
            "patient.age",
            "age_consistency",
            RuleCategory::Consistency,
            "stated age matches birth date",
            at,
        )
    })
}

fn gender_pregnancy(payload: &PatientPayload, ctx: &ValidationContext) -> Vec<ValidationResult> {
    let patient = &payload.patient;
    let at = ctx.reference_time;
    let mut out = Vec::new();

    if ctx.gender == Gender::Male && patient.has_pregnancy_data() {
        out.push(
            ValidationResult::fail(
                "patient.pregnant",
                "gender_pregnancy",
                RuleCategory::Demographic,
                Severity::Error,
                "pregnancy data recorded for a male patient",
                at,
            )
            .with_suggestion("verify the patient's gender and pregnancy status"),
        );
    }

    if patient.pregnant == Some(true) {
        if let Some(age) = ctx.age.filter(|a| *a < 10.0 || *a > 60.0) {
            out.push(
                ValidationResult::fail(
                    "patient.pregnant",
                    "pregnancy_age",
                    RuleCategory::Demographic,
                    Severity::Warning,
                    format!("pregnancy recorded at age {age}, which is outside the expected range"),
                    at,
                )
                .with_suggestion("confirm age and pregnancy status"),
            );
        }
    }

    out
}

fn pediatric_medication(names: &[(String, String)], ctx: &ValidationContext) -> Vec<ValidationResult> {
    let Some(age) = ctx.age else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for tier in PEDIATRIC_TIERS.iter().filter(|t| age < t.under_years) {
        for (field, name) in names {
            if tier.drugs.contains(&name.as_str()) {
                out.push(
                    ValidationResult::fail(
                        field.clone(),
                        "pediatric_medication",
                        RuleCategory::Safety,
                        tier.severity,
                        format!(
                            "{name} is not recommended for patients under {} years (age {age})",
                            tier.under_years
                        ),
                        ctx.reference_time,
                    )
                    .with_suggestion("review with pediatric pharmacy for an age-appropriate alternative"),
                );
            }
        }
    }
    out
}

fn pregnancy_medication(names: &[(String, String)], ctx: &ValidationContext) -> Vec<ValidationResult> {
    if !ctx.pregnant {
        return Vec::new();
    }
    names
        .iter()
        .filter(|(_, name)| PREGNANCY_CONTRAINDICATED.contains(&name.as_str()))
        .map(|(field, name)| {
            ValidationResult::fail(
                field.clone(),
                "pregnancy_medication",
                RuleCategory::Safety,
                Severity::Critical,
                format!("{name} is contraindicated in pregnancy"),
                ctx.reference_time,
            )
            .with_suggestion("stop and substitute a pregnancy-compatible alternative")
        })
        .collect()
}

fn dietary_conflict(names: &[(String, String)], ctx: &ValidationContext) -> Vec<ValidationResult> {
    if ctx.cultural_tags.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for conflict in DIETARY_CONFLICTS {
        let Some(tag) = conflict.tags.iter().find(|t| ctx.has_tag(t)) else {
            continue;
        };
        for (field, name) in names {
            if conflict.drugs.contains(&name.as_str()) {
                out.push(
                    ValidationResult::fail(
                        field.clone(),
                        "dietary_conflict",
                        RuleCategory::Cultural,
                        Severity::Info,
                        format!("{name} may contain {} (patient preference: {tag})", conflict.ingredient),
                        ctx.reference_time,
                    )
                    .with_suggestion(conflict.alternative),
                );
            }
        }
    }
    out
}

fn fasting_timing(payload: &PatientPayload, ctx: &ValidationContext) -> Vec<ValidationResult> {
    if !ctx.fasting {
        return Vec::new();
    }
    payload
        .medications
        .iter()
        .enumerate()
        .filter_map(|(i, med)| {
            let frequency = med.parsed_frequency()?;
            let per_day = frequency.doses_per_day()?;
            if per_day < 2.0 {
                return None;
            }
            Some(
                ValidationResult::fail(
                    format!("medications[{i}].frequency"),
                    "fasting_timing",
                    RuleCategory::Cultural,
                    Severity::Info,
                    format!(
                        "{} is scheduled {} times a day, which conflicts with daytime fasting",
                        med.name, per_day
                    ),
                    ctx.reference_time,
                )
                .with_suggestion("consider once-daily or pre-dawn/after-sunset dosing"),
            )
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
