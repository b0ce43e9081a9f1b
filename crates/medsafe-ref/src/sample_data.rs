//! Fictional patient payloads for the reference scenarios and tests.
//!
//! Every payload is evaluated against [`reference_time`] so derived ages and
//! "not in the future" date checks are stable. No real patient data appears
//! here.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// The fixed "now" the samples were written against: 2026-03-01T12:00:00Z.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn normal_vitals() -> Value {
    json!({
        "systolic": 132,
        "diastolic": 84,
        "heartRate": 72,
        "respiratoryRate": 16,
        "temperature": 36.8,
        "oxygenSaturation": 97,
        "weight": 82,
        "height": 176
    })
}

/// 67-year-old on warfarin and low-dose aspirin. Clean data; the only
/// finding of note is the Major interaction.
pub fn anticoagulated_elder() -> Value {
    json!({
        "patient": {
            "age": 67,
            "gender": "male",
            "birthDate": "1958-06-10",
            "allergies": []
        },
        "medications": [
            { "name": "Warfarin", "code": "11289", "dose": 5, "unit": "mg", "frequency": "daily", "route": "po", "startDate": "2024-09-01" },
            { "name": "Aspirin", "code": "1191", "dose": 81, "unit": "mg", "frequency": "daily", "route": "po", "startDate": "2025-11-20" }
        ],
        "labResults": [
            { "test": "INR", "value": 2.6, "unit": "ratio", "collectionDate": "2026-02-27", "resultDate": "2026-02-28" }
        ],
        "vitals": normal_vitals(),
        "diagnoses": [
            { "code": "I48.91", "system": "ICD-10" },
            { "code": "I10", "system": "ICD-10" }
        ],
        "clinicalSetting": "outpatient"
    })
}

/// Stated age 25, birth date implies 40.
pub fn age_mismatch() -> Value {
    json!({
        "patient": {
            "age": 25,
            "gender": "female",
            "birthDate": "1986-01-15",
            "allergies": []
        },
        "medications": [
            { "name": "Metformin", "dose": 500, "unit": "mg", "frequency": "bid", "route": "oral" }
        ],
        "labResults": [],
        "vitals": normal_vitals(),
        "diagnoses": [{ "code": "E11.9", "system": "ICD-10" }]
    })
}

/// Pregnant patient with warfarin on her list.
pub fn pregnant_on_warfarin() -> Value {
    json!({
        "patient": {
            "age": 31,
            "gender": "female",
            "birthDate": "1994-08-02",
            "pregnant": true,
            "pregnancyWeeks": 14,
            "allergies": []
        },
        "medications": [
            { "name": "Coumadin", "dose": 5, "unit": "mg", "frequency": "daily", "route": "po" },
            { "name": "Acetaminophen", "dose": 500, "unit": "mg", "frequency": "prn", "route": "po" }
        ],
        "labResults": [],
        "vitals": normal_vitals(),
        "diagnoses": [{ "code": "Z34.90", "system": "ICD-10" }],
        "clinicalSetting": "inpatient"
    })
}

/// Toddler prescribed promethazine by brand name.
pub fn pediatric_promethazine() -> Value {
    json!({
        "patient": { "age": 1.5, "gender": "male", "allergies": [] },
        "medications": [
            { "name": "Phenergan", "dose": 6.25, "unit": "mg", "frequency": "q6h", "route": "po" }
        ],
        "labResults": [],
        "vitals": { "heartRate": 118, "temperature": 38.4, "weight": 11 },
        "diagnoses": []
    })
}

/// Documented penicillin allergy, amoxicillin prescribed.
pub fn penicillin_allergy() -> Value {
    json!({
        "patient": { "age": 45, "gender": "female", "allergies": ["Penicillin"] },
        "medications": [
            { "name": "Amoxicillin", "dose": 500, "unit": "mg", "frequency": "tid", "route": "po" }
        ],
        "labResults": [],
        "vitals": normal_vitals(),
        "diagnoses": []
    })
}

/// Systolic recorded below diastolic.
pub fn inverted_blood_pressure() -> Value {
    json!({
        "patient": { "age": 52, "gender": "male", "allergies": [] },
        "medications": [],
        "labResults": [],
        "vitals": { "systolic": 80, "diastolic": 95, "heartRate": 70 },
        "diagnoses": []
    })
}

/// Every value type wrong in a different way.
pub fn malformed_values() -> Value {
    json!({
        "patient": { "age": "forty", "gender": "x", "birthDate": "not-a-date", "allergies": [] },
        "medications": [
            { "name": "lisinopril", "dose": -5, "unit": "mg" }
        ],
        "labResults": [
            { "test": "Potassium", "value": 4.1, "collectionDate": "2026-13-45" }
        ],
        "vitals": { "systolic": "high", "oxygenSaturation": 140 },
        "diagnoses": [{ "code": "E11.999", "system": "ICD-10" }]
    })
}

/// Fasting patient with halal dietary restrictions on heparin and metformin.
pub fn observant_fasting_patient() -> Value {
    json!({
        "patient": {
            "age": 58,
            "gender": "male",
            "religiousAffiliation": "Muslim",
            "dietaryRestrictions": ["halal"],
            "fasting": true,
            "allergies": []
        },
        "medications": [
            { "name": "Heparin", "dose": 5000, "unit": "units", "frequency": "q12h", "route": "sc" },
            { "name": "Metformin", "dose": 500, "unit": "mg", "frequency": "bid", "route": "po" }
        ],
        "labResults": [],
        "vitals": normal_vitals(),
        "diagnoses": [{ "code": "E11.9", "system": "ICD-10" }],
        "clinicalSetting": "inpatient"
    })
}

/// Admission to discharge: the discharge list repeats warfarin under a
/// brand name, drops atorvastatin, and adds ibuprofen.
pub fn discharge_reconciliation() -> Value {
    json!({
        "patient": {
            "age": 71,
            "gender": "female",
            "birthDate": "1954-05-03",
            "allergies": ["sulfa"]
        },
        "medications": [
            { "name": "Warfarin", "dose": 5, "unit": "mg", "frequency": "daily", "route": "po", "source": "home" },
            { "name": "Lisinopril", "dose": 10, "unit": "mg", "frequency": "daily", "route": "po", "source": "home" },
            { "name": "Atorvastatin", "dose": 40, "unit": "mg", "frequency": "qhs", "route": "po", "source": "home" },
            { "name": "Metformin", "dose": 500, "unit": "mg", "frequency": "bid", "route": "po", "source": "home" }
        ],
        "incomingMedications": [
            { "name": "Coumadin", "dose": 7.5, "unit": "mg", "frequency": "daily", "route": "po", "source": "discharge" },
            { "name": "Lisinopril", "dose": 10, "unit": "mg", "frequency": "qd", "route": "oral", "source": "discharge" },
            { "name": "Metformin", "dose": 500, "unit": "mg", "frequency": "twice daily", "route": "po", "source": "discharge" },
            { "name": "Warfarin", "dose": 7.5, "unit": "mg", "frequency": "daily", "route": "po", "source": "discharge" },
            { "name": "Ibuprofen", "dose": 400, "unit": "mg", "frequency": "q6h", "route": "po", "source": "discharge" }
        ],
        "labResults": [
            { "test": "INR", "value": 1.7, "unit": "ratio", "collectionDate": "2026-02-28", "resultDate": "2026-02-28" }
        ],
        "vitals": normal_vitals(),
        "diagnoses": [{ "code": "I48.91", "system": "ICD-10" }, { "code": "E11.9", "system": "ICD-10" }],
        "clinicalSetting": "inpatient"
    })
}
