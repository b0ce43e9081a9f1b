//! Syntactic code-system validation.
//!
//! `PatternCodeValidator` checks that a code has the right *shape* for its
//! system. It does not know whether the code exists; that is the terminology
//! collaborator's job.

use std::sync::LazyLock;

use regex::Regex;

use medsafe_core::traits::{CodeSystemValidator, CodeVerification};

static ICD10: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}(\.\d{1,2})?$").ok());
static LOINC: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{1,7}-\d$").ok());
static SNOMED_CT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[1-9]\d{5,17}$").ok());
static RXNORM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{1,8}$").ok());

/// Code systems with a known shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSystem {
    Icd10,
    Loinc,
    SnomedCt,
    RxNorm,
}

impl CodeSystem {
    /// Recognize a system by common name or canonical URI.
    ///
    /// Case, spaces, hyphens, and underscores are ignored:
    /// `ICD-10`, `icd10cm`, and `http://hl7.org/fhir/sid/icd-10` are all ICD-10.
    pub fn parse(system: &str) -> Option<Self> {
        let folded: String = system
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        match folded.as_str() {
            "icd10" | "icd10cm" | "http://hl7.org/fhir/sid/icd10" | "http://hl7.org/fhir/sid/icd10cm" => {
                Some(CodeSystem::Icd10)
            }
            "loinc" | "http://loinc.org" => Some(CodeSystem::Loinc),
            "snomed" | "snomedct" | "sct" | "http://snomed.info/sct" => Some(CodeSystem::SnomedCt),
            "rxnorm" | "http://www.nlm.nih.gov/research/umls/rxnorm" => Some(CodeSystem::RxNorm),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CodeSystem::Icd10 => "ICD-10",
            CodeSystem::Loinc => "LOINC",
            CodeSystem::SnomedCt => "SNOMED CT",
            CodeSystem::RxNorm => "RxNorm",
        }
    }

    fn expected_form(self) -> &'static str {
        match self {
            CodeSystem::Icd10 => "a letter, two digits, and an optional decimal part (e.g. E11.9)",
            CodeSystem::Loinc => "digits, a hyphen, and a check digit (e.g. 4548-4)",
            CodeSystem::SnomedCt => "a 6 to 18 digit concept id (e.g. 44054006)",
            CodeSystem::RxNorm => "a numeric concept id of up to 8 digits (e.g. 11289)",
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        match self {
            CodeSystem::Icd10 => ICD10.as_ref(),
            CodeSystem::Loinc => LOINC.as_ref(),
            CodeSystem::SnomedCt => SNOMED_CT.as_ref(),
            CodeSystem::RxNorm => RXNORM.as_ref(),
        }
    }
}

/// Validates codes against per-system regular expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCodeValidator;

impl PatternCodeValidator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeSystemValidator for PatternCodeValidator {
    fn validate(&self, code: &str, system: &str) -> CodeVerification {
        let Some(known) = CodeSystem::parse(system) else {
            return CodeVerification::unrecognized(system);
        };
        let code = code.trim();
        match known.pattern() {
            Some(re) if re.is_match(code) => CodeVerification::valid(),
            Some(_) => CodeVerification::invalid(format!(
                "'{}' is not a valid {} code; expected {}",
                code,
                known.display_name(),
                known.expected_form()
            )),
            None => CodeVerification::invalid(format!(
                "{} pattern is unavailable",
                known.display_name()
            )),
        }
    }
}
