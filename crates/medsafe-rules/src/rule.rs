//! Field rule definitions and the TOML rule catalog.
//!
//! A `RuleCatalog` is deserialized from TOML. It holds every rule definition
//! plus a table of named rule sets. Both are checked when the catalog is
//! loaded: duplicate rule ids and rule-set entries naming unknown rules are
//! rejected up front.
//!
//! ```toml
//! [[rules]]
//! id = "patient_age_range"
//! field = "patient.age"
//! category = "range"
//! severity = "error"
//! description = "Age must be between 0 and 150 years"
//! check = { type = "range", min = 0.0, max = 150.0 }
//!
//! [rule_sets]
//! intake = ["patient_age_range"]
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    severity::Severity,
    validation::{Gender, RuleCategory, ValidationContext},
};

/// The catalog shipped with the crate.
pub const DEFAULT_CATALOG: &str = include_str!("../rules/default.toml");

/// Context predicate gating a `Required` rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredWhen {
    #[default]
    Always,
    Pregnant,
    Female,
    AgeBelow { years: f64 },
    Setting { name: String },
}

impl RequiredWhen {
    /// True if the requirement applies to this patient.
    pub fn applies(&self, ctx: &ValidationContext) -> bool {
        match self {
            RequiredWhen::Always => true,
            RequiredWhen::Pregnant => ctx.pregnant,
            RequiredWhen::Female => ctx.gender == Gender::Female,
            RequiredWhen::AgeBelow { years } => ctx.age.is_some_and(|age| age < *years),
            RequiredWhen::Setting { name } => ctx
                .clinical_setting
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(name)),
        }
    }
}

/// What a rule checks.
///
/// Expressed in TOML as an inline table tagged by `type`:
/// ```toml
/// check = { type = "required", when = "pregnant" }
/// check = { type = "format", pattern = "^[MF]$", expected = "M or F" }
/// check = { type = "range", min = 50.0, max = 250.0 }
/// check = { type = "date", allow_future = false, min = "1900-01-01" }
/// check = { type = "code", system = "ICD-10" }
/// check = { type = "custom", function = "weight_for_age" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCheck {
    /// The field must be present, non-null, and not an empty string.
    Required {
        #[serde(default)]
        when: RequiredWhen,
    },

    /// A string value must match `pattern`.
    Format {
        pattern: String,
        /// Human-readable description of the expected form.
        expected: String,
        #[serde(default)]
        example: Option<String>,
    },

    /// A numeric value (or numeric string) must lie within the bounds.
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default = "default_inclusive")]
        inclusive: bool,
    },

    /// A `YYYY-MM-DD` or RFC 3339 date, not in the future unless allowed.
    Date {
        #[serde(default)]
        allow_future: bool,
        #[serde(default)]
        min: Option<String>,
        #[serde(default)]
        max: Option<String>,
    },

    /// A code in a named code system. The value is either a bare code or an
    /// object `{ code, system }`; a bare code takes its system from here.
    Code {
        #[serde(default)]
        system: Option<String>,
    },

    /// Delegates to a function registered on the engine by name.
    Custom { function: String },
}

fn default_inclusive() -> bool {
    true
}

/// A single field rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Stable identifier; appears as `rule` on every result this rule emits.
    pub id: String,
    pub category: RuleCategory,
    /// Severity of a failing result. Malformed input is always reported at
    /// `Error` or above regardless of this value.
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    pub check: RuleCheck,
}

impl FieldRule {
    pub fn new(id: impl Into<String>, category: RuleCategory, severity: Severity, check: RuleCheck) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            description: String::new(),
            check,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A rule together with the field pattern it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Dotted path with optional `[*]` wildcards, e.g. `medications[*].dose`.
    pub field: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// The top-level structure deserialized from a TOML rule catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleCatalog {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    /// Rule-set name → rule ids.
    #[serde(default)]
    pub rule_sets: BTreeMap<String, Vec<String>>,
}

impl RuleCatalog {
    /// Parse `s` as a TOML rule catalog.
    ///
    /// Returns `MedsafeError::ConfigError` if the TOML is malformed, a rule
    /// id is declared twice, or a rule set names a rule that does not exist.
    pub fn from_toml_str(s: &str) -> MedsafeResult<Self> {
        let catalog: RuleCatalog = toml::from_str(s).map_err(|e| MedsafeError::ConfigError {
            reason: format!("failed to parse rule catalog TOML: {}", e),
        })?;
        catalog.check_references()?;
        Ok(catalog)
    }

    /// Read the file at `path` and parse it as a rule catalog.
    pub fn from_file(path: &Path) -> MedsafeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedsafeError::ConfigError {
            reason: format!("failed to read rule catalog '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The catalog embedded in this crate.
    pub fn builtin() -> MedsafeResult<Self> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    /// Definitions in the named rule set, in catalog order.
    pub fn rule_set(&self, name: &str) -> MedsafeResult<Vec<&RuleDefinition>> {
        let ids = self.rule_sets.get(name).ok_or_else(|| MedsafeError::ConfigError {
            reason: format!(
                "unknown rule set '{}' (known: {})",
                name,
                self.rule_sets.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        })?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .rules
            .iter()
            .filter(|d| wanted.contains(d.rule.id.as_str()))
            .collect())
    }

    fn check_references(&self) -> MedsafeResult<()> {
        let mut ids = HashSet::new();
        for def in &self.rules {
            if !ids.insert(def.rule.id.as_str()) {
                return Err(MedsafeError::ConfigError {
                    reason: format!("rule id '{}' is declared more than once", def.rule.id),
                });
            }
        }
        for (set, members) in &self.rule_sets {
            if let Some(missing) = members.iter().find(|id| !ids.contains(id.as_str())) {
                return Err(MedsafeError::ConfigError {
                    reason: format!("rule set '{}' references unknown rule '{}'", set, missing),
                });
            }
        }
        Ok(())
    }
}
