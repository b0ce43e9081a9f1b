//! The field rule engine.
//!
//! `RuleEngine` holds every registered rule keyed by field pattern and
//! evaluates them against values from the raw JSON payload. Evaluation never
//! fails: a value of the wrong shape becomes an Error-severity result.
//!
//! Rules are validated when they are registered. A regex that does not
//! compile, inverted bounds, or an unparseable date bound are rejected with
//! `MedsafeError::InvalidRule` before the engine ever runs.
//!
//! Custom rules delegate to named functions registered via
//! `register_function`. An unregistered name is itself a failing result so
//! misconfigured catalogs surface immediately.

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    lenient::as_number,
    report::FieldResults,
    severity::Severity,
    validation::{parse_date, ValidationContext, ValidationResult},
};
use medsafe_core::traits::CodeSystemValidator;

use crate::{
    codes::PatternCodeValidator,
    path::FieldPath,
    rule::{FieldRule, RuleCatalog, RuleCheck},
};

/// A caller-supplied field check.
///
/// Receives the field value and the patient context. Returns `Some(message)`
/// when the check fails, or `None` on success.
pub type CustomRuleFn = Box<dyn Fn(&Value, &ValidationContext) -> Option<String> + Send + Sync>;

/// A rule with its pattern and bounds pre-parsed.
struct CompiledRule {
    rule: FieldRule,
    regex: Option<Regex>,
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
}

/// Rules registered against one field pattern.
struct FieldEntry {
    path: FieldPath,
    rules: Vec<CompiledRule>,
}

/// The MEDSAFE field rule engine.
pub struct RuleEngine {
    /// Registration order is preserved so reports read predictably.
    fields: Vec<FieldEntry>,
    functions: HashMap<String, CustomRuleFn>,
    codes: Arc<dyn CodeSystemValidator>,
}

impl RuleEngine {
    /// Create an engine with no rules, using `codes` for `Code` rules.
    pub fn new(codes: Arc<dyn CodeSystemValidator>) -> Self {
        Self {
            fields: Vec::new(),
            functions: HashMap::new(),
            codes,
        }
    }

    /// Build an engine from the named rule set in `catalog`.
    ///
    /// Returns `ConfigError` for an unknown rule set and `InvalidRule` for
    /// the first definition that does not compile.
    pub fn from_catalog(
        catalog: &RuleCatalog,
        rule_set: &str,
        codes: Arc<dyn CodeSystemValidator>,
    ) -> MedsafeResult<Self> {
        let mut engine = Self::new(codes);
        for def in catalog.rule_set(rule_set)? {
            engine.register(&def.field, def.rule.clone())?;
        }
        debug!(rule_set, rules = engine.rule_count(), "rule engine built from catalog");
        Ok(engine)
    }

    /// Register `rule` against the field pattern `field`.
    ///
    /// Many rules may share one field. Rules are immutable once registered.
    pub fn register(&mut self, field: &str, rule: FieldRule) -> MedsafeResult<()> {
        let invalid = |reason: String| MedsafeError::InvalidRule {
            rule_id: rule.id.clone(),
            reason,
        };

        if rule.id.trim().is_empty() {
            return Err(invalid("rule id must not be empty".to_string()));
        }

        let path = FieldPath::parse(field).map_err(|e| invalid(e.to_string()))?;

        let mut regex = None;
        let mut min_date = None;
        let mut max_date = None;

        match &rule.check {
            RuleCheck::Required { .. } => {}
            RuleCheck::Format { pattern, .. } => {
                regex = Some(
                    Regex::new(pattern).map_err(|e| invalid(format!("pattern does not compile: {e}")))?,
                );
            }
            RuleCheck::Range { min, max, .. } => {
                if min.is_none() && max.is_none() {
                    return Err(invalid("range needs at least one bound".to_string()));
                }
                if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
                    return Err(invalid("range bounds must be numbers".to_string()));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(invalid(format!("inverted range: min {lo} > max {hi}")));
                    }
                }
            }
            RuleCheck::Date { min, max, .. } => {
                let parse_bound = |s: &String, which: &str| {
                    parse_date(s).ok_or_else(|| invalid(format!("{which} date '{s}' is not a valid date")))
                };
                min_date = min.as_ref().map(|s| parse_bound(s, "min")).transpose()?;
                max_date = max.as_ref().map(|s| parse_bound(s, "max")).transpose()?;
                if let (Some(lo), Some(hi)) = (min_date, max_date) {
                    if lo > hi {
                        return Err(invalid(format!("inverted date range: {lo} > {hi}")));
                    }
                }
            }
            RuleCheck::Code { system } => {
                if system.as_deref().is_some_and(|s| s.trim().is_empty()) {
                    return Err(invalid("code system must not be empty".to_string()));
                }
            }
            RuleCheck::Custom { function } => {
                if function.trim().is_empty() {
                    return Err(invalid("custom rule needs a function name".to_string()));
                }
            }
        }

        let compiled = CompiledRule { rule, regex, min_date, max_date };
        match self.fields.iter_mut().find(|e| e.path.pattern() == field) {
            Some(entry) => entry.rules.push(compiled),
            None => self.fields.push(FieldEntry { path, rules: vec![compiled] }),
        }
        Ok(())
    }

    /// Register a custom rule function under `name`.
    ///
    /// Registering the same name twice replaces the previous function.
    pub fn register_function(&mut self, name: impl Into<String>, f: CustomRuleFn) {
        self.functions.insert(name.into(), f);
    }

    pub fn rule_count(&self) -> usize {
        self.fields.iter().map(|e| e.rules.len()).sum()
    }

    /// Field patterns with at least one rule, in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|e| e.path.pattern())
    }

    /// Run every rule registered for `field` against `value`.
    ///
    /// `field` is used both to look up the rules and as the reported path;
    /// use [`RuleEngine::validate_payload`] to expand wildcard patterns.
    pub fn evaluate(&self, field: &str, value: Option<&Value>, ctx: &ValidationContext) -> Vec<ValidationResult> {
        self.fields
            .iter()
            .find(|e| e.path.pattern() == field)
            .map(|entry| self.evaluate_entry(entry, field, value, ctx))
            .unwrap_or_default()
    }

    /// Resolve every registered pattern against `payload` and evaluate the
    /// rules at each concrete location.
    pub fn validate_payload(&self, payload: &Value, ctx: &ValidationContext) -> FieldResults {
        let mut results = FieldResults::new();
        for entry in &self.fields {
            for location in entry.path.resolve(payload) {
                let found = self.evaluate_entry(entry, &location.path, location.value, ctx);
                if !found.is_empty() {
                    results.entry(location.path).or_default().extend(found);
                }
            }
        }
        results
    }

    fn evaluate_entry(
        &self,
        entry: &FieldEntry,
        path: &str,
        value: Option<&Value>,
        ctx: &ValidationContext,
    ) -> Vec<ValidationResult> {
        let mut out = Vec::new();
        for compiled in &entry.rules {
            if let Some(result) = self.apply(compiled, path, value, ctx) {
                if !result.is_valid {
                    warn!(field = %path, rule = %compiled.rule.id, severity = %result.severity, "field rule failed");
                }
                out.push(result);
            }
        }
        out
    }

    /// Evaluate one rule. `None` means the rule does not apply here.
    fn apply(
        &self,
        compiled: &CompiledRule,
        path: &str,
        value: Option<&Value>,
        ctx: &ValidationContext,
    ) -> Option<ValidationResult> {
        // An explicit null is the same as a missing field.
        let value = value.filter(|v| !v.is_null());
        let rule = &compiled.rule;
        let at = ctx.reference_time;
        let pass = |message: String| ValidationResult::pass(path, &rule.id, rule.category, message, at);
        let fail = |message: String| ValidationResult::fail(path, &rule.id, rule.category, rule.severity, message, at);
        // Malformed input is never reported below Error.
        let malformed = |message: String| {
            ValidationResult::fail(
                path,
                &rule.id,
                rule.category,
                rule.severity.merge(Severity::Error),
                message,
                at,
            )
        };

        if let RuleCheck::Required { when } = &rule.check {
            if !when.applies(ctx) {
                return None;
            }
            let present = match value {
                None => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(Value::Array(items)) => !items.is_empty(),
                Some(Value::Object(fields)) => !fields.is_empty(),
                Some(_) => true,
            };
            return Some(if present {
                pass(format!("{path} is present"))
            } else {
                fail(format!("{path} is required"))
                    .with_suggestion(format!("provide a value for {path}"))
            });
        }

        // Absence is the Required rule's concern.
        let value = value?;

        let result = match &rule.check {
            RuleCheck::Required { .. } => return None,

            RuleCheck::Format { expected, example, .. } => match (value.as_str(), &compiled.regex) {
                (Some(s), Some(re)) if re.is_match(s.trim()) => pass(format!("{path} has a valid format")),
                (Some(s), _) => {
                    let r = fail(format!("'{s}' is not a valid {expected}"));
                    match example {
                        Some(ex) => r.with_suggestion(format!("use the form {ex}")),
                        None => r,
                    }
                }
                (None, _) => malformed(format!("{path} must be text ({expected}), got {value}")),
            },

            RuleCheck::Range { min, max, inclusive } => match as_number(value) {
                None => malformed(format!("{path} must be numeric, got {value}")),
                Some(n) => {
                    let below = min.is_some_and(|lo| if *inclusive { n < lo } else { n <= lo });
                    let above = max.is_some_and(|hi| if *inclusive { n > hi } else { n >= hi });
                    if below || above {
                        fail(format!("{path} value {n} is outside {}", describe_range(*min, *max, *inclusive)))
                            .with_suggestion(format!(
                                "confirm the value; expected {}",
                                describe_range(*min, *max, *inclusive)
                            ))
                    } else {
                        pass(format!("{path} is within range"))
                    }
                }
            },

            RuleCheck::Date { allow_future, .. } => match value.as_str().and_then(parse_date) {
                None => malformed(format!("{path} must be a date (YYYY-MM-DD or RFC 3339), got {value}"))
                    .with_suggestion("use the form 2024-01-31"),
                Some(date) => {
                    let today = ctx.reference_time.date_naive();
                    if !allow_future && date > today {
                        fail(format!("{path} date {date} is in the future"))
                    } else if compiled.min_date.is_some_and(|lo| date < lo) {
                        fail(format!("{path} date {date} is before {}", fmt_date(compiled.min_date)))
                    } else if compiled.max_date.is_some_and(|hi| date > hi) {
                        fail(format!("{path} date {date} is after {}", fmt_date(compiled.max_date)))
                    } else {
                        pass(format!("{path} is a valid date"))
                    }
                }
            },

            RuleCheck::Code { system } => self.check_code(path, rule, value, system.as_deref(), at),

            RuleCheck::Custom { function } => match self.functions.get(function.as_str()) {
                Some(f) => match f(value, ctx) {
                    Some(message) => fail(message),
                    None => pass(format!("{path} satisfies {function}")),
                },
                None => malformed(format!("no custom rule function registered as '{function}'")),
            },
        };

        Some(result)
    }

    fn check_code(
        &self,
        path: &str,
        rule: &FieldRule,
        value: &Value,
        default_system: Option<&str>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> ValidationResult {
        let (code, system) = match value {
            Value::String(code) => (Some(code.as_str()), default_system),
            Value::Object(map) => (
                map.get("code").and_then(Value::as_str),
                map.get("system").and_then(Value::as_str).or(default_system),
            ),
            _ => (None, default_system),
        };

        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            return ValidationResult::fail(
                path,
                &rule.id,
                rule.category,
                rule.severity.merge(Severity::Error),
                format!("{path} does not contain a code"),
                at,
            );
        };

        let Some(system) = system.filter(|s| !s.trim().is_empty()) else {
            return ValidationResult::fail(
                path,
                &rule.id,
                rule.category,
                Severity::Warning,
                format!("could not verify code '{code}': no code system given"),
                at,
            )
            .with_suggestion("state the code system, e.g. ICD-10 or SNOMED CT");
        };

        let verification = self.codes.validate(code, system);
        if verification.is_valid {
            ValidationResult::pass(path, &rule.id, rule.category, format!("{system} code '{code}' is well formed"), at)
        } else if !verification.recognized_system {
            ValidationResult::fail(
                path,
                &rule.id,
                rule.category,
                Severity::Warning,
                format!("could not verify code '{code}': code system '{system}' is not recognized"),
                at,
            )
        } else {
            ValidationResult::fail(path, &rule.id, rule.category, rule.severity, verification.issues.join("; "), at)
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(Arc::new(PatternCodeValidator::new()))
    }
}

fn describe_range(min: Option<f64>, max: Option<f64>, inclusive: bool) -> String {
    let (lo, hi) = if inclusive { ("≥", "≤") } else { (">", "<") };
    match (min, max) {
        (Some(a), Some(b)) if inclusive => format!("[{a}, {b}]"),
        (Some(a), Some(b)) => format!("({a}, {b})"),
        (Some(a), None) => format!("{lo} {a}"),
        (None, Some(b)) => format!("{hi} {b}"),
        (None, None) => "any value".to_string(),
    }
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
