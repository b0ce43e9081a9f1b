//! End-to-end demo scenarios.
//!
//! Each scenario wires the reference deployment, validates one or more
//! sample payloads at the fixed reference time, prints a walk-through, and
//! returns what happened so tests can assert on it.

pub mod anticoagulation;
pub mod consistency;
pub mod reconciliation;
pub mod resilience;
pub mod special_populations;

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    report::ValidationReport,
};
use medsafe_core::config::OrchestratorConfig;
use medsafe_rules::RuleCatalog;

/// Scenario names accepted by [`run_named`], in run order.
pub const SCENARIOS: &[&str] = &[
    "anticoagulation",
    "consistency",
    "special-populations",
    "reconciliation",
    "resilience",
];

/// What a scenario run produced.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: &'static str,
    pub reports: Vec<ValidationReport>,
    /// Alerts in the reference dispatcher's log after the run.
    pub alerts_recorded: usize,
    /// Whether the alert hash chain verified at the end.
    pub chain_intact: bool,
}

pub fn run_named(name: &str, config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    match name {
        "anticoagulation" => anticoagulation::run_scenario(config, catalog),
        "consistency" => consistency::run_scenario(config, catalog),
        "special-populations" => special_populations::run_scenario(config, catalog),
        "reconciliation" => reconciliation::run_scenario(config, catalog),
        "resilience" => resilience::run_scenario(config, catalog),
        other => Err(MedsafeError::ConfigError {
            reason: format!("unknown scenario '{other}'; expected one of {}", SCENARIOS.join(", ")),
        }),
    }
}

pub fn run_all(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<Vec<ScenarioOutcome>> {
    SCENARIOS
        .iter()
        .map(|name| run_named(name, config, catalog))
        .collect()
}

/// Print the verdict and every issue in `report`.
pub(crate) fn print_report(label: &str, report: &ValidationReport) {
    let summary = &report.summary;
    println!("  {label}");
    println!(
        "    Verdict:        {} ({} issue(s), {} critical, {} warning(s))",
        if summary.passed { "PASSED" } else { "FAILED" },
        summary.total_issues,
        summary.critical_issues,
        summary.warnings
    );

    for issue in report.issues() {
        println!(
            "    [{:<8}] {:<28} {} ({})",
            issue.severity.as_str(),
            issue.field,
            issue.message,
            issue.rule
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("               suggestion: {suggestion}");
        }
    }

    for finding in &report.interaction_findings {
        println!(
            "    [{:<8}] {} + {}: {} (source: {})",
            finding.severity.as_str(),
            finding.drug1,
            finding.drug2,
            finding.description,
            finding.source
        );
    }
    println!();
}
