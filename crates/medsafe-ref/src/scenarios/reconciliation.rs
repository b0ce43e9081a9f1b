//! Scenario 4: Discharge reconciliation
//!
//! The home list (warfarin, lisinopril, atorvastatin, metformin) is compared
//! with the discharge list. Warfarin appears twice on discharge, once as
//! Coumadin with a new dose; atorvastatin was dropped; ibuprofen was added
//! and interacts with warfarin.

use medsafe_contracts::{error::MedsafeResult, reconciliation::ReconciliationFinding};
use medsafe_core::config::OrchestratorConfig;
use medsafe_rules::RuleCatalog;

use crate::{
    sample_data::{discharge_reconciliation, reference_time},
    wiring::reference_deployment,
};

use super::{print_report, ScenarioOutcome};

fn print_finding(finding: &ReconciliationFinding) {
    let discrepancy = finding
        .discrepancy
        .map(|d| format!("{d:?}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "    {:<12} {:<18} {:<18} conf {:.2}  {}",
        format!("{:?}", finding.action),
        finding.medication.name,
        discrepancy,
        finding.confidence,
        finding.reason
    );
    if !finding.changed_fields.is_empty() {
        println!("                 changed: {}", finding.changed_fields.join(", "));
    }
    for warning in &finding.warnings {
        println!(
            "                 warning: {} + {} ({})",
            warning.drug1,
            warning.drug2,
            warning.severity.as_str()
        );
    }
}

pub fn run_scenario(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    println!("=== Scenario 4: Discharge reconciliation ===");
    println!();

    let deployment = reference_deployment(config.clone(), catalog)?;
    let report = deployment
        .orchestrator
        .validate_at(&discharge_reconciliation(), reference_time());

    print_report("Home list vs discharge list", &report);

    println!("  Reconciliation findings:");
    for finding in report.reconciliation_findings.iter().flatten() {
        print_finding(finding);
    }
    println!();
    println!("  Scenario 4 complete.");
    println!();

    let chain_intact = deployment.alerts.verify_integrity();
    Ok(ScenarioOutcome {
        name: "reconciliation",
        reports: vec![report],
        alerts_recorded: deployment.alerts.alert_count(),
        chain_intact,
    })
}
