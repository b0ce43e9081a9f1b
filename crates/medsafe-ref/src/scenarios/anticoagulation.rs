//! Scenario 1: Anticoagulated patient on aspirin
//!
//! A clean intake for a 67-year-old on warfarin and low-dose aspirin.
//!
//! Walk-through:
//!   1. Field rules and terminology confirm the record is well formed
//!   2. The knowledge base reports warfarin + aspirin as Major
//!   3. The enrichment service reports the same pair as Moderate; the merge
//!      keeps one record at Major
//!   4. A second run is served from the enrichment cache
//!   5. No critical findings, so no alert is raised

use medsafe_contracts::error::MedsafeResult;
use medsafe_core::config::OrchestratorConfig;
use medsafe_rules::RuleCatalog;

use crate::{
    sample_data::{anticoagulated_elder, reference_time},
    wiring::reference_deployment,
};

use super::{print_report, ScenarioOutcome};

/// Run Scenario 1: warfarin + aspirin.
pub fn run_scenario(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    println!("=== Scenario 1: Anticoagulated patient on aspirin ===");
    println!();

    let deployment = reference_deployment(config.clone(), catalog)?;
    let payload = anticoagulated_elder();

    let report = deployment.orchestrator.validate_at(&payload, reference_time());
    print_report("Intake: warfarin 5 mg daily + aspirin 81 mg daily", &report);

    let lookups_before = deployment.enrichment.calls();
    let repeat = deployment.orchestrator.validate_at(&payload, reference_time());
    let lookups_after = deployment.enrichment.calls();

    println!(
        "  Repeat run:             {} interaction finding(s), {} new enrichment lookup(s), {} cached pair(s)",
        repeat.interaction_findings.len(),
        lookups_after - lookups_before,
        deployment.cache.len()
    );

    let chain_intact = deployment.alerts.verify_integrity();
    println!(
        "  Alert chain integrity:  {} ({} alert(s))",
        if chain_intact { "VERIFIED" } else { "FAILED" },
        deployment.alerts.alert_count()
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(ScenarioOutcome {
        name: "anticoagulation",
        reports: vec![report, repeat],
        alerts_recorded: deployment.alerts.alert_count(),
        chain_intact,
    })
}
