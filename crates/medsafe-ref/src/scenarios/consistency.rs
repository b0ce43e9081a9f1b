//! Scenario 2: Internally inconsistent records
//!
//! Two payloads that are individually well typed but contradict themselves:
//! a stated age that disagrees with the birth date, and a blood pressure with
//! systolic below diastolic. A third payload carries malformed values of every
//! kind and shows the field rules reporting each one with a suggestion.

use medsafe_contracts::error::MedsafeResult;
use medsafe_core::config::OrchestratorConfig;
use medsafe_rules::RuleCatalog;

use crate::{
    sample_data::{age_mismatch, inverted_blood_pressure, malformed_values, reference_time},
    wiring::reference_deployment,
};

use super::{print_report, ScenarioOutcome};

pub fn run_scenario(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    println!("=== Scenario 2: Internally inconsistent records ===");
    println!();

    let deployment = reference_deployment(config.clone(), catalog)?;
    let at = reference_time();

    let age = deployment.orchestrator.validate_at(&age_mismatch(), at);
    print_report("Stated age 25, born 1986-01-15", &age);

    let bp = deployment.orchestrator.validate_at(&inverted_blood_pressure(), at);
    print_report("Blood pressure 80/95", &bp);

    let malformed = deployment.orchestrator.validate_at(&malformed_values(), at);
    print_report("Malformed values", &malformed);

    let chain_intact = deployment.alerts.verify_integrity();
    println!("  Scenario 2 complete.");
    println!();

    Ok(ScenarioOutcome {
        name: "consistency",
        reports: vec![age, bp, malformed],
        alerts_recorded: deployment.alerts.alert_count(),
        chain_intact,
    })
}
