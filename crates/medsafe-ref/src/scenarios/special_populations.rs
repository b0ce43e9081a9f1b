//! Scenario 3: Special populations
//!
//! Walk-through:
//!   1. Pregnant patient with warfarin prescribed as Coumadin → Critical,
//!      alert raised
//!   2. 18-month-old prescribed Phenergan → Critical, alert raised
//!   3. Penicillin allergy with amoxicillin → allergy finding
//!   4. Fasting patient with halal restrictions on heparin and twice-daily
//!      metformin → informational notes only
//!   5. Alert chain integrity verified at the end

use medsafe_contracts::error::MedsafeResult;
use medsafe_core::config::OrchestratorConfig;
use medsafe_rules::RuleCatalog;

use crate::{
    sample_data::{
        observant_fasting_patient, pediatric_promethazine, penicillin_allergy, pregnant_on_warfarin,
        reference_time,
    },
    wiring::reference_deployment,
};

use super::{print_report, ScenarioOutcome};

pub fn run_scenario(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    println!("=== Scenario 3: Special populations ===");
    println!();

    let deployment = reference_deployment(config.clone(), catalog)?;
    let at = reference_time();

    let pregnancy = deployment.orchestrator.validate_at(&pregnant_on_warfarin(), at);
    print_report("Pregnant, 14 weeks: Coumadin 5 mg daily", &pregnancy);

    let pediatric = deployment.orchestrator.validate_at(&pediatric_promethazine(), at);
    print_report("Age 18 months: Phenergan 6.25 mg q6h", &pediatric);

    let allergy = deployment.orchestrator.validate_at(&penicillin_allergy(), at);
    print_report("Penicillin allergy: amoxicillin 500 mg tid", &allergy);

    let cultural = deployment.orchestrator.validate_at(&observant_fasting_patient(), at);
    print_report("Fasting, halal diet: heparin + metformin bid", &cultural);

    let chain_intact = deployment.alerts.verify_integrity();
    let log = deployment.alerts.export_log()?;

    println!(
        "  Alert chain integrity:  {} ({} alert(s), terminal hash {})",
        if chain_intact { "VERIFIED" } else { "FAILED" },
        log.events.len(),
        &log.terminal_hash[..12.min(log.terminal_hash.len())]
    );
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(ScenarioOutcome {
        name: "special-populations",
        reports: vec![pregnancy, pediatric, allergy, cultural],
        alerts_recorded: log.events.len(),
        chain_intact,
    })
}
