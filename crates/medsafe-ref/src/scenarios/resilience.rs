//! Scenario 5: Collaborator outages and stage faults
//!
//! Walk-through:
//!   1. Terminology service hangs past the timeout → every diagnosis code
//!      gets a "could not verify" Error and the report fails
//!   2. Enrichment service is down → each unchecked pair is an Error
//!   3. The interaction stage itself faults and the alert dispatcher is
//!      down → Critical system failure, report still returned

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    interaction::DrugInteractionRecord,
    medication::Medication,
};
use medsafe_core::{
    config::OrchestratorConfig,
    orchestrator::ValidationOrchestrator,
    traits::InteractionScreen,
};
use medsafe_pharmacy::DrugKnowledgeBase;
use medsafe_rules::RuleCatalog;

use crate::{
    collaborators::{CatalogTerminologyService, UnavailableService},
    sample_data::{anticoagulated_elder, observant_fasting_patient, pregnant_on_warfarin, reference_time},
    wiring::{build_orchestrator, build_stages},
};

use super::{print_report, ScenarioOutcome};

/// Upper bound on the collaborator timeout used here, so the hung service
/// does not stall the demo.
const SCENARIO_TIMEOUT_MS: u64 = 100;

/// An interaction screen whose backing store has gone away.
struct FaultyScreen;

impl InteractionScreen for FaultyScreen {
    fn screen(
        &self,
        _medications: &[Medication],
        _allergies: &[String],
        _at: DateTime<Utc>,
    ) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        Err(MedsafeError::SystemFailure {
            reason: "interaction table could not be read".to_string(),
        })
    }
}

pub fn run_scenario(config: &OrchestratorConfig, catalog: &RuleCatalog) -> MedsafeResult<ScenarioOutcome> {
    println!("=== Scenario 5: Collaborator outages and stage faults ===");
    println!();

    let mut config = config.clone();
    config.collaborator_timeout_ms = config.collaborator_timeout_ms.min(SCENARIO_TIMEOUT_MS);
    let at = reference_time();
    let hang = Duration::from_millis(config.collaborator_timeout_ms * 3);

    let hung_terminology = build_orchestrator(config.clone(), catalog)?
        .with_terminology(Arc::new(UnavailableService::new("terminology").after(hang)));
    let terminology_down = hung_terminology.validate_at(&anticoagulated_elder(), at);
    print_report("Terminology service hung", &terminology_down);

    let no_enrichment = build_orchestrator(config.clone(), catalog)?
        .with_terminology(Arc::new(CatalogTerminologyService::default()))
        .with_enrichment(Arc::new(UnavailableService::new("interaction-enrichment")));
    let enrichment_down = no_enrichment.validate_at(&observant_fasting_patient(), at);
    print_report("Enrichment service down", &enrichment_down);

    let mut stages = build_stages(catalog, Arc::new(DrugKnowledgeBase::standard()), &config)?;
    stages.interactions = Box::new(FaultyScreen);
    let faulted = ValidationOrchestrator::new(stages, config)
        .with_alerts(Arc::new(UnavailableService::new("pager")));
    let stage_fault = faulted.validate_at(&pregnant_on_warfarin(), at);
    print_report("Interaction stage fault, alert dispatcher down", &stage_fault);

    println!("  Scenario 5 complete.");
    println!();

    Ok(ScenarioOutcome {
        name: "resilience",
        reports: vec![terminology_down, enrichment_down, stage_fault],
        alerts_recorded: 0,
        chain_intact: true,
    })
}
