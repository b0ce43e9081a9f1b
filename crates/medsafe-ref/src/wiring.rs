//! Default assembly of the MEDSAFE pipeline.
//!
//! One `Arc<DrugKnowledgeBase>` is built and shared by the name resolver,
//! the interaction checker, the reconciliation engine, and the cross-field
//! validator.

use std::sync::Arc;

use medsafe_alerts::InMemoryAlertDispatcher;
use medsafe_contracts::error::MedsafeResult;
use medsafe_core::{
    config::OrchestratorConfig,
    orchestrator::{Stages, ValidationOrchestrator},
    traits::NameNormalizer,
};
use medsafe_pharmacy::{DrugKnowledgeBase, InteractionChecker, NameResolver, ReconciliationEngine};
use medsafe_rules::{
    codes::PatternCodeValidator, CrossFieldValidator, FieldRuleValidator, RuleCatalog, RuleEngine,
};

use crate::collaborators::{CatalogTerminologyService, InMemoryCache, StaticEnrichmentService};

/// Name the reference enrichment service reports as its record source.
pub const REFERENCE_ENRICHMENT: &str = "reference-enrichment";

/// Build the four stages from a rule catalog and a knowledge base.
///
/// Fails with `ConfigError` if `config.rule_set` is not in the catalog, or
/// `InvalidRule` if a rule in it does not compile.
pub fn build_stages(
    catalog: &RuleCatalog,
    kb: Arc<DrugKnowledgeBase>,
    config: &OrchestratorConfig,
) -> MedsafeResult<Stages> {
    let engine = RuleEngine::from_catalog(catalog, &config.rule_set, Arc::new(PatternCodeValidator::new()))?;
    let normalizer: Arc<dyn NameNormalizer> = Arc::new(NameResolver::new(Arc::clone(&kb)));

    Ok(Stages {
        fields: Box::new(FieldRuleValidator::new(engine)?),
        consistency: Box::new(CrossFieldValidator::new(Arc::clone(&normalizer))),
        interactions: Box::new(InteractionChecker::new(Arc::clone(&kb))),
        reconciler: Box::new(ReconciliationEngine::new(kb, config.reconciliation.clone())),
        normalizer,
    })
}

/// An orchestrator over the built-in rule catalog and knowledge base, with
/// no collaborators attached.
pub fn build_default_orchestrator(config: OrchestratorConfig) -> MedsafeResult<ValidationOrchestrator> {
    build_orchestrator(config, &RuleCatalog::builtin()?)
}

pub fn build_orchestrator(
    config: OrchestratorConfig,
    catalog: &RuleCatalog,
) -> MedsafeResult<ValidationOrchestrator> {
    let stages = build_stages(catalog, Arc::new(DrugKnowledgeBase::standard()), &config)?;
    Ok(ValidationOrchestrator::new(stages, config))
}

/// The orchestrator plus a handle on its alert log.
pub struct ReferenceDeployment {
    pub orchestrator: ValidationOrchestrator,
    pub alerts: InMemoryAlertDispatcher,
    pub enrichment: Arc<StaticEnrichmentService>,
    pub cache: Arc<InMemoryCache>,
}

/// The default pipeline with every reference collaborator attached.
pub fn reference_deployment(
    config: OrchestratorConfig,
    catalog: &RuleCatalog,
) -> MedsafeResult<ReferenceDeployment> {
    let alerts = InMemoryAlertDispatcher::new("medsafe-reference");
    let enrichment = Arc::new(StaticEnrichmentService::new(REFERENCE_ENRICHMENT));
    let cache = Arc::new(InMemoryCache::new());

    let orchestrator = build_orchestrator(config, catalog)?
        .with_terminology(Arc::new(CatalogTerminologyService::default()))
        .with_enrichment(enrichment.clone())
        .with_cache(cache.clone())
        .with_alerts(Arc::new(alerts.clone()));

    Ok(ReferenceDeployment {
        orchestrator,
        alerts,
        enrichment,
        cache,
    })
}
