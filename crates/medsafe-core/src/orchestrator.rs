//! The MEDSAFE orchestrator: fail-closed composition of the validation stages.
//!
//! One call to [`ValidationOrchestrator::validate`] runs:
//!
//!   parse → {field rules ∥ cross-field ∥ interactions ∥ reconciliation}
//!         → terminology + enrichment → merge → summary → alert
//!
//! The four stages are pure and run concurrently on scoped threads; joining
//! them is the only synchronization point. Collaborator calls are bounded by
//! the configured timeout.
//!
//! The safety invariant is absolute: a report never passes unless every
//! stage completed. A stage that errors or panics is replaced by a synthetic
//! Critical `system_failure` result, and an unavailable collaborator becomes
//! an Error result for the check it was supporting.
//!
//! Dropping a `validate` call is safe at any point before the alert
//! dispatcher has been handed the report. After that the notification stands.

use std::{any::Any, collections::BTreeSet, sync::Arc, thread};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    interaction::{merge_interactions, DrugInteractionRecord, PairKey},
    medication::Medication,
    payload::PatientPayload,
    reconciliation::ReconciliationFinding,
    report::{FieldResults, ValidationReport, ValidationSummary},
    severity::Severity,
    validation::{RuleCategory, ValidationContext, ValidationResult},
};

use crate::{
    config::OrchestratorConfig,
    timeout::call_with_timeout,
    traits::{
        AlertDispatcher, CacheService, ConsistencyValidator, FieldValidator,
        InteractionEnrichmentService, InteractionScreen, MedicationReconciler, NameNormalizer,
        TerminologyService,
    },
};

/// The four pure stages plus the shared name normalizer.
pub struct Stages {
    pub fields: Box<dyn FieldValidator>,
    pub consistency: Box<dyn ConsistencyValidator>,
    pub interactions: Box<dyn InteractionScreen>,
    pub reconciler: Box<dyn MedicationReconciler>,
    pub normalizer: Arc<dyn NameNormalizer>,
}

/// Composes the stages and collaborators into one validation call.
///
/// Collaborators are optional; a missing collaborator simply skips the
/// enrichment it provides. A configured collaborator that fails never does.
pub struct ValidationOrchestrator {
    stages: Stages,
    terminology: Option<Arc<dyn TerminologyService>>,
    enrichment: Option<Arc<dyn InteractionEnrichmentService>>,
    cache: Option<Arc<dyn CacheService>>,
    alerts: Option<Arc<dyn AlertDispatcher>>,
    config: OrchestratorConfig,
}

/// What each stage produced, or `None` if it failed.
struct StageOutputs {
    fields: Option<FieldResults>,
    cross_field: Option<Vec<ValidationResult>>,
    interactions: Option<Vec<DrugInteractionRecord>>,
    reconciliation: Option<Vec<ReconciliationFinding>>,
}

impl ValidationOrchestrator {
    /// Create an orchestrator with no collaborators attached.
    pub fn new(stages: Stages, config: OrchestratorConfig) -> Self {
        Self {
            stages,
            terminology: None,
            enrichment: None,
            cache: None,
            alerts: None,
            config,
        }
    }

    pub fn with_terminology(mut self, service: Arc<dyn TerminologyService>) -> Self {
        self.terminology = Some(service);
        self
    }

    pub fn with_enrichment(mut self, service: Arc<dyn InteractionEnrichmentService>) -> Self {
        self.enrichment = Some(service);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheService>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_alerts(mut self, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        self.alerts = Some(dispatcher);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validate `payload` with the current time as reference.
    pub fn validate(&self, payload: &Value) -> ValidationReport {
        self.validate_at(payload, Utc::now())
    }

    /// Validate `payload` against a fixed reference time.
    ///
    /// Never fails: every fault is folded into the report, and any fault
    /// forces `summary.passed = false`.
    pub fn validate_at(&self, payload: &Value, reference_time: DateTime<Utc>) -> ValidationReport {
        let run_id = Uuid::new_v4();
        debug!(run_id = %run_id, "validation run starting");

        let mut field_results = FieldResults::new();

        let typed = match PatientPayload::from_value(payload) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "payload could not be parsed");
                field_results.entry("payload".to_string()).or_default().push(
                    ValidationResult::fail(
                        "payload",
                        "payload_parse",
                        RuleCategory::Format,
                        Severity::Error,
                        format!("payload could not be interpreted: {e}"),
                        reference_time,
                    )
                    .with_suggestion("send a JSON object with patient, medications, labResults, vitals, and diagnoses"),
                );
                None
            }
        };

        let ctx = match &typed {
            Some(p) => ValidationContext::from_payload(p, reference_time),
            None => ValidationContext::empty(reference_time),
        };

        let mut system_failures: Vec<ValidationResult> = Vec::new();
        let outputs = self.run_stages(payload, typed.as_ref(), &ctx, &mut system_failures);

        if let Some(fields) = outputs.fields {
            for (field, results) in fields {
                field_results.entry(field).or_default().extend(results);
            }
        }

        let cross_field_results = outputs.cross_field.unwrap_or_default();

        let mut interactions = outputs.interactions.unwrap_or_default();

        if let Some(p) = &typed {
            for (field, result) in self.verify_terminology(p, reference_time) {
                field_results.entry(field).or_default().push(result);
            }

            if let Some(enrichment) = &self.enrichment {
                let (enriched, degraded) = self.enrich(enrichment, &p.medications, reference_time);
                interactions.extend(enriched);
                if !degraded.is_empty() {
                    field_results
                        .entry("interactions".to_string())
                        .or_default()
                        .extend(degraded);
                }
            }
        }
        let interaction_findings = merge_interactions(interactions);

        if !system_failures.is_empty() {
            field_results
                .entry("system".to_string())
                .or_default()
                .extend(system_failures);
        }

        let reconciliation_findings = outputs.reconciliation;

        let summary = ValidationSummary::compute(
            &field_results,
            &cross_field_results,
            &interaction_findings,
            reconciliation_findings.as_deref(),
        );

        let report = ValidationReport {
            run_id,
            generated_at: reference_time,
            field_results,
            cross_field_results,
            interaction_findings,
            reconciliation_findings,
            summary,
        };

        info!(
            run_id = %run_id,
            passed = report.summary.passed,
            total_issues = report.summary.total_issues,
            critical_issues = report.summary.critical_issues,
            "validation run complete"
        );

        if report.has_critical() && self.config.alert_on_critical {
            self.dispatch_alert(&report);
        }

        report
    }

    /// Screen a medication list against itself and the allergy list.
    ///
    /// Includes enrichment when a service is attached; an enrichment failure
    /// is returned as an error rather than silently dropping that source.
    pub fn check_interactions(
        &self,
        medications: &[Medication],
        allergies: &[String],
    ) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        let at = Utc::now();
        let mut records = self.stages.interactions.screen(medications, allergies, at)?;

        if let Some(enrichment) = &self.enrichment {
            for (a, b) in self.normalized_pairs(medications) {
                records.extend(self.lookup_pair(enrichment, &a, &b)?);
            }
        }

        Ok(merge_interactions(records))
    }

    /// Reconcile two medication lists outside of a full validation run.
    pub fn reconcile(
        &self,
        current: &[Medication],
        incoming: &[Medication],
        ctx: &ValidationContext,
    ) -> MedsafeResult<Vec<ReconciliationFinding>> {
        self.stages.reconciler.reconcile(current, incoming, ctx)
    }

    // ── Stage execution ──────────────────────────────────────────────────────

    fn run_stages(
        &self,
        payload: &Value,
        typed: Option<&PatientPayload>,
        ctx: &ValidationContext,
        failures: &mut Vec<ValidationResult>,
    ) -> StageOutputs {
        let at = ctx.reference_time;
        let stages = &self.stages;

        let joined = thread::scope(|s| {
            let fields = s.spawn(|| stages.fields.validate_fields(payload, ctx));

            let cross_field = typed.map(|p| s.spawn(move || stages.consistency.validate(p, ctx)));

            let interactions = typed.map(|p| {
                s.spawn(move || stages.interactions.screen(&p.medications, &ctx.allergies, at))
            });

            let reconciliation = typed.and_then(|p| {
                p.incoming_medications.as_ref().map(|incoming| {
                    s.spawn(move || stages.reconciler.reconcile(&p.medications, incoming, ctx))
                })
            });

            (
                fields.join(),
                cross_field.map(|h| h.join()),
                interactions.map(|h| h.join()),
                reconciliation.map(|h| h.join()),
            )
        });

        let (fields, cross_field, interactions, reconciliation) = joined;

        StageOutputs {
            fields: settle("field-rules", fields, failures, at),
            cross_field: cross_field.and_then(|j| settle("cross-field", j, failures, at)),
            interactions: interactions.and_then(|j| settle("interactions", j, failures, at)),
            reconciliation: reconciliation.and_then(|j| settle("reconciliation", j, failures, at)),
        }
    }

    // ── Collaborators ────────────────────────────────────────────────────────

    /// Check each coded diagnosis with the terminology service.
    ///
    /// Invalid codes become Error results; an unavailable service becomes an
    /// Error "could not verify" result for every code it could not check.
    fn verify_terminology(
        &self,
        payload: &PatientPayload,
        at: DateTime<Utc>,
    ) -> Vec<(String, ValidationResult)> {
        let Some(terminology) = &self.terminology else {
            return Vec::new();
        };

        let timeout = self.config.collaborator_timeout();
        let mut results = Vec::new();

        for (idx, diagnosis) in payload.diagnoses.iter().enumerate() {
            let (Some(code), Some(system)) = (diagnosis.code.clone(), diagnosis.system.clone()) else {
                continue;
            };
            let field = format!("diagnoses[{idx}].code");
            let service = Arc::clone(terminology);
            let (c, sys) = (code.clone(), system.clone());

            let result = match call_with_timeout("terminology", timeout, move || {
                service.validate_code(&c, &sys)
            }) {
                Ok(verification) if verification.is_valid => ValidationResult::pass(
                    field.clone(),
                    "terminology_verification",
                    RuleCategory::Regulatory,
                    format!("{system} code '{code}' confirmed by terminology service"),
                    at,
                ),
                Ok(verification) => ValidationResult::fail(
                    field.clone(),
                    "terminology_verification",
                    RuleCategory::Regulatory,
                    Severity::Error,
                    format!(
                        "{system} code '{code}' rejected by terminology service: {}",
                        verification.issues.join("; ")
                    ),
                    at,
                ),
                Err(e) => {
                    warn!(field = %field, error = %e, "terminology verification unavailable");
                    ValidationResult::fail(
                        field.clone(),
                        "terminology_verification",
                        RuleCategory::Regulatory,
                        Severity::Error,
                        format!("could not verify {system} code '{code}': {e}"),
                        at,
                    )
                    .with_suggestion("verify the code manually before relying on this report")
                }
            };
            results.push((field, result));
        }

        results
    }

    /// Query the enrichment service for every medication pair.
    ///
    /// Returns the extra records and one Error result per pair that could not
    /// be checked. After the first failed lookup the service is not called
    /// again for this run; the remaining pairs are served from the cache or
    /// reported as unverified.
    fn enrich(
        &self,
        enrichment: &Arc<dyn InteractionEnrichmentService>,
        medications: &[Medication],
        at: DateTime<Utc>,
    ) -> (Vec<DrugInteractionRecord>, Vec<ValidationResult>) {
        let mut records = Vec::new();
        let mut degraded = Vec::new();
        let mut outage: Option<String> = None;

        for (a, b) in self.normalized_pairs(medications) {
            let lookup = match &outage {
                None => self.lookup_pair(enrichment, &a, &b),
                Some(reason) => self.cached_pair(&a, &b).ok_or_else(|| MedsafeError::CollaboratorUnavailable {
                    service: enrichment.name().to_string(),
                    reason: format!("skipped after earlier failure: {reason}"),
                }),
            };

            match lookup {
                Ok(found) => records.extend(found),
                Err(e) => {
                    if outage.is_none() {
                        warn!(drug_a = %a, drug_b = %b, error = %e, "interaction enrichment unavailable");
                        outage = Some(e.to_string());
                    }
                    degraded.push(
                        ValidationResult::fail(
                            "interactions",
                            "interaction_enrichment",
                            RuleCategory::Safety,
                            Severity::Error,
                            format!(
                                "could not verify {a} + {b} against {}: {e}",
                                enrichment.name()
                            ),
                            at,
                        )
                        .with_suggestion("only the built-in knowledge base was consulted for this pair"),
                    );
                }
            }
        }

        if !degraded.is_empty() {
            warn!(unverified_pairs = degraded.len(), "enrichment incomplete for this run");
        }
        (records, degraded)
    }

    /// Unique unordered pairs of normalized medication names.
    fn normalized_pairs(&self, medications: &[Medication]) -> Vec<(String, String)> {
        let names: BTreeSet<String> = medications
            .iter()
            .map(|m| self.stages.normalizer.normalize_medication(m))
            .filter(|n| !n.is_empty())
            .collect();
        let names: Vec<String> = names.into_iter().collect();

        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                pairs.push((names[i].clone(), names[j].clone()));
            }
        }
        pairs
    }

    /// Records cached for this pair, if any. Cache failures count as a miss.
    fn cached_pair(&self, a: &str, b: &str) -> Option<Vec<DrugInteractionRecord>> {
        let cache = Arc::clone(self.cache.as_ref()?);
        let key = cache_key(a, b);

        match call_with_timeout("cache", self.config.collaborator_timeout(), move || cache.get(&key)) {
            Ok(Some(value)) => match serde_json::from_value::<Vec<DrugInteractionRecord>>(value) {
                Ok(records) => {
                    debug!(drug_a = %a, drug_b = %b, "enrichment cache hit");
                    Some(records)
                }
                Err(e) => {
                    warn!(error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cache read failed; falling back to direct lookup");
                None
            }
        }
    }

    /// Cached enrichment lookup for one pair.
    ///
    /// Cache failures degrade to an uncached lookup; only the lookup itself
    /// can fail the pair.
    fn lookup_pair(
        &self,
        enrichment: &Arc<dyn InteractionEnrichmentService>,
        a: &str,
        b: &str,
    ) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        if let Some(records) = self.cached_pair(a, b) {
            return Ok(records);
        }

        let timeout = self.config.collaborator_timeout();
        let service = Arc::clone(enrichment);
        let (x, y) = (a.to_string(), b.to_string());
        let records = call_with_timeout("enrichment", timeout, move || service.lookup(&x, &y))?;

        if let Some(cache) = &self.cache {
            match serde_json::to_value(&records) {
                Ok(value) => {
                    let cache = Arc::clone(cache);
                    let key = cache_key(a, b);
                    let ttl = self.config.enrichment_cache_ttl();
                    if let Err(e) =
                        call_with_timeout("cache", timeout, move || cache.set(&key, value, ttl))
                    {
                        warn!(error = %e, "cache write failed");
                    }
                }
                Err(e) => warn!(error = %e, "enrichment records not cacheable"),
            }
        }

        Ok(records)
    }

    /// Hand a critical report to the alert dispatcher.
    ///
    /// Failures are logged and otherwise ignored; the report is already final.
    fn dispatch_alert(&self, report: &ValidationReport) {
        let Some(alerts) = &self.alerts else {
            warn!(run_id = %report.run_id, "critical findings but no alert dispatcher configured");
            return;
        };

        let dispatcher = Arc::clone(alerts);
        let snapshot = report.clone();
        match call_with_timeout("alerts", self.config.collaborator_timeout(), move || {
            dispatcher.notify_critical(&snapshot)
        }) {
            Ok(()) => info!(
                run_id = %report.run_id,
                critical_issues = report.summary.critical_issues,
                "critical alert dispatched"
            ),
            Err(e) => error!(run_id = %report.run_id, error = %e, "critical alert dispatch failed"),
        }
    }
}

/// SHA-256 cache key for an unordered pair.
pub fn cache_key(a: &str, b: &str) -> String {
    let pair = PairKey::new(a, b);
    let mut hasher = Sha256::new();
    hasher.update(b"interaction:");
    hasher.update(pair.first().as_bytes());
    hasher.update(b"|");
    hasher.update(pair.second().as_bytes());
    hex::encode(hasher.finalize())
}

/// Convert a joined stage into its output, or record a system failure.
fn settle<T>(
    stage: &str,
    joined: thread::Result<MedsafeResult<T>>,
    failures: &mut Vec<ValidationResult>,
    at: DateTime<Utc>,
) -> Option<T> {
    match joined {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(stage, error = %e, "validation stage failed; failing closed");
            failures.push(ValidationResult::system_failure(format!("{stage} stage failed: {e}"), at));
            None
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(stage, reason = %reason, "validation stage panicked; failing closed");
            failures.push(ValidationResult::system_failure(
                format!("{stage} stage panicked: {reason}"),
                at,
            ));
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::{json, Value};

    use medsafe_contracts::{
        error::{MedsafeError, MedsafeResult},
        interaction::DrugInteractionRecord,
        medication::Medication,
        payload::PatientPayload,
        reconciliation::{DiscrepancyType, ReconciliationAction, ReconciliationFinding},
        report::{FieldResults, ValidationReport},
        severity::{InteractionSeverity, Severity},
        validation::{RuleCategory, ValidationContext, ValidationResult},
    };

    use crate::{
        config::OrchestratorConfig,
        traits::{
            AlertDispatcher, CacheService, CodeVerification, ConsistencyValidator, FieldValidator,
            InteractionEnrichmentService, InteractionScreen, MedicationReconciler, NameNormalizer,
            TerminologyService,
        },
    };

    use super::{cache_key, Stages, ValidationOrchestrator};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(a: &str, b: &str, severity: InteractionSeverity, source: &str) -> DrugInteractionRecord {
        DrugInteractionRecord {
            drug1: a.to_string(),
            drug2: b.to_string(),
            severity,
            description: "test".to_string(),
            mechanism: String::new(),
            management: String::new(),
            source: source.to_string(),
            timestamp: at(),
        }
    }

    struct Lowercase;

    impl NameNormalizer for Lowercase {
        fn normalize(&self, name: &str) -> String {
            name.trim().to_lowercase()
        }
    }

    /// A field validator returning a fixed result set.
    struct MockFields {
        results: Vec<ValidationResult>,
    }

    impl FieldValidator for MockFields {
        fn validate_fields(&self, _payload: &Value, _ctx: &ValidationContext) -> MedsafeResult<FieldResults> {
            let mut out = FieldResults::new();
            for r in &self.results {
                out.entry(r.field.clone()).or_default().push(r.clone());
            }
            Ok(out)
        }
    }

    struct MockConsistency {
        results: Vec<ValidationResult>,
    }

    impl ConsistencyValidator for MockConsistency {
        fn validate(&self, _p: &PatientPayload, _ctx: &ValidationContext) -> MedsafeResult<Vec<ValidationResult>> {
            Ok(self.results.clone())
        }
    }

    /// Screen that returns a fixed list, or fails, or panics.
    enum MockScreen {
        Returns(Vec<DrugInteractionRecord>),
        Fails,
        Panics,
    }

    impl InteractionScreen for MockScreen {
        fn screen(
            &self,
            _medications: &[Medication],
            _allergies: &[String],
            _at: DateTime<Utc>,
        ) -> MedsafeResult<Vec<DrugInteractionRecord>> {
            match self {
                MockScreen::Returns(r) => Ok(r.clone()),
                MockScreen::Fails => Err(MedsafeError::SystemFailure {
                    reason: "knowledge base unavailable".to_string(),
                }),
                MockScreen::Panics => panic!("index out of bounds in screen"),
            }
        }
    }

    struct MockReconciler {
        calls: Arc<Mutex<u32>>,
        findings: Vec<ReconciliationFinding>,
    }

    impl MedicationReconciler for MockReconciler {
        fn reconcile(
            &self,
            _current: &[Medication],
            _incoming: &[Medication],
            _ctx: &ValidationContext,
        ) -> MedsafeResult<Vec<ReconciliationFinding>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.findings.clone())
        }
    }

    /// Records every dispatched report; optionally fails.
    struct MockAlerts {
        sent: Arc<Mutex<Vec<ValidationReport>>>,
        fail: bool,
    }

    impl AlertDispatcher for MockAlerts {
        fn notify_critical(&self, report: &ValidationReport) -> MedsafeResult<()> {
            self.sent.lock().unwrap().push(report.clone());
            if self.fail {
                Err(MedsafeError::CollaboratorUnavailable {
                    service: "pager".to_string(),
                    reason: "503".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct MockTerminology {
        available: bool,
    }

    impl TerminologyService for MockTerminology {
        fn validate_code(&self, code: &str, _system: &str) -> MedsafeResult<CodeVerification> {
            if !self.available {
                return Err(MedsafeError::CollaboratorUnavailable {
                    service: "terminology".to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            if code == "I10" {
                Ok(CodeVerification::valid())
            } else {
                Ok(CodeVerification::invalid(format!("unknown code {code}")))
            }
        }
    }

    struct MockEnrichment {
        calls: Arc<Mutex<u32>>,
        result: Option<Vec<DrugInteractionRecord>>,
        delay: Option<Duration>,
    }

    impl InteractionEnrichmentService for MockEnrichment {
        fn name(&self) -> &str {
            "mock-enrichment"
        }

        fn lookup(&self, _a: &str, _b: &str) -> MedsafeResult<Vec<DrugInteractionRecord>> {
            *self.calls.lock().unwrap() += 1;
            if let Some(d) = self.delay {
                std::thread::sleep(d);
            }
            self.result.clone().ok_or(MedsafeError::CollaboratorUnavailable {
                service: "mock-enrichment".to_string(),
                reason: "down".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MockCache {
        entries: Mutex<std::collections::HashMap<String, Value>>,
    }

    impl CacheService for MockCache {
        fn get(&self, key: &str) -> MedsafeResult<Option<Value>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: Value, _ttl: Duration) -> MedsafeResult<()> {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    fn stages(screen: MockScreen) -> Stages {
        Stages {
            fields: Box::new(MockFields { results: vec![] }),
            consistency: Box::new(MockConsistency { results: vec![] }),
            interactions: Box::new(screen),
            reconciler: Box::new(MockReconciler { calls: Arc::new(Mutex::new(0)), findings: vec![] }),
            normalizer: Arc::new(Lowercase),
        }
    }

    fn payload() -> Value {
        json!({
            "patient": { "age": 58, "gender": "male", "allergies": [] },
            "medications": [{ "name": "warfarin" }, { "name": "aspirin" }],
            "diagnoses": [{ "code": "I10", "system": "ICD-10" }]
        })
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            collaborator_timeout_ms: 200,
            ..OrchestratorConfig::default()
        }
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    #[test]
    fn clean_payload_passes() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config());
        let report = orchestrator.validate_at(&payload(), at());
        assert!(report.summary.passed, "unexpected issues: {:?}", report.issues().collect::<Vec<_>>());
        assert_eq!(report.summary.total_issues, 0);
        assert!(report.reconciliation_findings.is_none());
    }

    #[test]
    fn major_interaction_fails_the_report_without_critical() {
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![record("aspirin", "warfarin", InteractionSeverity::Major, "kb")])),
            fast_config(),
        );
        let report = orchestrator.validate_at(&payload(), at());
        assert!(!report.summary.passed);
        assert_eq!(report.summary.critical_issues, 0);
        assert_eq!(report.interaction_findings.len(), 1);
    }

    #[test]
    fn failing_stage_fails_closed() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Fails), fast_config());
        let report = orchestrator.validate_at(&payload(), at());

        assert!(!report.summary.passed, "a failed stage must never produce a pass");
        let system = report.results_for("system");
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].severity, Severity::Critical);
        assert!(system[0].message.contains("interactions stage failed"));
    }

    #[test]
    fn panicking_stage_fails_closed() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Panics), fast_config());
        let report = orchestrator.validate_at(&payload(), at());

        assert!(!report.summary.passed);
        let system = report.results_for("system");
        assert!(system[0].message.contains("panicked"));
        assert!(system[0].message.contains("index out of bounds"));
    }

    #[test]
    fn unparseable_payload_fails() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config());
        let report = orchestrator.validate_at(&json!("just a string"), at());
        assert!(!report.summary.passed);
        assert_eq!(report.results_for("payload")[0].rule, "payload_parse");
    }

    #[test]
    fn reconciliation_runs_only_with_incoming_list() {
        let calls = Arc::new(Mutex::new(0));
        let mut s = stages(MockScreen::Returns(vec![]));
        s.reconciler = Box::new(MockReconciler {
            calls: calls.clone(),
            findings: vec![ReconciliationFinding::new(
                Medication::named("lisinopril"),
                ReconciliationAction::Discontinue,
                Some(DiscrepancyType::Omission),
                "not on discharge list",
                0.8,
            )],
        });
        let orchestrator = ValidationOrchestrator::new(s, fast_config());

        let _ = orchestrator.validate_at(&payload(), at());
        assert_eq!(*calls.lock().unwrap(), 0);

        let mut with_incoming = payload();
        with_incoming["incomingMedications"] = json!([{ "name": "warfarin" }]);
        let report = orchestrator.validate_at(&with_incoming, at());
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(report.reconciliation_findings.as_ref().map(Vec::len), Some(1));
        // Reconciliation is advisory.
        assert!(report.summary.passed);
    }

    #[test]
    fn critical_findings_trigger_alert() {
        let sent = Arc::new(Mutex::new(vec![]));
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![record(
                "clarithromycin",
                "simvastatin",
                InteractionSeverity::Contraindicated,
                "kb",
            )])),
            fast_config(),
        )
        .with_alerts(Arc::new(MockAlerts { sent: sent.clone(), fail: false }));

        let report = orchestrator.validate_at(&payload(), at());
        assert_eq!(report.summary.critical_issues, 1);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].run_id, report.run_id);
    }

    #[test]
    fn no_alert_without_critical_findings() {
        let sent = Arc::new(Mutex::new(vec![]));
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![record("a", "b", InteractionSeverity::Major, "kb")])),
            fast_config(),
        )
        .with_alerts(Arc::new(MockAlerts { sent: sent.clone(), fail: false }));

        orchestrator.validate_at(&payload(), at());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn alert_failure_does_not_change_outcome() {
        let critical = vec![record("a", "b", InteractionSeverity::Contraindicated, "kb")];
        let quiet = ValidationOrchestrator::new(stages(MockScreen::Returns(critical.clone())), fast_config());
        let failing = ValidationOrchestrator::new(stages(MockScreen::Returns(critical)), fast_config())
            .with_alerts(Arc::new(MockAlerts { sent: Arc::new(Mutex::new(vec![])), fail: true }));

        let a = quiet.validate_at(&payload(), at());
        let b = failing.validate_at(&payload(), at());
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.interaction_findings, b.interaction_findings);
    }

    #[test]
    fn terminology_rejection_is_error() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_terminology(Arc::new(MockTerminology { available: true }));

        let mut p = payload();
        p["diagnoses"] = json!([{ "code": "I10", "system": "ICD-10" }, { "code": "Z99.99", "system": "ICD-10" }]);
        let report = orchestrator.validate_at(&p, at());

        assert!(report.results_for("diagnoses[0].code")[0].is_valid);
        let rejected = &report.results_for("diagnoses[1].code")[0];
        assert!(!rejected.is_valid);
        assert_eq!(rejected.severity, Severity::Error);
        assert!(!report.summary.passed);
    }

    #[test]
    fn terminology_outage_never_passes() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_terminology(Arc::new(MockTerminology { available: false }));

        let report = orchestrator.validate_at(&payload(), at());
        let result = &report.results_for("diagnoses[0].code")[0];
        assert!(result.message.contains("could not verify"));
        assert!(!report.summary.passed, "collaborator failure must never yield a pass");
    }

    #[test]
    fn enrichment_outage_never_passes() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_enrichment(Arc::new(MockEnrichment {
                calls: Arc::new(Mutex::new(0)),
                result: None,
                delay: None,
            }));

        let report = orchestrator.validate_at(&payload(), at());
        assert!(!report.summary.passed);
        assert_eq!(report.results_for("interactions")[0].rule, "interaction_enrichment");
    }

    #[test]
    fn enrichment_timeout_never_passes() {
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![])),
            OrchestratorConfig { collaborator_timeout_ms: 20, ..OrchestratorConfig::default() },
        )
        .with_enrichment(Arc::new(MockEnrichment {
            calls: Arc::new(Mutex::new(0)),
            result: Some(vec![]),
            delay: Some(Duration::from_millis(300)),
        }));

        let report = orchestrator.validate_at(&payload(), at());
        assert!(!report.summary.passed);
        assert!(report.results_for("interactions")[0].message.contains("timed out"));
    }

    #[test]
    fn enrichment_outage_stops_further_lookups() {
        let calls = Arc::new(Mutex::new(0));
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![])),
            OrchestratorConfig { collaborator_timeout_ms: 50, ..OrchestratorConfig::default() },
        )
        .with_enrichment(Arc::new(MockEnrichment {
            calls: calls.clone(),
            result: Some(vec![]),
            delay: Some(Duration::from_millis(500)),
        }));
        let payload = json!({
            "patient": { "age": 58 },
            "medications": [
                { "name": "warfarin" }, { "name": "aspirin" }, { "name": "lisinopril" },
                { "name": "metformin" }, { "name": "digoxin" }, { "name": "simvastatin" }
            ]
        });

        let started = std::time::Instant::now();
        let report = orchestrator.validate_at(&payload, at());

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(*calls.lock().unwrap(), 1);
        let unverified = report.results_for("interactions");
        assert_eq!(unverified.len(), 15, "one result per unchecked pair");
        assert!(unverified.iter().all(|r| !r.is_valid && r.severity == Severity::Error));
        assert!(unverified[1].message.contains("skipped after earlier failure"));
        assert!(!report.summary.passed);
    }

    #[test]
    fn cached_pairs_are_still_served_during_an_outage() {
        let cache = Arc::new(MockCache::default());
        cache.entries.lock().unwrap().insert(
            cache_key("warfarin", "aspirin"),
            serde_json::to_value(vec![record("warfarin", "aspirin", InteractionSeverity::Major, "mock-enrichment")])
                .unwrap(),
        );
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_cache(cache)
            .with_enrichment(Arc::new(MockEnrichment {
                calls: Arc::new(Mutex::new(0)),
                result: None,
                delay: None,
            }));
        let payload = json!({
            "patient": { "age": 58 },
            "medications": [{ "name": "lisinopril" }, { "name": "warfarin" }, { "name": "aspirin" }]
        });

        let report = orchestrator.validate_at(&payload, at());

        assert_eq!(report.interaction_findings.len(), 1);
        assert_eq!(report.interaction_findings[0].severity, InteractionSeverity::Major);
        assert_eq!(report.results_for("interactions").len(), 2);
        assert!(!report.summary.passed);
    }

    #[test]
    fn enrichment_escalates_but_never_downgrades() {
        let orchestrator = ValidationOrchestrator::new(
            stages(MockScreen::Returns(vec![record("aspirin", "warfarin", InteractionSeverity::Major, "kb")])),
            fast_config(),
        )
        .with_enrichment(Arc::new(MockEnrichment {
            calls: Arc::new(Mutex::new(0)),
            result: Some(vec![record("warfarin", "aspirin", InteractionSeverity::Minor, "mock-enrichment")]),
            delay: None,
        }));

        let report = orchestrator.validate_at(&payload(), at());
        assert_eq!(report.interaction_findings.len(), 1);
        assert_eq!(report.interaction_findings[0].severity, InteractionSeverity::Major);
        assert_eq!(report.interaction_findings[0].source, "kb");
    }

    #[test]
    fn enrichment_results_are_cached() {
        let calls = Arc::new(Mutex::new(0));
        let cache = Arc::new(MockCache::default());
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_cache(cache.clone())
            .with_enrichment(Arc::new(MockEnrichment {
                calls: calls.clone(),
                result: Some(vec![]),
                delay: None,
            }));

        orchestrator.validate_at(&payload(), at());
        orchestrator.validate_at(&payload(), at());

        assert_eq!(*calls.lock().unwrap(), 1, "second run must be served from cache");
        assert!(cache.entries.lock().unwrap().contains_key(&cache_key("warfarin", "aspirin")));
    }

    #[test]
    fn cache_key_is_order_independent() {
        assert_eq!(cache_key("warfarin", "aspirin"), cache_key("aspirin", "warfarin"));
        assert_eq!(cache_key("a", "b").len(), 64);
    }

    #[test]
    fn field_and_cross_field_results_are_merged() {
        let mut s = stages(MockScreen::Returns(vec![]));
        s.fields = Box::new(MockFields {
            results: vec![ValidationResult::pass("patient.age", "patient_age_range", RuleCategory::Range, "ok", at())],
        });
        s.consistency = Box::new(MockConsistency {
            results: vec![ValidationResult::fail(
                "blood_pressure",
                "bp_consistency",
                RuleCategory::Consistency,
                Severity::Error,
                "systolic must exceed diastolic",
                at(),
            )],
        });
        let report = ValidationOrchestrator::new(s, fast_config()).validate_at(&payload(), at());

        assert_eq!(report.results_for("patient.age").len(), 1);
        assert_eq!(report.cross_field_results.len(), 1);
        assert!(!report.summary.passed);
    }

    #[test]
    fn check_interactions_surfaces_enrichment_failure() {
        let orchestrator = ValidationOrchestrator::new(stages(MockScreen::Returns(vec![])), fast_config())
            .with_enrichment(Arc::new(MockEnrichment {
                calls: Arc::new(Mutex::new(0)),
                result: None,
                delay: None,
            }));
        let meds = vec![Medication::named("warfarin"), Medication::named("aspirin")];
        assert!(orchestrator.check_interactions(&meds, &[]).is_err());
    }
}
