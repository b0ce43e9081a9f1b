//! In-process stand-ins for the external collaborators.
//!
//! Nothing here touches the network. The terminology catalog and the
//! enrichment table are small, hardcoded, and fictional in scope; they exist
//! so the orchestrator's collaborator paths can be exercised end to end.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    interaction::{DrugInteractionRecord, PairKey},
    report::ValidationReport,
    severity::InteractionSeverity,
};
use medsafe_core::traits::{
    AlertDispatcher, CacheService, CodeSystemValidator, CodeVerification, InteractionEnrichmentService,
    TerminologyService,
};
use medsafe_rules::codes::{CodeSystem, PatternCodeValidator};

// ── Cache ─────────────────────────────────────────────────────────────────────

/// A TTL cache in a `Mutex<HashMap>`. Expired entries are dropped on read.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|(_, expires)| *expires > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(e: impl std::fmt::Display) -> MedsafeError {
        MedsafeError::CollaboratorUnavailable {
            service: "cache".to_string(),
            reason: format!("cache lock poisoned: {e}"),
        }
    }
}

impl CacheService for InMemoryCache {
    fn get(&self, key: &str) -> MedsafeResult<Option<Value>> {
        let mut entries = self.entries.lock().map_err(Self::poisoned)?;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> MedsafeResult<()> {
        let mut entries = self.entries.lock().map_err(Self::poisoned)?;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

// ── Terminology ───────────────────────────────────────────────────────────────

/// Known codes per system. Well-formed codes outside the catalog are
/// reported as not found.
const KNOWN_CODES: &[(CodeSystem, &[&str])] = &[
    (
        CodeSystem::Icd10,
        &["I10", "E11.9", "E11.65", "I48.91", "I50.9", "N18.3", "E78.5", "K21.9", "F32.9", "Z34.90", "O09.90"],
    ),
    (CodeSystem::SnomedCt, &["44054006", "38341003", "195967001", "49436004"]),
    (CodeSystem::Loinc, &["4548-4", "2160-0", "6301-6", "2823-3", "718-7"]),
    (CodeSystem::RxNorm, &["11289", "1191", "5640", "6809", "29046", "36567", "723"]),
];

/// A terminology service backed by the syntactic validator and a small
/// catalog of known codes.
pub struct CatalogTerminologyService {
    shapes: PatternCodeValidator,
    known: HashMap<CodeSystem, HashSet<String>>,
}

impl Default for CatalogTerminologyService {
    fn default() -> Self {
        let known = KNOWN_CODES
            .iter()
            .map(|(system, codes)| (*system, codes.iter().map(|c| c.to_string()).collect()))
            .collect();
        Self {
            shapes: PatternCodeValidator::new(),
            known,
        }
    }
}

impl TerminologyService for CatalogTerminologyService {
    fn validate_code(&self, code: &str, system: &str) -> MedsafeResult<CodeVerification> {
        let shape = self.shapes.validate(code, system);
        if !shape.is_valid {
            return Ok(shape);
        }
        let Some(known) = CodeSystem::parse(system).and_then(|s| self.known.get(&s).map(|codes| (s, codes))) else {
            return Ok(shape);
        };
        let (system, codes) = known;
        if codes.contains(code.trim()) {
            Ok(CodeVerification::valid())
        } else {
            Ok(CodeVerification::invalid(format!(
                "'{}' is not a known {} code",
                code.trim(),
                system.display_name()
            )))
        }
    }
}

// ── Enrichment ────────────────────────────────────────────────────────────────

/// Interaction data a second source contributes on top of the knowledge base.
const ENRICHMENT_TABLE: &[(&str, &str, InteractionSeverity, &str)] = &[
    ("warfarin", "acetaminophen", InteractionSeverity::Minor, "Regular acetaminophen use may raise INR"),
    ("simvastatin", "amlodipine", InteractionSeverity::Moderate, "Amlodipine raises simvastatin exposure; cap simvastatin at 20 mg"),
    ("ciprofloxacin", "tizanidine", InteractionSeverity::Contraindicated, "Ciprofloxacin greatly increases tizanidine levels"),
    ("warfarin", "aspirin", InteractionSeverity::Moderate, "Bleeding risk"),
    ("clopidogrel", "aspirin", InteractionSeverity::Moderate, "Additive bleeding risk with dual antiplatelet therapy"),
];

/// A fixed-table enrichment source that counts its lookups.
pub struct StaticEnrichmentService {
    name: String,
    table: HashMap<PairKey, (InteractionSeverity, String)>,
    calls: AtomicUsize,
}

impl StaticEnrichmentService {
    pub fn new(name: impl Into<String>) -> Self {
        let table = ENRICHMENT_TABLE
            .iter()
            .map(|(a, b, severity, description)| (PairKey::new(a, b), (*severity, description.to_string())))
            .collect();
        Self {
            name: name.into(),
            table,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups that reached this service (cache hits do not).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InteractionEnrichmentService for StaticEnrichmentService {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, drug_a: &str, drug_b: &str) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = PairKey::new(drug_a, drug_b);
        let Some((severity, description)) = self.table.get(&key) else {
            return Ok(Vec::new());
        };
        debug!(source = %self.name, severity = %severity, "enrichment match");
        Ok(vec![DrugInteractionRecord {
            drug1: key.first().to_string(),
            drug2: key.second().to_string(),
            severity: *severity,
            description: description.clone(),
            mechanism: String::new(),
            management: "Review with a clinical pharmacist".to_string(),
            source: self.name.clone(),
            timestamp: Utc::now(),
        }])
    }
}

// ── Failure injection ─────────────────────────────────────────────────────────

/// A collaborator that is always down, optionally after a delay.
///
/// Implements every collaborator trait so one value can stand in for any of
/// them when exercising the fail-closed paths.
pub struct UnavailableService {
    service: String,
    delay: Duration,
}

impl UnavailableService {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` before failing; longer than the orchestrator's
    /// timeout simulates a hung dependency.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fail<T>(&self) -> MedsafeResult<T> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Err(MedsafeError::CollaboratorUnavailable {
            service: self.service.clone(),
            reason: "connection refused".to_string(),
        })
    }
}

impl TerminologyService for UnavailableService {
    fn validate_code(&self, _code: &str, _system: &str) -> MedsafeResult<CodeVerification> {
        self.fail()
    }
}

impl InteractionEnrichmentService for UnavailableService {
    fn name(&self) -> &str {
        &self.service
    }

    fn lookup(&self, _drug_a: &str, _drug_b: &str) -> MedsafeResult<Vec<DrugInteractionRecord>> {
        self.fail()
    }
}

impl AlertDispatcher for UnavailableService {
    fn notify_critical(&self, _report: &ValidationReport) -> MedsafeResult<()> {
        self.fail()
    }
}

impl CacheService for UnavailableService {
    fn get(&self, _key: &str) -> MedsafeResult<Option<Value>> {
        self.fail()
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> MedsafeResult<()> {
        self.fail()
    }
}
