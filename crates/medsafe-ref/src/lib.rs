//! # medsafe-ref
//!
//! Reference deployment of the MEDSAFE engine.
//!
//! Provides in-process stand-ins for every external collaborator, a set of
//! fictional patient payloads, the default wiring of the pipeline, and five
//! end-to-end scenarios:
//!
//! 1. **Anticoagulation**: warfarin + aspirin, knowledge base and enrichment
//!    agreeing on one merged finding, cache reuse on the second run.
//! 2. **Consistency**: age vs birth date, inverted blood pressure, malformed
//!    values.
//! 3. **Special populations**: pregnancy, pediatrics, allergy, cultural and
//!    fasting notes, with critical alerts on a verified hash chain.
//! 4. **Reconciliation**: home list vs discharge list.
//! 5. **Resilience**: collaborator outages and a faulting stage, all failing
//!    closed.
//!
//! All data is hardcoded and fictional. No network calls are made.

pub mod collaborators;
pub mod sample_data;
pub mod scenarios;
pub mod wiring;

pub use wiring::{build_default_orchestrator, build_orchestrator, reference_deployment, ReferenceDeployment};
