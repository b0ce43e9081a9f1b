//! # medsafe-core
//!
//! The fail-closed validation runtime for MEDSAFE.
//!
//! This crate provides:
//! - The stage traits (`FieldValidator`, `ConsistencyValidator`,
//!   `InteractionScreen`, `MedicationReconciler`) and collaborator traits
//!   (`TerminologyService`, `InteractionEnrichmentService`, `AlertDispatcher`,
//!   `CacheService`)
//! - The `ValidationOrchestrator` that runs the stages concurrently and
//!   merges their output into one `ValidationReport`
//! - `OrchestratorConfig`, loaded from TOML
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medsafe_core::{OrchestratorConfig, Stages, ValidationOrchestrator};
//!
//! let orchestrator = ValidationOrchestrator::new(stages, OrchestratorConfig::default());
//! let report = orchestrator.validate(&payload);
//! assert!(report.summary.passed);
//! ```

pub mod config;
pub mod orchestrator;
pub mod timeout;
pub mod traits;

pub use config::{OrchestratorConfig, ReconciliationConfig};
pub use orchestrator::{Stages, ValidationOrchestrator};
