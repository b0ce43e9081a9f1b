//! # medsafe-pharmacy
//!
//! Medication knowledge and the two medication-centric stages:
//!
//! - [`knowledge`]: the immutable drug knowledge base (interaction pairs,
//!   therapeutic and allergy classes, brand and code maps).
//! - [`resolver`]: name normalization and matching.
//! - [`interactions`]: pairwise drug-drug and drug-allergy screening,
//!   implementing `InteractionScreen`.
//! - [`reconcile`]: medication reconciliation, implementing
//!   `MedicationReconciler`.
//!
//! All four share one `Arc<DrugKnowledgeBase>`; nothing here takes a lock.

pub mod interactions;
pub mod knowledge;
pub mod reconcile;
pub mod resolver;

pub use interactions::InteractionChecker;
pub use knowledge::DrugKnowledgeBase;
pub use reconcile::ReconciliationEngine;
pub use resolver::{MatchKind, NameResolver};
