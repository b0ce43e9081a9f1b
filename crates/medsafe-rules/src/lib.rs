//! # medsafe-rules
//!
//! Field-level and cross-field validation for MEDSAFE.
//!
//! This crate provides:
//! - [`engine::RuleEngine`]: per-field rules (`Required`, `Format`, `Range`,
//!   `Date`, `Code`, `Custom`) registered against dotted field patterns with
//!   `[*]` wildcards
//! - [`rule::RuleCatalog`]: TOML rule definitions and named rule sets
//! - [`schema::FieldRuleValidator`]: the `FieldValidator` stage, a JSON Schema
//!   structural check followed by the rule engine
//! - [`cross_field::CrossFieldValidator`]: the `ConsistencyValidator` stage
//! - [`codes::PatternCodeValidator`]: syntactic ICD-10, LOINC, SNOMED CT, and
//!   RxNorm checks
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medsafe_rules::{codes::PatternCodeValidator, engine::RuleEngine, rule::RuleCatalog};
//!
//! let catalog = RuleCatalog::builtin()?;
//! let engine = RuleEngine::from_catalog(&catalog, "intake", Arc::new(PatternCodeValidator::new()))?;
//! let results = engine.validate_payload(&payload, &ctx);
//! ```

pub mod codes;
pub mod cross_field;
pub mod engine;
pub mod path;
pub mod rule;
pub mod schema;

pub use cross_field::CrossFieldValidator;
pub use engine::RuleEngine;
pub use rule::RuleCatalog;
pub use schema::FieldRuleValidator;
