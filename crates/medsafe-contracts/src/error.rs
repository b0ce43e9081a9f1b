//! Error types for the MEDSAFE validation pipeline.
//!
//! Bad patient *data* never becomes an error: rules turn it into an
//! Error-severity `ValidationResult`. The variants here cover the cases that
//! legitimately cross a component boundary: collaborator outages,
//! configuration mistakes, and internal faults. The orchestrator turns them
//! into fail-closed results.

use thiserror::Error;

/// The unified error type for the MEDSAFE crates.
#[derive(Debug, Error)]
pub enum MedsafeError {
    /// A field value could not be interpreted at all.
    ///
    /// Rule evaluation converts this into a result; it only surfaces as an
    /// error from helpers that have no result channel.
    #[error("malformed value for '{field}': {reason}")]
    DataError { field: String, reason: String },

    /// An external collaborator (terminology, enrichment, cache, alerting)
    /// failed or timed out.
    #[error("collaborator '{service}' unavailable: {reason}")]
    CollaboratorUnavailable { service: String, reason: String },

    /// An unexpected internal fault. The orchestrator reports this as a
    /// synthetic Critical result and never returns a pass.
    #[error("system failure: {reason}")]
    SystemFailure { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A rule definition was rejected at registration time.
    #[error("invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    /// The payload JSON Schema itself could not be compiled.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

/// Convenience alias used throughout the MEDSAFE crates.
pub type MedsafeResult<T> = Result<T, MedsafeError>;
