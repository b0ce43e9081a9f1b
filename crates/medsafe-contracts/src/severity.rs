//! Severity taxonomies.
//!
//! Two total orders are used across the engine:
//!
//! - field validation: `Info < Warning < Error < Critical`
//! - interactions: `Unknown < Minor < Moderate < Major < Contraindicated`
//!
//! Merging always keeps the higher rank. Nothing in the pipeline averages or
//! downgrades a severity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a field or cross-field validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Return the higher of two severities.
    pub fn merge(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// True for severities that make a report fail.
    pub fn is_blocking(self) -> bool {
        self >= Severity::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical severity of a drug-drug or drug-allergy interaction.
///
/// Declaration order is the ranking: `Unknown` is lowest,
/// `Contraindicated` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Unknown,
    Minor,
    Moderate,
    Major,
    Contraindicated,
}

impl InteractionSeverity {
    /// Return the higher-ranked severity.
    pub fn merge(self, other: InteractionSeverity) -> InteractionSeverity {
        self.max(other)
    }

    /// Map onto the field-validation taxonomy for report summaries.
    pub fn as_validation_severity(self) -> Severity {
        match self {
            InteractionSeverity::Contraindicated => Severity::Critical,
            InteractionSeverity::Major => Severity::Error,
            InteractionSeverity::Moderate => Severity::Warning,
            InteractionSeverity::Minor | InteractionSeverity::Unknown => Severity::Info,
        }
    }

    /// Lenient parse used for enrichment payloads and TOML tables.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Some(InteractionSeverity::Unknown),
            "minor" | "low" => Some(InteractionSeverity::Minor),
            "moderate" | "medium" => Some(InteractionSeverity::Moderate),
            "major" | "high" | "severe" => Some(InteractionSeverity::Major),
            "contraindicated" | "x" => Some(InteractionSeverity::Contraindicated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionSeverity::Unknown => "unknown",
            InteractionSeverity::Minor => "minor",
            InteractionSeverity::Moderate => "moderate",
            InteractionSeverity::Major => "major",
            InteractionSeverity::Contraindicated => "contraindicated",
        }
    }
}

impl fmt::Display for InteractionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
