//! Orchestrator configuration.
//!
//! Loaded from TOML; every key is optional and falls back to its default.
//!
//! ```toml
//! rule_set = "intake"
//! collaborator_timeout_ms = 2000
//! enrichment_cache_ttl_secs = 3600
//! alert_on_critical = true
//!
//! [reconciliation]
//! attach_interactions = true
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use medsafe_contracts::error::{MedsafeError, MedsafeResult};

/// Reconciliation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Run the interaction checker over the incoming list and attach
    /// warnings to findings.
    pub attach_interactions: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { attach_interactions: true }
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Name of the rule set the field validator is built from.
    pub rule_set: String,
    /// Budget for each individual collaborator call.
    pub collaborator_timeout_ms: u64,
    /// TTL for cached enrichment lookups.
    pub enrichment_cache_ttl_secs: u64,
    /// Dispatch reports with critical findings to the alert collaborator.
    pub alert_on_critical: bool,
    pub reconciliation: ReconciliationConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rule_set: "intake".to_string(),
            collaborator_timeout_ms: 2000,
            enrichment_cache_ttl_secs: 3600,
            alert_on_critical: true,
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `MedsafeError::ConfigError` on malformed TOML or a zero
    /// timeout.
    pub fn from_toml_str(s: &str) -> MedsafeResult<Self> {
        let config: OrchestratorConfig = toml::from_str(s).map_err(|e| MedsafeError::ConfigError {
            reason: format!("failed to parse orchestrator TOML: {}", e),
        })?;
        if config.collaborator_timeout_ms == 0 {
            return Err(MedsafeError::ConfigError {
                reason: "collaborator_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    /// Read the file at `path` and parse it as orchestrator configuration.
    pub fn from_file(path: &Path) -> MedsafeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedsafeError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    pub fn enrichment_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.enrichment_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use medsafe_contracts::error::MedsafeError;

    use super::OrchestratorConfig;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = OrchestratorConfig::from_toml_str("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert!(config.reconciliation.attach_interactions);
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            rule_set = "medication_review"
            collaborator_timeout_ms = 250

            [reconciliation]
            attach_interactions = false
            "#,
        )
        .unwrap();
        assert_eq!(config.rule_set, "medication_review");
        assert_eq!(config.collaborator_timeout().as_millis(), 250);
        assert_eq!(config.enrichment_cache_ttl_secs, 3600);
        assert!(!config.reconciliation.attach_interactions);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        match OrchestratorConfig::from_toml_str("collaborator_timeout_ms = 0") {
            Err(MedsafeError::ConfigError { reason }) => assert!(reason.contains("greater than zero")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn malformed_toml_is_config_error() {
        match OrchestratorConfig::from_toml_str("this is not valid toml ][[[") {
            Err(MedsafeError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse orchestrator TOML"))
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }
}
