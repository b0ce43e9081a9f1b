//! # medsafe-alerts
//!
//! Reference `AlertDispatcher`: an append-only, SHA-256 hash-chained log of
//! critical alerts. An alert once recorded is never retracted; tampering with
//! any stored alert is detected by [`verify_chain`].
//!
//! ```rust,ignore
//! use medsafe_alerts::InMemoryAlertDispatcher;
//!
//! let alerts = InMemoryAlertDispatcher::new("ward-7");
//! let orchestrator = orchestrator.with_alerts(Arc::new(alerts.clone()));
//! orchestrator.validate(&payload);
//!
//! assert!(alerts.verify_integrity());
//! let log = alerts.export_log()?;
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{AlertEvent, AlertLog, CriticalAlert};
pub use memory::InMemoryAlertDispatcher;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use medsafe_contracts::{
        interaction::DrugInteractionRecord,
        report::{FieldResults, ValidationReport, ValidationSummary},
        severity::{InteractionSeverity, Severity},
        validation::{RuleCategory, ValidationResult},
    };
    use medsafe_core::traits::AlertDispatcher;

    use super::{AlertEvent, InMemoryAlertDispatcher};

    fn critical_report(message: &str) -> ValidationReport {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let cross = vec![ValidationResult::fail(
            "medications[0].name",
            "pregnancy_medication",
            RuleCategory::Safety,
            Severity::Critical,
            message,
            at,
        )];
        let interactions = vec![DrugInteractionRecord {
            drug1: "clarithromycin".to_string(),
            drug2: "simvastatin".to_string(),
            severity: InteractionSeverity::Contraindicated,
            description: "Risk of rhabdomyolysis".to_string(),
            mechanism: String::new(),
            management: String::new(),
            source: "knowledge-base".to_string(),
            timestamp: at,
        }];
        let fields = FieldResults::new();
        let summary = ValidationSummary::compute(&fields, &cross, &interactions, None);
        ValidationReport {
            run_id: Uuid::new_v4(),
            generated_at: at,
            field_results: fields,
            cross_field_results: cross,
            interaction_findings: interactions,
            reconciliation_findings: None,
            summary,
        }
    }

    #[test]
    fn chain_is_valid_after_sequential_alerts() {
        let alerts = InMemoryAlertDispatcher::new("ward-integrity");
        for msg in ["first", "second", "third"] {
            alerts.notify_critical(&critical_report(msg)).unwrap();
        }
        assert_eq!(alerts.alert_count(), 3);
        assert!(alerts.verify_integrity());
    }

    #[test]
    fn alert_carries_critical_items() {
        let alerts = InMemoryAlertDispatcher::new("ward-items");
        alerts.notify_critical(&critical_report("warfarin in pregnancy")).unwrap();

        let log = alerts.export_log().unwrap();
        let alert = &log.events[0].alert;
        assert_eq!(alert.critical_results.len(), 1);
        assert_eq!(alert.contraindications.len(), 1);
        assert!(!alert.summary.passed);
    }

    #[test]
    fn tampering_is_detected() {
        let alerts = InMemoryAlertDispatcher::new("ward-tamper");
        alerts.notify_critical(&critical_report("a")).unwrap();
        alerts.notify_critical(&critical_report("b")).unwrap();

        {
            let mut state = alerts.state.lock().unwrap();
            state.events[0].alert.critical_results[0].message = "nothing to see".to_string();
        }

        assert!(!alerts.verify_integrity());
    }

    #[test]
    fn first_event_links_to_genesis_and_log_exports_terminal_hash() {
        let alerts = InMemoryAlertDispatcher::new("ward-export");
        alerts.notify_critical(&critical_report("a")).unwrap();
        alerts.notify_critical(&critical_report("b")).unwrap();

        let log = alerts.export_log().unwrap();
        assert_eq!(log.events[0].prev_hash, AlertEvent::GENESIS_HASH);
        assert_eq!(log.events[1].prev_hash, log.events[0].this_hash);
        assert_eq!(log.terminal_hash, log.events[1].this_hash);
        assert!(super::verify_chain(&log.events));
    }

    #[test]
    fn empty_log_is_valid() {
        let alerts = InMemoryAlertDispatcher::new("ward-empty");
        assert!(alerts.verify_integrity());
        assert!(alerts.export_log().unwrap().terminal_hash.is_empty());
        assert!(super::verify_chain(&[]));
    }
}
