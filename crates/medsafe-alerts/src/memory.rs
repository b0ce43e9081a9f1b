//! In-memory `AlertDispatcher`.
//!
//! Alerts are appended to a hash-chained `Vec` behind a `Mutex`; nothing is
//! ever removed or rewritten. Call `verify_integrity` at any time to confirm
//! the log has not been altered, and `export_log` for a snapshot.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    report::ValidationReport,
};
use medsafe_core::traits::AlertDispatcher;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AlertEvent, AlertLog, CriticalAlert},
};

pub(crate) struct AlertState {
    pub(crate) events: Vec<AlertEvent>,
    pub(crate) sequence: u64,
    pub(crate) last_hash: String,
}

/// Append-only alert log backed by a SHA-256 hash chain.
#[derive(Clone)]
pub struct InMemoryAlertDispatcher {
    dispatcher_id: String,
    pub(crate) state: Arc<Mutex<AlertState>>,
}

impl InMemoryAlertDispatcher {
    pub fn new(dispatcher_id: impl Into<String>) -> Self {
        let state = AlertState {
            events: Vec::new(),
            sequence: 0,
            last_hash: AlertEvent::GENESIS_HASH.to_string(),
        };
        Self {
            dispatcher_id: dispatcher_id.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn dispatcher_id(&self) -> &str {
        &self.dispatcher_id
    }

    fn lock(&self) -> MedsafeResult<std::sync::MutexGuard<'_, AlertState>> {
        self.state.lock().map_err(|e| MedsafeError::CollaboratorUnavailable {
            service: "alert-dispatcher".to_string(),
            reason: format!("alert state lock poisoned: {e}"),
        })
    }

    /// Append one alert and return its chain hash.
    pub fn record(&self, alert: CriticalAlert) -> MedsafeResult<String> {
        let mut state = self.lock()?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_event(&self.dispatcher_id, sequence, &alert, &prev_hash)?;

        state.events.push(AlertEvent {
            sequence,
            dispatcher_id: self.dispatcher_id.clone(),
            alert,
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash.clone();

        Ok(this_hash)
    }

    pub fn alert_count(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    /// Snapshot of every alert so far.
    pub fn export_log(&self) -> MedsafeResult<AlertLog> {
        let state = self.lock()?;
        let terminal_hash = state
            .events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        Ok(AlertLog {
            dispatcher_id: self.dispatcher_id.clone(),
            events: state.events.clone(),
            exported_at: Utc::now(),
            terminal_hash,
        })
    }

    /// False if any stored event was altered, or the lock is poisoned.
    pub fn verify_integrity(&self) -> bool {
        match self.lock() {
            Ok(state) => verify_chain(&state.events),
            Err(e) => {
                warn!(error = %e, "cannot verify alert log");
                false
            }
        }
    }
}

impl AlertDispatcher for InMemoryAlertDispatcher {
    fn notify_critical(&self, report: &ValidationReport) -> MedsafeResult<()> {
        let alert = CriticalAlert::from_report(report);
        let items = alert.item_count();
        let hash = self.record(alert)?;

        info!(
            run_id = %report.run_id,
            dispatcher = %self.dispatcher_id,
            items,
            hash = %hash,
            "critical alert recorded"
        );
        Ok(())
    }
}
