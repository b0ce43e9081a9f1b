//! Hash-chain primitives.
//!
//! Hash input layout, in order:
//!   1. dispatcher_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the alert

use sha2::{Digest, Sha256};

use medsafe_contracts::error::{MedsafeError, MedsafeResult};

use crate::event::{AlertEvent, CriticalAlert};

/// Lowercase hex SHA-256 over one event's content.
pub fn hash_event(
    dispatcher_id: &str,
    sequence: u64,
    alert: &CriticalAlert,
    prev_hash: &str,
) -> MedsafeResult<String> {
    let alert_json = serde_json::to_vec(alert).map_err(|e| MedsafeError::SystemFailure {
        reason: format!("alert could not be serialized for hashing: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(dispatcher_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&alert_json);

    Ok(hex::encode(hasher.finalize()))
}

/// True when every `prev_hash` links to its predecessor (or genesis) and
/// every `this_hash` matches its recomputed value. An empty chain is valid.
pub fn verify_chain(events: &[AlertEvent]) -> bool {
    let mut expected_prev = AlertEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }
        match hash_event(&event.dispatcher_id, event.sequence, &event.alert, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }
        expected_prev = event.this_hash.clone();
    }

    true
}
