//! Bounded collaborator calls.
//!
//! Collaborators may block on I/O. Every call goes through
//! [`call_with_timeout`], which runs it on a helper thread and gives up after
//! the configured budget. A timed-out call keeps running in the background;
//! its result is discarded. For alert dispatch that is exactly the
//! fire-and-forget behaviour required: a notification already handed off is
//! never retracted.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use medsafe_contracts::error::{MedsafeError, MedsafeResult};

/// Run `f` on a helper thread and wait at most `timeout` for its result.
///
/// A timeout, a panic inside `f`, or a failure to spawn the thread all map to
/// `MedsafeError::CollaboratorUnavailable` naming `service`.
pub fn call_with_timeout<T, F>(service: &str, timeout: Duration, f: F) -> MedsafeResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> MedsafeResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(format!("medsafe-{service}"))
        .spawn(move || {
            // The receiver may have given up already; nothing to do then.
            let _ = tx.send(f());
        })
        .map_err(|e| MedsafeError::CollaboratorUnavailable {
            service: service.to_string(),
            reason: format!("could not spawn worker thread: {e}"),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(MedsafeError::CollaboratorUnavailable {
            service: service.to_string(),
            reason: format!("timed out after {}ms", timeout.as_millis()),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(MedsafeError::CollaboratorUnavailable {
            service: service.to_string(),
            reason: "worker terminated without a response".to_string(),
        }),
    }
}
