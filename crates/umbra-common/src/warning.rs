//! Deduplicated warnings routed through `tracing`.
//!
//! Parsing and cascading run once per element type and again on every
//! update, so the same malformed selector or dangling `var()` would otherwise
//! be reported on every pass. Each distinct message is emitted once per
//! process until [`clear_warnings`] is called.

use std::collections::HashSet;
use std::sync::Mutex;

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about unsupported or malformed input (emits once per unique message)
///
/// # Example
/// ```ignore
/// warn_once("CSS", "failed to parse selector '::part(x'");
/// ```
///
/// Returns `true` if the warning was emitted, `false` if it was a duplicate.
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    // A poisoned lock only means another thread panicked mid-insert; the set
    // itself is still usable.
    let should_emit = WARNED
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_emit {
        tracing::warn!(target: "umbra", component, "{message}");
    }
    should_emit
}

/// Clear all recorded warnings (call when starting a new session)
pub fn clear_warnings() {
    let mut guard = WARNED
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
