//! Duration parsing for controller payloads.

use std::time::Duration;

/// Convert a seconds value reported by the controller into a `Duration`.
///
/// Returns `None` for negative, NaN or infinite values, and for values too
/// large to represent.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
