//! Subscription mode and per-path worker selection (spec §4.6).

use sonic_gnmi_model::TablePath;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    OnChange,
    Sample,
    /// Any gNMI mode other than `ON_CHANGE`/`SAMPLE`. StreamRun enqueues a
    /// fatal `unsupported subscription mode` for these (spec §4.6).
    Unsupported,
}

/// Minimum sampling interval; `0` on the wire means "use this minimum"
/// (spec §4.6 "Sampling interval validation").
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Validates and normalizes a requested sample interval. `0` means "use the
/// minimum"; any non-zero value below the minimum is rejected.
pub fn normalize_sample_interval(requested: Duration) -> Result<Duration, String> {
    if requested.is_zero() {
        return Ok(MIN_SAMPLE_INTERVAL);
    }
    if requested < MIN_SAMPLE_INTERVAL {
        return Err(format!(
            "sample interval {requested:?} is below the minimum {MIN_SAMPLE_INTERVAL:?}"
        ));
    }
    Ok(requested)
}

/// Which worker a path is dispatched to, selected by field-presence and
/// `TablePath` cardinality (spec §4.6 "Worker selection per path").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    /// `field != ""` and exactly one `TablePath`.
    SingleField,
    /// `field != ""` and multiple `TablePath`s (e.g. `COUNTERS/Ethernet*/xyz`
    /// expanded per-port).
    MultiField,
    /// `field == ""`.
    TableKey,
}

pub fn select_worker(paths: &[TablePath]) -> WorkerKind {
    let has_field = paths.first().map(|p| p.field.is_some()).unwrap_or(false);
    match (has_field, paths.len()) {
        (true, 1) => WorkerKind::SingleField,
        (true, _) => WorkerKind::MultiField,
        (false, _) => WorkerKind::TableKey,
    }
}
