//! StreamRun dispatch rules as one reusable function, so the external gRPC
//! layer applies spec §4.6's dial-out / per-subscription mode selection
//! consistently instead of re-deriving it per caller.

use sonic_gnmi_subscribe::SubscriptionMode;

/// The subscription mode a single gNMI `SubscriptionList` entry requested
/// on the wire, before dial-out override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedMode {
    OnChange,
    Sample,
    /// Any other gNMI `SubscriptionMode` (e.g. `TARGET_DEFINED`): unsupported
    /// by this data-access layer.
    Other,
}

/// Applies spec §4.6's StreamRun dispatch rule: a dial-out request (no
/// subscriptions list) forces every path to ON_CHANGE regardless of what
/// was asked; otherwise the per-subscription mode is mapped directly, and
/// anything other than `SAMPLE`/`ON_CHANGE` is unsupported.
pub fn classify_subscribe_request(dial_out: bool, requested: RequestedMode) -> SubscriptionMode {
    if dial_out {
        return SubscriptionMode::OnChange;
    }
    match requested {
        RequestedMode::OnChange => SubscriptionMode::OnChange,
        RequestedMode::Sample => SubscriptionMode::Sample,
        RequestedMode::Other => SubscriptionMode::Unsupported,
    }
}
