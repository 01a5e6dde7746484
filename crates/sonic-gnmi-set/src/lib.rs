//! Set engine: the write side of the gNMI data-access layer (spec §4.8).
//!
//! Two dispatchers by target DB: `CONFIG_DB` goes through an incremental
//! JSON-patch-over-checkpoint pipeline (or, for a full-config replacement,
//! straight to YANG validation); `APPL_DB`/`DPU_APPL_DB` writes go directly
//! to the injected [`sink::ProducerStateSink`].

pub mod checkpoint;
pub mod config_service;
pub mod sink;

use sonic_gnmi_model::{GnmiError, GnmiResult};

pub use checkpoint::{
    run_config_db_set, run_incremental_set, ConfigSetOp, ConfigSetRequest, IncrementalPatch, JsonPatchOp,
};
pub use config_service::ConfigServiceClient;
pub use sink::{table_set, ProducerStateSink, SinkRegistry};

/// Dispatches one gNMI Set request to the right pipeline, keyed off the
/// resolved target DB name (spec §4.8 "Two dispatchers by target DB").
pub fn dispatch_for_db(db_name: &str) -> GnmiResult<SetDispatch> {
    match db_name {
        "CONFIG_DB" => Ok(SetDispatch::Config),
        "APPL_DB" | "DPU_APPL_DB" => Ok(SetDispatch::ProducerState),
        other => Err(GnmiError::invalid_argument(format!(
            "'{other}' does not support Set in this data-access layer"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetDispatch {
    Config,
    ProducerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_db_dispatches_to_config_pipeline() {
        assert_eq!(dispatch_for_db("CONFIG_DB").unwrap(), SetDispatch::Config);
    }

    #[test]
    fn appl_db_dispatches_to_producer_state() {
        assert_eq!(dispatch_for_db("APPL_DB").unwrap(), SetDispatch::ProducerState);
        assert_eq!(dispatch_for_db("DPU_APPL_DB").unwrap(), SetDispatch::ProducerState);
    }

    #[test]
    fn other_dbs_are_rejected() {
        let err = dispatch_for_db("COUNTERS_DB").unwrap_err();
        assert_eq!(err.status_code(), "invalid-argument");
    }
}
