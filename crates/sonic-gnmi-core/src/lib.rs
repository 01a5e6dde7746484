//! Facade wiring the DB registry, path resolver, priority queue, and the
//! read/subscribe/set engines into the one embeddable gNMI data-access
//! layer a tonic service implementation (out of scope here) sits on top of
//! (spec §1, §2 crate-to-component map).

pub mod capabilities;
pub mod dispatch;
pub mod get;

pub use capabilities::{supported_encodings, supported_models, Encoding, ModelData};
pub use dispatch::{classify_subscribe_request, RequestedMode};

use sonic_gnmi_dbconfig::{ClientFor, DbRegistry};
use sonic_gnmi_model::{GnmiResult, TypedValue, Value};
use sonic_gnmi_queue::PriorityQueue;
use sonic_gnmi_resolver::PathResolver;
use sonic_gnmi_set::SinkRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Every piece of process-wide state one gNMI data-access layer instance
/// needs, wired once at startup and shared across requests (spec §5 "Global
/// mutable Redis handle map" design note: expose as an injected interface,
/// never a process singleton — `GnmiCore` is constructed by the caller and
/// passed around, not reached for as a global).
pub struct GnmiCore {
    pub db_registry: DbRegistry,
    pub resolver: PathResolver,
    pub queue: Arc<PriorityQueue<Value>>,
    pub sinks: SinkRegistry,
    config_db_checkpoint: Option<PathBuf>,
}

impl GnmiCore {
    pub fn new(db_registry: DbRegistry, resolver: PathResolver, queue_max_bytes: usize) -> Self {
        Self {
            db_registry,
            resolver,
            queue: Arc::new(PriorityQueue::new(queue_max_bytes)),
            sinks: SinkRegistry::new(),
            config_db_checkpoint: None,
        }
    }

    /// Points Get at a `CONFIG_DB` checkpoint file, preferred over live
    /// Redis while it exists (spec §4.5).
    pub fn with_config_db_checkpoint(mut self, path: PathBuf) -> Self {
        self.config_db_checkpoint = Some(path);
        self
    }

    /// Runs a Get against `db_name` within `(db_namespace, db_container)`.
    pub async fn get(
        &self,
        db_namespace: &str,
        db_container: &str,
        db_name: &str,
        explicit_namespace: bool,
        elems: &[String],
    ) -> GnmiResult<Vec<TypedValue>> {
        let redis = self.db_registry.client_for(db_namespace, db_container, db_name)?;
        let delimitor = self.db_registry.config().table_key_separator(db_name, db_namespace)?;
        get::get(
            redis.as_ref(),
            &self.resolver,
            self.config_db_checkpoint.as_deref(),
            db_namespace,
            db_container,
            db_name,
            delimitor,
            explicit_namespace,
            elems,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_gnmi_dbconfig::redis_ops::mock::FakeRedis;
    use sonic_gnmi_dbconfig::{DbConfig, RedisOps};
    use serde_json::json;

    fn config() -> DbConfig {
        DbConfig::from_json(&json!({
            "INSTANCES": {"redis": {"hostname": "127.0.0.1", "port": 6379}},
            "DATABASES": {
                "CONFIG_DB": {"id": 4, "separator": "|", "instance": "redis"},
                "APPL_DB": {"id": 0, "separator": ":", "instance": "redis"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn get_reads_through_the_registry_and_resolver() {
        let fake = Arc::new(FakeRedis::new());
        fake.seed("PORT|Ethernet0", [("mtu", "9100")]).await;
        let db_registry = DbRegistry::from_clients(config(), vec![(("".into(), "".into(), "CONFIG_DB".into()), fake as Arc<dyn RedisOps>)]);
        let core = GnmiCore::new(db_registry, PathResolver::default(), 1 << 20);

        let values = core.get("", "", "CONFIG_DB", false, &["PORT".into(), "Ethernet0".into()]).await.unwrap();
        match &values[0] {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json, json!({"mtu": "9100"}));
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_against_an_unregistered_db_is_unavailable() {
        let db_registry = DbRegistry::from_clients(config(), vec![]);
        let core = GnmiCore::new(db_registry, PathResolver::default(), 1 << 20);
        let err = core.get("", "", "CONFIG_DB", false, &["PORT".into()]).await.unwrap_err();
        assert_eq!(err.status_code(), "unavailable");
    }
}
