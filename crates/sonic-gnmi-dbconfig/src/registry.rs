//! `DbRegistry`: one Redis handle per `(namespace, container, dbName)`.
//!
//! Per spec §9's design note, this is modelled as an injected object
//! (`ClientFor`), never a process singleton, so tests can substitute fakes.

use crate::config::DbConfig;
use crate::redis_ops::{RedisAddr, RedisConnection, RedisOps};
use dashmap::DashMap;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::sync::Arc;

/// Lookup surface: `(namespace, container, dbName) -> handle`.
pub trait ClientFor: Send + Sync {
    fn client_for(&self, namespace: &str, container: &str, db_name: &str) -> GnmiResult<Arc<dyn RedisOps>>;
}

/// A registry built once from [`DbConfig`] at startup, cheap to clone
/// (internally `Arc`-backed).
#[derive(Clone)]
pub struct DbRegistry {
    config: Arc<DbConfig>,
    clients: Arc<DashMap<(String, String, String), Arc<dyn RedisOps>>>,
}

impl DbRegistry {
    /// Connects every `(namespace, container, dbName)` triple eagerly. Logs
    /// a warning (non-fatal, lazy reconnect on next use) per unreachable
    /// instance rather than failing the whole registry.
    pub async fn connect(config: DbConfig) -> GnmiResult<Self> {
        let clients = DashMap::new();
        let mut connected = 0usize;
        let namespaces = config.namespaces();
        for namespace in &namespaces {
            for container in config.containers(namespace) {
                let ns_cfg = config.namespace_config(namespace, &container)?;
                for (db_name, db_cfg) in &ns_cfg.databases {
                    let instance = ns_cfg.instances.get(&db_cfg.instance).ok_or_else(|| {
                        GnmiError::internal(format!("db '{db_name}' references unknown instance"))
                    })?;
                    let addr = if let Some(path) = &instance.unix_socket_path {
                        RedisAddr::Unix(path.clone())
                    } else {
                        RedisAddr::Tcp {
                            hostname: instance.hostname.clone(),
                            port: instance.port,
                        }
                    };
                    match RedisConnection::connect(&addr, db_cfg.id).await {
                        Ok(conn) => {
                            clients.insert(
                                (namespace.clone(), container.clone(), db_name.clone()),
                                Arc::new(conn) as Arc<dyn RedisOps>,
                            );
                            connected += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                namespace = %namespace,
                                container = %container,
                                db = %db_name,
                                error = %e,
                                "db instance unreachable at startup; will lazily reconnect on next use"
                            );
                        }
                    }
                }
            }
        }
        tracing::info!(
            instances = connected,
            namespaces = namespaces.len(),
            "db registry constructed"
        );
        Ok(Self {
            config: Arc::new(config),
            clients: Arc::new(clients),
        })
    }

    /// Builds a registry directly from pre-built clients, bypassing real
    /// Redis connections entirely — the path unit tests use.
    pub fn from_clients(config: DbConfig, clients: Vec<((String, String, String), Arc<dyn RedisOps>)>) -> Self {
        let map = DashMap::new();
        for (key, client) in clients {
            map.insert(key, client);
        }
        Self {
            config: Arc::new(config),
            clients: Arc::new(map),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

impl ClientFor for DbRegistry {
    fn client_for(&self, namespace: &str, container: &str, db_name: &str) -> GnmiResult<Arc<dyn RedisOps>> {
        self.clients
            .get(&(namespace.to_string(), container.to_string(), db_name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                GnmiError::unavailable(format!(
                    "no connected redis handle for {db_name}@{namespace}/{container}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis_ops::mock::FakeRedis;
    use serde_json::json;

    fn config() -> DbConfig {
        DbConfig::from_json(&json!({
            "INSTANCES": {"redis": {"hostname": "127.0.0.1", "port": 6379}},
            "DATABASES": {
                "APPL_DB": {"id": 0, "separator": ":", "instance": "redis"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn client_for_missing_entry_is_unavailable() {
        let registry = DbRegistry::from_clients(config(), vec![]);
        let err = registry.client_for("", "", "APPL_DB").unwrap_err();
        assert_eq!(err.status_code(), "unavailable");
    }

    #[test]
    fn client_for_returns_injected_fake() {
        let fake: Arc<dyn RedisOps> = Arc::new(FakeRedis::new());
        let registry = DbRegistry::from_clients(config(), vec![(("".into(), "".into(), "APPL_DB".into()), fake)]);
        assert!(registry.client_for("", "", "APPL_DB").is_ok());
    }
}
