//! `database_config.json`-shaped configuration (spec §4.1 / SPEC_FULL §4.1).
//!
//! A bare, single-ASIC deployment has exactly one `(namespace, container)`
//! pair, both empty strings. Smart-switch (DPU) deployments nest one level
//! deeper: a map of namespace -> container -> `{INSTANCES, DATABASES}`.

use serde::Deserialize;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub unix_socket_path: Option<String>,
    #[serde(default)]
    pub persistence_for_warm_boot: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub id: u8,
    pub separator: String,
    pub instance: String,
}

impl DatabaseConfig {
    pub fn separator_char(&self) -> GnmiResult<char> {
        let mut chars = self.separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(GnmiError::internal(format!(
                "separator '{}' is not a single character",
                self.separator
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawNamespaceConfig {
    #[serde(rename = "INSTANCES")]
    instances: HashMap<String, InstanceConfig>,
    #[serde(rename = "DATABASES")]
    databases: HashMap<String, DatabaseConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceConfig {
    pub instances: HashMap<String, InstanceConfig>,
    pub databases: HashMap<String, DatabaseConfig>,
}

impl From<RawNamespaceConfig> for NamespaceConfig {
    fn from(raw: RawNamespaceConfig) -> Self {
        Self {
            instances: raw.instances,
            databases: raw.databases,
        }
    }
}

/// The fully parsed DB configuration: one [`NamespaceConfig`] per
/// `(namespace, container)` pair.
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    namespaces: HashMap<(String, String), NamespaceConfig>,
}

impl DbConfig {
    /// Parses a `database_config.json` document. Supports both the flat,
    /// single-namespace form (top-level `INSTANCES`/`DATABASES` keys) and
    /// the nested multi-namespace/smart-switch form (top-level map of
    /// namespace name to either a flat config or a further map of
    /// container name to flat config).
    pub fn from_json(value: &serde_json::Value) -> GnmiResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| GnmiError::internal("db config root must be a JSON object"))?;

        let mut namespaces = HashMap::new();

        if obj.contains_key("INSTANCES") || obj.contains_key("DATABASES") {
            let raw: RawNamespaceConfig = serde_json::from_value(value.clone())
                .map_err(|e| GnmiError::internal(format!("malformed db config: {e}")))?;
            namespaces.insert((String::new(), String::new()), raw.into());
        } else {
            for (ns_name, ns_value) in obj {
                let ns_obj = ns_value
                    .as_object()
                    .ok_or_else(|| GnmiError::internal(format!("namespace '{ns_name}' is not an object")))?;
                if ns_obj.contains_key("INSTANCES") || ns_obj.contains_key("DATABASES") {
                    let raw: RawNamespaceConfig = serde_json::from_value(ns_value.clone())
                        .map_err(|e| GnmiError::internal(format!("malformed db config for namespace '{ns_name}': {e}")))?;
                    namespaces.insert((ns_name.clone(), String::new()), raw.into());
                } else {
                    for (container_name, container_value) in ns_obj {
                        let raw: RawNamespaceConfig = serde_json::from_value(container_value.clone())
                            .map_err(|e| {
                                GnmiError::internal(format!(
                                    "malformed db config for namespace '{ns_name}' container '{container_name}': {e}"
                                ))
                            })?;
                        namespaces.insert((ns_name.clone(), container_name.clone()), raw.into());
                    }
                }
            }
        }

        let config = Self { namespaces };
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> GnmiResult<Self> {
        let value: serde_json::Value = serde_json::from_reader(reader)
            .map_err(|e| GnmiError::internal(format!("failed to parse db config: {e}")))?;
        Self::from_json(&value)
    }

    fn validate(&self) -> GnmiResult<()> {
        for ((ns, container), cfg) in &self.namespaces {
            for (db_name, db_cfg) in &cfg.databases {
                db_cfg.separator_char().map_err(|_| {
                    GnmiError::internal(format!(
                        "db '{db_name}' in namespace '{ns}'/'{container}' has an invalid separator"
                    ))
                })?;
                if !cfg.instances.contains_key(&db_cfg.instance) {
                    return Err(GnmiError::internal(format!(
                        "db '{db_name}' references unknown instance '{}'",
                        db_cfg.instance
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut ns: Vec<String> = self.namespaces.keys().map(|(n, _)| n.clone()).collect();
        ns.sort();
        ns.dedup();
        ns
    }

    pub fn containers(&self, namespace: &str) -> Vec<String> {
        let mut containers: Vec<String> = self
            .namespaces
            .keys()
            .filter(|(n, _)| n == namespace)
            .map(|(_, c)| c.clone())
            .collect();
        containers.sort();
        containers
    }

    pub fn namespace_config(&self, namespace: &str, container: &str) -> GnmiResult<&NamespaceConfig> {
        self.namespaces
            .get(&(namespace.to_string(), container.to_string()))
            .ok_or_else(|| {
                GnmiError::invalid_argument(format!("unknown namespace/container '{namespace}'/'{container}'"))
            })
    }

    pub fn database(&self, namespace: &str, container: &str, db_name: &str) -> GnmiResult<&DatabaseConfig> {
        self.namespace_config(namespace, container)?
            .databases
            .get(db_name)
            .ok_or_else(|| GnmiError::invalid_argument(format!("unknown target db '{db_name}'")))
    }

    pub fn instance(&self, namespace: &str, container: &str, instance_name: &str) -> GnmiResult<&InstanceConfig> {
        self.namespace_config(namespace, container)?
            .instances
            .get(instance_name)
            .ok_or_else(|| GnmiError::internal(format!("unknown instance '{instance_name}'")))
    }

    /// `GetTableKeySeparator(dbName, namespace)`: the separator is
    /// determined solely by `(dbName, dbNamespace)` (spec §3 invariant).
    pub fn table_key_separator(&self, db_name: &str, namespace: &str) -> GnmiResult<char> {
        let container = self.containers(namespace).into_iter().next().unwrap_or_default();
        self.database(namespace, &container, db_name)?.separator_char()
    }

    /// `IsTargetDb(target)`: parses `<DB>` or `<DB>/<NS>` and validates
    /// that the database is listed. More than two parts is invalid.
    pub fn is_target_db(&self, target: &str) -> GnmiResult<(String, String)> {
        let parts: Vec<&str> = target.split('/').collect();
        let (db_name, namespace) = match parts.as_slice() {
            [db] => (db.to_string(), String::new()),
            [db, ns] => (db.to_string(), ns.to_string()),
            _ => {
                return Err(GnmiError::invalid_argument(format!(
                    "malformed target '{target}': expected '<DB>' or '<DB>/<NS>'"
                )))
            }
        };
        let container = self.containers(&namespace).into_iter().next().ok_or_else(|| {
            GnmiError::invalid_argument(format!("unknown-target: namespace '{namespace}' not configured"))
        })?;
        self.database(&namespace, &container, &db_name)
            .map_err(|_| GnmiError::invalid_argument(format!("unknown-target: db '{db_name}' not listed")))?;
        Ok((db_name, namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat_config() -> serde_json::Value {
        json!({
            "INSTANCES": {
                "redis": {"hostname": "127.0.0.1", "port": 6379, "unix_socket_path": "/var/run/redis/redis.sock"}
            },
            "DATABASES": {
                "APPL_DB": {"id": 0, "separator": ":", "instance": "redis"},
                "CONFIG_DB": {"id": 4, "separator": "|", "instance": "redis"},
                "COUNTERS_DB": {"id": 2, "separator": ":", "instance": "redis"},
                "STATE_DB": {"id": 6, "separator": "|", "instance": "redis"}
            }
        })
    }

    #[test]
    fn parses_flat_single_namespace_config() {
        let cfg = DbConfig::from_json(&flat_config()).unwrap();
        assert_eq!(cfg.namespaces(), vec![""]);
        assert_eq!(cfg.database("", "", "CONFIG_DB").unwrap().separator, "|");
    }

    #[test]
    fn table_key_separator_matches_db_and_namespace() {
        let cfg = DbConfig::from_json(&flat_config()).unwrap();
        assert_eq!(cfg.table_key_separator("CONFIG_DB", "").unwrap(), '|');
        assert_eq!(cfg.table_key_separator("APPL_DB", "").unwrap(), ':');
    }

    #[test]
    fn is_target_db_accepts_bare_and_namespaced_targets() {
        let cfg = DbConfig::from_json(&flat_config()).unwrap();
        assert_eq!(cfg.is_target_db("CONFIG_DB").unwrap(), ("CONFIG_DB".to_string(), String::new()));
        assert!(cfg.is_target_db("CONFIG_DB/asic0").is_err());
    }

    #[test]
    fn is_target_db_rejects_more_than_two_parts() {
        let cfg = DbConfig::from_json(&flat_config()).unwrap();
        let err = cfg.is_target_db("CONFIG_DB/ns/extra").unwrap_err();
        assert_eq!(err.status_code(), "invalid-argument");
    }

    #[test]
    fn is_target_db_rejects_unknown_db() {
        let cfg = DbConfig::from_json(&flat_config()).unwrap();
        let err = cfg.is_target_db("NOT_A_DB").unwrap_err();
        assert_eq!(err.status_code(), "invalid-argument");
    }

    #[test]
    fn rejects_db_with_unknown_instance_reference() {
        let mut bad = flat_config();
        bad["DATABASES"]["APPL_DB"]["instance"] = json!("nonexistent");
        assert!(DbConfig::from_json(&bad).is_err());
    }

    #[test]
    fn parses_nested_multi_namespace_config() {
        let nested = json!({
            "asic0": flat_config(),
            "asic1": flat_config(),
        });
        let cfg = DbConfig::from_json(&nested).unwrap();
        let mut namespaces = cfg.namespaces();
        namespaces.sort();
        assert_eq!(namespaces, vec!["asic0".to_string(), "asic1".to_string()]);
    }
}
