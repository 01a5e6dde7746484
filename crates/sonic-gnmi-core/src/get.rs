//! Top-level Get: resolves a path, then for `CONFIG_DB` prefers a
//! checkpoint file over live Redis when one exists, falling back to Redis
//! otherwise (spec §4.5 "For `CONFIG_DB` Get, if a checkpoint file exists,
//! serve from it ... instead of Redis").

use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiResult, TablePath, TypedValue};
use sonic_gnmi_resolver::PathResolver;
use std::path::Path;

/// Builds the `JsonDocument`-style path (0-4 elements) a resolved
/// `TablePath` addresses, for checkpoint lookups (mirrors
/// `sonic-gnmi-set::checkpoint`'s addressing scheme on the read side).
fn json_doc_path(tp: &TablePath) -> Vec<String> {
    let mut path = vec![tp.table_name.clone()];
    if let Some(key) = &tp.table_key {
        path.push(key.clone());
    }
    if let Some(field) = &tp.field {
        path.push(field.clone());
    }
    if let Some(index) = tp.index {
        path.push(index.to_string());
    }
    path
}

/// Resolves `elems` within the given database and reads every resulting
/// `TablePath`, serving `CONFIG_DB` reads from `checkpoint_file` when it is
/// present.
#[allow(clippy::too_many_arguments)]
pub async fn get(
    redis: &dyn RedisOps,
    resolver: &PathResolver,
    checkpoint_file: Option<&Path>,
    db_namespace: &str,
    db_container: &str,
    db_name: &str,
    delimitor: char,
    explicit_namespace: bool,
    elems: &[String],
) -> GnmiResult<Vec<TypedValue>> {
    let resolved = resolver
        .resolve(redis, db_namespace, db_container, db_name, delimitor, explicit_namespace, elems)
        .await?;

    let mut values = Vec::with_capacity(resolved.len());
    for tp in &resolved {
        let from_checkpoint = if db_name == "CONFIG_DB" {
            match checkpoint_file {
                Some(file) => sonic_gnmi_read::get_from_checkpoint(file, &json_doc_path(tp))?,
                None => None,
            }
        } else {
            None
        };

        let value = match from_checkpoint {
            Some(json) => TypedValue::json_ietf(&json).map_err(|e| sonic_gnmi_model::GnmiError::internal(format!("encode failed: {e}")))?,
            None => sonic_gnmi_read::table_data_to_typed_value(redis, tp).await?,
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_gnmi_dbconfig::redis_ops::mock::FakeRedis;
    use tempfile::NamedTempFile;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn config_db_serves_from_checkpoint_when_present() {
        let redis = FakeRedis::new();
        redis.seed("PORT|Ethernet0", [("mtu", "1500")]).await;
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"PORT": {"Ethernet0": {"mtu": "9100"}}}"#).unwrap();

        let resolver = PathResolver::default();
        let values = get(
            &redis,
            &resolver,
            Some(file.path()),
            "",
            "",
            "CONFIG_DB",
            '|',
            false,
            &names(&["PORT", "Ethernet0"]),
        )
        .await
        .unwrap();

        match &values[0] {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json, serde_json::json!({"mtu": "9100"}));
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn config_db_falls_back_to_redis_when_no_checkpoint_file() {
        let redis = FakeRedis::new();
        redis.seed("PORT|Ethernet0", [("mtu", "1500")]).await;
        let resolver = PathResolver::default();
        let values = get(&redis, &resolver, None, "", "", "CONFIG_DB", '|', false, &names(&["PORT", "Ethernet0"]))
            .await
            .unwrap();

        match &values[0] {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json, serde_json::json!({"mtu": "1500"}));
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn appl_db_never_consults_a_checkpoint_file() {
        let redis = FakeRedis::new();
        redis.seed("PORT_TABLE:Ethernet0", [("admin_status", "up")]).await;
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"PORT_TABLE": {"Ethernet0": {"admin_status": "down"}}}"#).unwrap();

        let resolver = PathResolver::default();
        let values = get(
            &redis,
            &resolver,
            Some(file.path()),
            "",
            "",
            "APPL_DB",
            ':',
            false,
            &names(&["PORT_TABLE", "Ethernet0"]),
        )
        .await
        .unwrap();

        match &values[0] {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(json, serde_json::json!({"admin_status": "up"}));
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }
}
