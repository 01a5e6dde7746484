//! Get / `tableData2TypedValue` (spec §4.5): reads a resolved [`TablePath`]
//! and renders it into a `TypedValue` the gNMI peer receives.

use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiError, GnmiResult, JsonDocument, TablePath, TypedValue};
use std::path::Path;

/// `tableData2TypedValue`: if `field` is set, return a scalar (or
/// list-index slice) wrapped as JSON_IETF; otherwise accumulate all keys
/// for the path into a single JSON object, also JSON_IETF (spec §4.5).
pub async fn table_data_to_typed_value(redis: &dyn RedisOps, tp: &TablePath) -> GnmiResult<TypedValue> {
    let json = if let Some(field) = tp.field.as_deref() {
        let key = tp.redis_key();
        let fields = redis.hgetall(&key).await?;
        if fields.is_empty() && !redis.exists(&key).await? {
            return Err(GnmiError::not_found(format!("key '{key}' not found")));
        }
        let display_field = tp.display_field().unwrap_or(field);
        let value = match tp.index {
            Some(index) => sonic_gnmi_codec::list_index(&fields, field, index)?,
            None => sonic_gnmi_codec::scalar_or_list(&fields, field)
                .ok_or_else(|| GnmiError::not_found(format!("field '{field}' not found on '{key}'")))?,
        };
        serde_json::json!({ display_field: value })
    } else if let Some(key) = tp.table_key.as_deref() {
        let redis_key = tp.redis_key();
        let fields = redis.hgetall(&redis_key).await?;
        if fields.is_empty() && !redis.exists(&redis_key).await? {
            return Err(GnmiError::not_found(format!("key '{redis_key}' not found")));
        }
        let _ = key;
        sonic_gnmi_codec::render_entry(&fields)
    } else {
        let keys = redis.keys(&tp.key_glob()).await?;
        let mut entries = std::collections::HashMap::with_capacity(keys.len());
        let prefix = if tp.is_bare_counters_table() {
            tp.table_name.clone()
        } else {
            format!("{}{}", tp.table_name, tp.delimitor)
        };
        for full_key in keys {
            let fields = redis.hgetall(&full_key).await?;
            let bare_key = full_key.strip_prefix(&prefix).unwrap_or(&full_key).to_string();
            entries.insert(bare_key, fields);
        }
        sonic_gnmi_codec::render_table(&entries)
    };

    TypedValue::json_ietf(&json).map_err(|e| GnmiError::internal(format!("encode failed: {e}")))
}

/// Reads a `CONFIG_DB` path from a checkpoint document on disk, returning
/// `None` if the checkpoint file does not exist (the caller should then
/// fall back to live Redis reads).
pub fn get_from_checkpoint(checkpoint_file: &Path, path: &[String]) -> GnmiResult<Option<serde_json::Value>> {
    if !checkpoint_file.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(checkpoint_file)
        .map_err(|e| GnmiError::unavailable(format!("read checkpoint {}: {e}", checkpoint_file.display())))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| GnmiError::internal(format!("malformed checkpoint json: {e}")))?;
    let doc = JsonDocument::from_json(value)?;
    doc.get(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_gnmi_dbconfig::redis_ops::mock::FakeRedis;
    use sonic_gnmi_model::TablePath;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn field_read_wraps_scalar_in_json_ietf() {
        let redis = FakeRedis::new();
        redis.seed("PORT|Ethernet0", [("admin_status", "up")]).await;
        let tp = TablePath::table("", "", "CONFIG_DB", "PORT", '|')
            .with_key("Ethernet0")
            .with_field("admin_status");
        let value = table_data_to_typed_value(&redis, &tp).await.unwrap();
        match value {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(json, serde_json::json!({"admin_status": "up"}));
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn table_read_accumulates_every_key() {
        let redis = FakeRedis::new();
        redis.seed("PORT|Ethernet0", [("mtu", "9100")]).await;
        redis.seed("PORT|Ethernet4", [("mtu", "1500")]).await;
        let tp = TablePath::table("", "", "CONFIG_DB", "PORT", '|');
        let value = table_data_to_typed_value(&redis, &tp).await.unwrap();
        match value {
            TypedValue::JsonIetfVal(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(
                    json,
                    serde_json::json!({"Ethernet0": {"mtu": "9100"}, "Ethernet4": {"mtu": "1500"}})
                );
            }
            other => panic!("expected JsonIetfVal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let redis = FakeRedis::new();
        let tp = TablePath::table("", "", "CONFIG_DB", "PORT", '|').with_key("Ethernet8");
        let err = table_data_to_typed_value(&redis, &tp).await.unwrap_err();
        assert_eq!(err.status_code(), "not-found");
    }

    #[test]
    fn checkpoint_read_returns_none_when_file_absent() {
        let result = get_from_checkpoint(Path::new("/nonexistent/config.cp.json"), &["PORT".into()]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn checkpoint_read_serves_from_file_when_present() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"PORT": {"Ethernet0": {"mtu": "9100"}}}"#).unwrap();
        let value = get_from_checkpoint(file.path(), &["PORT".into(), "Ethernet0".into()])
            .unwrap()
            .unwrap();
        assert_eq!(value, serde_json::json!({"mtu": "9100"}));
    }
}
