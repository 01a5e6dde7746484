//! Translates one resolved `APPL_DB`/`DPU_APPL_DB` set into producer-state
//! sink calls (spec §4.8 "APPL_DB / DPU_APPL_DB"): a delete at table+key is
//! a `DEL`; an add with a key decodes the JSON value into fields and is a
//! single `SET`; an add without a key is a bulk `{key: {field: value}}`
//! document and becomes one `SET` per key. Updating a single field is not
//! supported on this path.

use crate::sink::retry::{with_retry, RetryPolicy};
use crate::sink::{ProducerStateSink, OP_DEL, OP_SET};
use sonic_gnmi_model::{GnmiError, GnmiResult, TablePath, TablePathOp};

/// Applies one resolved `APPL_DB`/`DPU_APPL_DB` set against `sink`, with the
/// sink's own `connect()` as the reconnect hook the retry policy calls on a
/// transport reset (spec §4.8 "Retry policy for the sink").
pub async fn apply(sink: &dyn ProducerStateSink, tp: &TablePath) -> GnmiResult<()> {
    apply_with_policy(sink, tp, &RetryPolicy::default()).await
}

pub async fn apply_with_policy(sink: &dyn ProducerStateSink, tp: &TablePath, policy: &RetryPolicy) -> GnmiResult<()> {
    match tp.operation {
        TablePathOp::Remove => {
            let key = tp
                .table_key
                .as_deref()
                .ok_or_else(|| GnmiError::invalid_argument("producer-state delete requires a key"))?;
            with_retry(policy, || sink.delete(&tp.table_name, key, OP_DEL, ""), || sink.connect()).await
        }
        TablePathOp::Add => {
            if tp.field.is_some() {
                return Err(GnmiError::invalid_argument(
                    "updating a single field on a producer-state table is not supported",
                ));
            }
            let value = tp
                .json_value
                .as_ref()
                .ok_or_else(|| GnmiError::invalid_argument("producer-state add requires a value"))?;

            match &tp.table_key {
                Some(key) => {
                    let fields = sonic_gnmi_codec::decode_fields(value)?;
                    with_retry(policy, || sink.set(&tp.table_name, key, &fields, OP_SET, ""), || sink.connect()).await
                }
                None => {
                    let bulk = sonic_gnmi_codec::decode_bulk(value)?;
                    for (key, fields) in bulk {
                        with_retry(policy, || sink.set(&tp.table_name, &key, &fields, OP_SET, ""), || sink.connect()).await?;
                    }
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InProcessSink;
    use serde_json::json;
    use sonic_gnmi_dbconfig::redis_ops::mock::FakeRedis;
    use std::sync::Arc;

    fn appl_db_table(table: &str) -> TablePath {
        TablePath::table("", "", "APPL_DB", table, ':')
    }

    #[tokio::test]
    async fn add_with_key_decodes_fields_and_sets_one_row() {
        let redis = Arc::new(FakeRedis::new());
        let sink = InProcessSink::new(redis.clone(), ':');
        let mut tp = appl_db_table("PORT_TABLE").with_key("Ethernet0");
        tp.json_value = Some(json!({"admin_status": "up", "mtu": "9100"}));

        apply(&sink, &tp).await.unwrap();

        assert_eq!(redis.hget("PORT_TABLE:Ethernet0", "admin_status").await.unwrap(), Some("up".to_string()));
        assert_eq!(redis.hget("PORT_TABLE:Ethernet0", "mtu").await.unwrap(), Some("9100".to_string()));
    }

    #[tokio::test]
    async fn add_without_key_is_a_bulk_write_per_key() {
        let redis = Arc::new(FakeRedis::new());
        let sink = InProcessSink::new(redis.clone(), ':');
        let mut tp = appl_db_table("NEIGH_TABLE");
        tp.json_value = Some(json!({
            "Ethernet0": {"neigh": "00:11:22:33:44:55"},
            "Ethernet4": {"neigh": "00:11:22:33:44:66"}
        }));

        apply(&sink, &tp).await.unwrap();

        assert_eq!(redis.hget("NEIGH_TABLE:Ethernet0", "neigh").await.unwrap(), Some("00:11:22:33:44:55".to_string()));
        assert_eq!(redis.hget("NEIGH_TABLE:Ethernet4", "neigh").await.unwrap(), Some("00:11:22:33:44:66".to_string()));
    }

    #[tokio::test]
    async fn delete_at_table_and_key_removes_the_row() {
        let redis = Arc::new(FakeRedis::new());
        redis.seed("PORT_TABLE:Ethernet0", [("admin_status", "up")]).await;
        let sink = InProcessSink::new(redis.clone(), ':');
        let mut tp = appl_db_table("PORT_TABLE").with_key("Ethernet0");
        tp.operation = TablePathOp::Remove;

        apply(&sink, &tp).await.unwrap();

        assert!(!redis.exists("PORT_TABLE:Ethernet0").await.unwrap());
    }

    #[tokio::test]
    async fn delete_without_key_is_rejected() {
        let redis = Arc::new(FakeRedis::new());
        let sink = InProcessSink::new(redis, ':');
        let mut tp = appl_db_table("PORT_TABLE");
        tp.operation = TablePathOp::Remove;

        let err = apply(&sink, &tp).await.unwrap_err();
        assert_eq!(err.status_code(), "invalid-argument");
    }

    #[tokio::test]
    async fn updating_a_single_field_is_unsupported() {
        let redis = Arc::new(FakeRedis::new());
        let sink = InProcessSink::new(redis, ':');
        let mut tp = appl_db_table("PORT_TABLE").with_key("Ethernet0").with_field("mtu");
        tp.json_value = Some(json!("9100"));

        let err = apply(&sink, &tp).await.unwrap_err();
        assert_eq!(err.status_code(), "invalid-argument");
    }

    /// A sink whose first `set`/`delete` call reports a transport reset,
    /// then succeeds — exercises spec §4.8's "reconnect and retry" policy
    /// through `apply`, not just `with_retry` in isolation.
    struct FlakyOnceSink {
        inner: InProcessSink,
        failed_once: std::sync::atomic::AtomicBool,
        reconnects: std::sync::atomic::AtomicU32,
    }

    impl FlakyOnceSink {
        fn new(redis: Arc<dyn sonic_gnmi_dbconfig::RedisOps>) -> Self {
            Self {
                inner: InProcessSink::new(redis, ':'),
                failed_once: std::sync::atomic::AtomicBool::new(false),
                reconnects: std::sync::atomic::AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ProducerStateSink for FlakyOnceSink {
        async fn connect(&self) -> GnmiResult<()> {
            self.reconnects.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn set(
            &self,
            table: &str,
            key: &str,
            fields: &std::collections::HashMap<String, sonic_gnmi_dbconfig::FieldValue>,
            op: &str,
            tag: &str,
        ) -> GnmiResult<()> {
            if !self.failed_once.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(GnmiError::unavailable("connection reset by peer"));
            }
            self.inner.set(table, key, fields, op, tag).await
        }

        async fn delete(&self, table: &str, key: &str, op: &str, tag: &str) -> GnmiResult<()> {
            self.inner.delete(table, key, op, tag).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn apply_retries_a_set_after_a_transport_reset() {
        let redis = Arc::new(FakeRedis::new());
        let sink = FlakyOnceSink::new(redis.clone());
        let mut tp = appl_db_table("PORT_TABLE").with_key("Ethernet0");
        tp.json_value = Some(json!({"admin_status": "up"}));

        apply(&sink, &tp).await.unwrap();

        assert_eq!(redis.hget("PORT_TABLE:Ethernet0", "admin_status").await.unwrap(), Some("up".to_string()));
        assert_eq!(sink.reconnects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
