//! Producer-state sink: the write side of `APPL_DB`/`DPU_APPL_DB` Set
//! requests (spec §4.8). The sink boundary is injected so the default
//! in-process writer and the optional ZMQ transport share one call shape.

pub mod retry;
pub mod table_set;
#[cfg(feature = "zmq-transport")]
pub mod zmq_sink;

use async_trait::async_trait;
use dashmap::DashMap;
use sonic_gnmi_dbconfig::{FieldValue, RedisOps};
use sonic_gnmi_model::GnmiResult;
use std::collections::HashMap;
use std::sync::Arc;

/// The `op` tag a producer-state write carries downstream (real SONiC
/// `ProducerStateTable`s distinguish `SET` from `DEL` on the wire even
/// though the in-process sink just picks the matching Redis verb).
pub const OP_SET: &str = "SET";
pub const OP_DEL: &str = "DEL";

#[async_trait]
pub trait ProducerStateSink: Send + Sync {
    async fn connect(&self) -> GnmiResult<()>;

    async fn set(&self, table: &str, key: &str, fields: &HashMap<String, FieldValue>, op: &str, tag: &str) -> GnmiResult<()>;

    async fn delete(&self, table: &str, key: &str, op: &str, tag: &str) -> GnmiResult<()>;
}

/// Default sink: writes straight into the target Redis DB via [`RedisOps`],
/// keying each producer-state row as `table<delimitor>key` (the same scheme
/// `TablePath::redis_key` uses for `APPL_DB`).
pub struct InProcessSink {
    redis: Arc<dyn RedisOps>,
    delimitor: char,
}

impl InProcessSink {
    pub fn new(redis: Arc<dyn RedisOps>, delimitor: char) -> Self {
        Self { redis, delimitor }
    }

    fn redis_key(&self, table: &str, key: &str) -> String {
        format!("{table}{}{key}", self.delimitor)
    }
}

#[async_trait]
impl ProducerStateSink for InProcessSink {
    async fn connect(&self) -> GnmiResult<()> {
        Ok(())
    }

    async fn set(&self, table: &str, key: &str, fields: &HashMap<String, FieldValue>, _op: &str, _tag: &str) -> GnmiResult<()> {
        self.redis.hset(&self.redis_key(table, key), fields).await
    }

    async fn delete(&self, table: &str, key: &str, _op: &str, _tag: &str) -> GnmiResult<()> {
        self.redis.del(&self.redis_key(table, key)).await
    }
}

/// Process-wide cache of sink instances keyed by transport address, so two
/// Set requests against the same downstream don't each open a fresh
/// connection (spec §5 "shared resources"). Mutation is confined to
/// `get_or_create`; callers never replace an entry once inserted.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: DashMap<String, Arc<dyn ProducerStateSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, address: &str, build: impl FnOnce() -> Arc<dyn ProducerStateSink>) -> Arc<dyn ProducerStateSink> {
        if let Some(existing) = self.sinks.get(address) {
            return existing.clone();
        }
        self.sinks.entry(address.to_string()).or_insert_with(build).clone()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
