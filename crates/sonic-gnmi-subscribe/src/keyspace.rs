//! Keyspace-notification listener (spec §4.6.3 steps 1-4, §4.7).
//!
//! Translates raw Redis pub/sub messages on
//! `__keyspace@<db-number>__:<key>` into a canonical update: deleted keys
//! carry `fields: None` (the sentinel the table-key subscriber turns into a
//! gNMI delete); updated keys carry their re-read hash. Consecutive
//! identical `hset` notifications are coalesced (deep-equal against the
//! last emitted hash) to reduce downstream traffic.

use async_trait::async_trait;
use futures_util::StreamExt;
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::state::StopHandle;

/// One raw keyspace-notification message as delivered by Redis pub/sub.
#[derive(Debug, Clone)]
pub struct RawKeyspaceMessage {
    /// Full channel name, e.g. `__keyspace@4__:PORT|Ethernet0`.
    pub channel: String,
    /// Event name: `hset`, `hdel`, `del`, etc.
    pub event: String,
}

/// Subscribes to a keyspace pattern and streams raw messages. The real
/// implementation wraps `redis::aio::PubSub::psubscribe`.
#[async_trait]
pub trait KeyspaceSource: Send + Sync {
    async fn psubscribe(&self, pattern: &str) -> GnmiResult<mpsc::Receiver<RawKeyspaceMessage>>;
}

/// Real keyspace-notification source over `redis::aio::PubSub`. Each
/// `psubscribe` call opens its own dedicated pub/sub connection and spawns
/// one forwarding task, matching spec §4.6.3 step 3's "one listener
/// goroutine per subscribed pattern" (a `PubSub` connection is not shared
/// across patterns the way a regular command connection is).
pub struct RedisKeyspaceSource {
    client: redis::Client,
}

impl RedisKeyspaceSource {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyspaceSource for RedisKeyspaceSource {
    async fn psubscribe(&self, pattern: &str) -> GnmiResult<mpsc::Receiver<RawKeyspaceMessage>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| GnmiError::unavailable(format!("keyspace pubsub connect: {e}")))?;
        pubsub
            .psubscribe(pattern)
            .await
            .map_err(|e| GnmiError::unavailable(format!("PSUBSCRIBE {pattern}: {e}")))?;

        let (tx, rx) = mpsc::channel(256);
        let pattern = pattern.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let channel = msg.get_channel_name().to_string();
                let event: String = msg.get_payload().unwrap_or_default();
                if tx.send(RawKeyspaceMessage { channel, event }).await.is_err() {
                    break;
                }
            }
            tracing::debug!(pattern, "keyspace pubsub stream ended");
        });
        Ok(rx)
    }
}

/// A canonical update emitted by the listener: `fields: None` is a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyspaceUpdate {
    pub key: String,
    pub fields: Option<HashMap<String, String>>,
}

/// Everything needed to construct the psubscribe pattern and reconstruct
/// full Redis keys from channel-name suffixes (spec §4.6.3 step 1).
#[derive(Debug, Clone)]
pub struct ListenerSpec {
    pub db_number: u8,
    /// The Redis key prefix including any trailing separator, e.g. `PORT|`
    /// or (bare counters tables) `COUNTERS_PORT_NAME_MAP` with no
    /// separator.
    pub table_prefix: String,
    /// `*` for a whole-table subscription, or a specific key.
    pub key_or_star: String,
}

impl ListenerSpec {
    fn pattern(&self) -> String {
        format!("__keyspace@{}__:{}{}", self.db_number, self.table_prefix, self.key_or_star)
    }

    fn channel_prefix(&self) -> String {
        format!("__keyspace@{}__:{}", self.db_number, self.table_prefix)
    }

    fn full_key(&self, suffix: &str) -> String {
        format!("{}{}", self.table_prefix, suffix)
    }
}

/// 500 ms receive timeout, observed cooperatively alongside the stop
/// signal (spec §4.6.3 step 3, §5).
const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Runs one listener goroutine-equivalent for a single pattern, emitting
/// coalesced [`KeyspaceUpdate`]s into `out` until the stop signal fires or
/// the source channel closes.
pub async fn run_listener(
    source: Arc<dyn KeyspaceSource>,
    redis: Arc<dyn RedisOps>,
    spec: ListenerSpec,
    mut stop: StopHandle,
    out: mpsc::Sender<KeyspaceUpdate>,
) -> GnmiResult<()> {
    let mut rx = source.psubscribe(&spec.pattern()).await?;
    let prefix = spec.channel_prefix();
    let mut last_hset: HashMap<String, HashMap<String, String>> = HashMap::new();

    loop {
        if stop.is_stopped() {
            return Ok(());
        }
        tokio::select! {
            _ = stop.wait_for_stop() => return Ok(()),
            received = tokio::time::timeout(RECEIVE_TIMEOUT, rx.recv()) => {
                match received {
                    Ok(Some(msg)) => {
                        let Some(key) = msg.channel.strip_prefix(&prefix) else { continue };
                        let key = key.to_string();
                        match msg.event.as_str() {
                            "del" | "hdel" => {
                                last_hset.remove(&key);
                                if out.send(KeyspaceUpdate { key, fields: None }).await.is_err() {
                                    return Ok(());
                                }
                            }
                            "hset" => {
                                let full_key = spec.full_key(&key);
                                let fields = redis.hgetall(&full_key).await?;
                                if last_hset.get(&key) != Some(&fields) {
                                    last_hset.insert(key.clone(), fields.clone());
                                    if out.send(KeyspaceUpdate { key, fields: Some(fields) }).await.is_err() {
                                        return Ok(());
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Ok(None) => return Ok(()),
                    Err(_timeout_elapsed) => continue,
                }
            }
        }
    }
}
