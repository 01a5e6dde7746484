//! Table-key subscriber: one path covering a whole table or key pattern,
//! keyspace-notification driven (spec §4.6.3).

use crate::keyspace::{run_listener, KeyspaceSource, KeyspaceUpdate, ListenerSpec};
use crate::mode::SubscriptionMode;
use crate::state::{StopHandle, SyncSignaller};
use crate::worker::multi_field::UpdatesOnly;
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiPath, PathElem, TablePath, TypedValue, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn listener_spec(tp: &TablePath, db_number: u8) -> ListenerSpec {
    let table_prefix = if tp.is_bare_counters_table() {
        tp.table_name.clone()
    } else {
        format!("{}{}", tp.table_name, tp.delimitor)
    };
    let key_or_star = tp.table_key.clone().unwrap_or_else(|| "*".to_string());
    ListenerSpec {
        db_number,
        table_prefix,
        key_or_star,
    }
}

async fn snapshot(redis: &dyn RedisOps, tp: &TablePath) -> HashMap<String, HashMap<String, String>> {
    let prefix = if tp.is_bare_counters_table() {
        tp.table_name.clone()
    } else {
        format!("{}{}", tp.table_name, tp.delimitor)
    };
    let keys = redis.keys(&tp.key_glob()).await.unwrap_or_default();
    let mut out = HashMap::with_capacity(keys.len());
    for full_key in keys {
        let bare = full_key.strip_prefix(&prefix).unwrap_or(&full_key).to_string();
        let fields = redis.hgetall(&full_key).await.unwrap_or_default();
        out.insert(bare, fields);
    }
    out
}

fn emit_value(path: &GnmiPath, entries: &HashMap<String, HashMap<String, String>>, deletes: Vec<String>, timestamp_ns: i64) -> Value {
    let rendered: HashMap<&String, serde_json::Value> = entries
        .iter()
        .map(|(k, v)| (k, sonic_gnmi_codec::render_entry(v)))
        .collect();
    let json = serde_json::to_value(&rendered).unwrap_or(serde_json::json!({}));
    let typed = TypedValue::json_ietf(&json).unwrap_or_else(|_| TypedValue::StringVal(String::new()));
    let mut v = Value::new(timestamp_ns, Some(path.clone()), Some(typed));
    v.deletes = deletes
        .into_iter()
        .map(|k| {
            let mut p = path.clone();
            p.elem.push(PathElem::new(k));
            p
        })
        .collect();
    v
}

/// Runs the table-key subscriber until stop.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    redis: Arc<dyn RedisOps>,
    keyspace_source: Arc<dyn KeyspaceSource>,
    tp: TablePath,
    db_number: u8,
    path: GnmiPath,
    mode: SubscriptionMode,
    interval: Duration,
    updates_only: UpdatesOnly,
    mut stop: StopHandle,
    sync: SyncSignaller,
    out: mpsc::Sender<Value>,
    mut now_ns: impl FnMut() -> i64,
) {
    let mut msi_all = snapshot(redis.as_ref(), &tp).await;
    let _ = out.send(emit_value(&path, &msi_all, Vec::new(), now_ns())).await;
    sync.signal().await;

    let (update_tx, mut update_rx) = mpsc::channel::<KeyspaceUpdate>(256);
    let spec = listener_spec(&tp, db_number);
    let listener_stop = stop.clone();
    let listener = tokio::spawn(run_listener(keyspace_source, redis.clone(), spec, listener_stop, update_tx));

    // Only SAMPLE mode ticks; ON_CHANGE subscriptions carry `interval ==
    // Duration::ZERO` on the wire (spec §4.6.3), and `tokio::time::interval`
    // panics on a zero period, so the ticker is never built outside SAMPLE.
    let mut ticker = (mode == SubscriptionMode::Sample).then(|| tokio::time::interval(interval));
    if let Some(t) = ticker.as_mut() {
        t.tick().await; // consume the immediate first tick
    }

    loop {
        tokio::select! {
            _ = stop.wait_for_stop() => break,
            update = update_rx.recv() => {
                match update {
                    Some(KeyspaceUpdate { key, fields: None }) => {
                        msi_all.remove(&key);
                        if mode == SubscriptionMode::OnChange {
                            let _ = out.send(emit_value(&path, &HashMap::new(), vec![key], now_ns())).await;
                        }
                    }
                    Some(KeyspaceUpdate { key, fields: Some(fields) }) => {
                        msi_all.insert(key.clone(), fields.clone());
                        if mode == SubscriptionMode::OnChange {
                            let mut single = HashMap::new();
                            single.insert(key, fields);
                            let _ = out.send(emit_value(&path, &single, Vec::new(), now_ns())).await;
                        }
                    }
                    None => break,
                }
            }
            _ = async { ticker.as_mut().unwrap().tick().await }, if ticker.is_some() => {
                let _ = out.send(emit_value(&path, &msi_all, Vec::new(), now_ns())).await;
                if updates_only.0 {
                    msi_all.clear();
                }
            }
        }
    }

    listener.abort();
}
