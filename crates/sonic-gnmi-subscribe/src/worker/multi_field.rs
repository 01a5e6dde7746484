//! Multi-field subscriber: one gNMI path expanded into several `TablePath`s
//! sharing the same field (e.g. `COUNTERS/Ethernet*/xyz`), spec §4.6.2.

use crate::mode::SubscriptionMode;
use crate::state::{StopHandle, SyncSignaller};
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiPath, TablePath, TypedValue, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatesOnly(pub bool);

pub async fn run(
    redis: &dyn RedisOps,
    paths: &[TablePath],
    path: GnmiPath,
    mode: SubscriptionMode,
    interval: Duration,
    updates_only: UpdatesOnly,
    mut stop: StopHandle,
    sync: SyncSignaller,
    out: mpsc::Sender<Value>,
    mut now_ns: impl FnMut() -> i64,
) {
    let mut last: HashMap<usize, String> = HashMap::new();

    let initial = tick(redis, paths, &mut last, mode, updates_only, true).await;
    let _ = out.send(aggregate_value(&path, &initial, now_ns())).await;
    sync.signal().await;

    loop {
        tokio::select! {
            _ = stop.wait_for_stop() => return,
            _ = tokio::time::sleep(interval) => {
                let changes = tick(redis, paths, &mut last, mode, updates_only, false).await;
                if !changes.is_empty() || (mode == SubscriptionMode::Sample && !updates_only.0) {
                    let _ = out.send(aggregate_value(&path, &changes, now_ns())).await;
                }
            }
        }
    }
}

/// One sweep over every resolved `TablePath`: reads each via `HGET`, skips
/// unchanged entries in ON_CHANGE / updates-only SAMPLE, accumulates the
/// rest into `{jsonTableKey: {jsonField: value}}`.
async fn tick(
    redis: &dyn RedisOps,
    paths: &[TablePath],
    last: &mut HashMap<usize, String>,
    mode: SubscriptionMode,
    updates_only: UpdatesOnly,
    force_all: bool,
) -> HashMap<String, HashMap<String, String>> {
    let mut out = HashMap::new();
    for (i, tp) in paths.iter().enumerate() {
        let field = tp.field.clone().unwrap_or_default();
        let value = redis.hget(&tp.redis_key(), &field).await.ok().flatten().unwrap_or_default();
        let changed = last.get(&i) != Some(&value);
        let skip_unchanged = !force_all && (mode == SubscriptionMode::OnChange || updates_only.0);
        if skip_unchanged && !changed {
            continue;
        }
        last.insert(i, value.clone());
        let display_key = tp.display_key().unwrap_or("").to_string();
        let display_field = tp.display_field().unwrap_or(&field).to_string();
        out.entry(display_key).or_insert_with(HashMap::new).insert(display_field, value);
    }
    out
}

fn aggregate_value(path: &GnmiPath, entries: &HashMap<String, HashMap<String, String>>, timestamp_ns: i64) -> Value {
    let json = serde_json::to_value(entries).unwrap_or(serde_json::json!({}));
    let typed = TypedValue::json_ietf(&json).unwrap_or_else(|_| TypedValue::StringVal(String::new()));
    Value::new(timestamp_ns, Some(path.clone()), Some(typed))
}
