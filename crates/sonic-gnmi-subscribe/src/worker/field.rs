//! Field subscriber: single `TablePath`, single scalar field (spec §4.6.1).

use crate::mode::SubscriptionMode;
use crate::state::{StopHandle, SyncSignaller};
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiPath, TablePath, TypedValue, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs the field subscriber loop until stop. `now_ns` is injected so tests
/// control timestamps deterministically.
pub async fn run(
    redis: &dyn RedisOps,
    tp: &TablePath,
    path: GnmiPath,
    mode: SubscriptionMode,
    interval: Duration,
    mut stop: StopHandle,
    sync: SyncSignaller,
    out: mpsc::Sender<Value>,
    mut now_ns: impl FnMut() -> i64,
) {
    let key = tp.redis_key();
    let field = tp.field.clone().unwrap_or_default();
    let display_field = tp.display_field().unwrap_or(&field).to_string();

    let mut val = read_field(redis, &key, &field).await;
    let _ = out
        .send(field_value(&path, &display_field, &val, now_ns()))
        .await;
    sync.signal().await;

    if mode == SubscriptionMode::OnChange {
        loop {
            tokio::select! {
                _ = stop.wait_for_stop() => return,
                _ = tokio::time::sleep(Duration::from_millis(500)) => {
                    let new_val = read_field(redis, &key, &field).await;
                    if new_val != val {
                        let _ = out.send(field_value(&path, &display_field, &new_val, now_ns())).await;
                        val = new_val;
                    }
                }
            }
        }
    } else {
        loop {
            tokio::select! {
                _ = stop.wait_for_stop() => return,
                _ = tokio::time::sleep(interval) => {
                    let new_val = read_field(redis, &key, &field).await;
                    let _ = out.send(field_value(&path, &display_field, &new_val, now_ns())).await;
                    val = new_val;
                }
            }
        }
    }
}

/// `HGET key field`, mapping `redis-nil` and other errors to the empty
/// string — valid in ON_CHANGE when the field may appear later (spec
/// §4.6.1, §7).
async fn read_field(redis: &dyn RedisOps, key: &str, field: &str) -> String {
    redis.hget(key, field).await.ok().flatten().unwrap_or_default()
}

fn field_value(path: &GnmiPath, field: &str, value: &str, timestamp_ns: i64) -> Value {
    let json = serde_json::json!({ field: value });
    let typed = TypedValue::json_ietf(&json).unwrap_or_else(|_| TypedValue::StringVal(value.to_string()));
    Value::new(timestamp_ns, Some(path.clone()), Some(typed))
}
