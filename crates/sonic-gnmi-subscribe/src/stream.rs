//! StreamRun / PollRun / Once dispatch (spec §4.6, §4.6.4).

use crate::clock::Clock;
use crate::keyspace::KeyspaceSource;
use crate::mode::{normalize_sample_interval, select_worker, SubscriptionMode, WorkerKind};
use crate::state::{StopHandle, SyncGate};
use crate::worker;
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiPath, TablePath, Value};
use sonic_gnmi_queue::PriorityQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One subscribed gNMI path, already resolved to one or more `TablePath`s.
#[derive(Clone)]
pub struct PathSubscription {
    pub path: GnmiPath,
    pub resolved: Vec<TablePath>,
    /// Numeric Redis DB index, needed only by the table-key worker's
    /// keyspace-notification channel name.
    pub db_number: u8,
    pub mode: SubscriptionMode,
    pub sample_interval: Duration,
    pub updates_only: bool,
}

/// Forwards one worker's output channel into the shared priority queue,
/// applying the backpressure contract: a rejected enqueue becomes a
/// force-enqueued fatal marker, and the forwarder then stops relaying for
/// this path (spec §5 "Backpressure").
fn spawn_forwarder(queue: Arc<PriorityQueue<Value>>, mut rx: mpsc::Receiver<Value>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(v) = rx.recv().await {
            let ts = v.timestamp_ns;
            if v.is_fatal() {
                queue.force_enqueue_item(v, ts);
                return;
            }
            if let Err(_resource_exhausted) = queue.enqueue_item(v, ts) {
                queue.force_enqueue_item(Value::fatal(ts, "Subscribe output queue exhausted"), ts);
                return;
            }
        }
    })
}

/// Runs a streaming subscription session to completion: spawns one worker
/// per path (dial-out forces every path to ON_CHANGE STREAM per spec
/// §4.6), force-enqueues the `syncResponse=true` marker once every worker
/// has emitted its initial value, then blocks until `stop` fires.
#[allow(clippy::too_many_arguments)]
pub async fn stream_run(
    redis: Arc<dyn RedisOps>,
    keyspace_source: Arc<dyn KeyspaceSource>,
    subscriptions: Vec<PathSubscription>,
    dial_out: bool,
    queue: Arc<PriorityQueue<Value>>,
    stop: StopHandle,
    clock: Clock,
) {
    let mut subscriptions: Vec<PathSubscription> = if dial_out {
        subscriptions
            .into_iter()
            .map(|mut s| {
                s.mode = SubscriptionMode::OnChange;
                s
            })
            .collect()
    } else {
        subscriptions
    };

    if let Some(bad) = subscriptions.iter().find(|s| s.mode == SubscriptionMode::Unsupported) {
        let _ = bad;
        queue.force_enqueue_item(Value::fatal(clock(), "unsupported subscription mode"), clock());
        return;
    }

    // Spec §4.6 "Sampling interval validation": `0` means "use the
    // minimum", anything non-zero below the minimum is an invalid-argument
    // fatal. Normalize every path's interval up front so no worker ever
    // sees a raw, unvalidated value (including ON_CHANGE paths, whose
    // workers may still use `sample_interval` as a poll period).
    for sub in subscriptions.iter_mut() {
        match normalize_sample_interval(sub.sample_interval) {
            Ok(normalized) => sub.sample_interval = normalized,
            Err(msg) => {
                queue.force_enqueue_item(Value::fatal(clock(), msg), clock());
                return;
            }
        }
    }

    let gate = SyncGate::new(subscriptions.len());
    let mut worker_handles = Vec::new();
    let mut forwarder_handles = Vec::new();

    for sub in subscriptions {
        let signaller = gate.signaller();
        let worker_stop = stop.clone();
        let (tx, rx) = mpsc::channel(256);
        forwarder_handles.push(spawn_forwarder(queue.clone(), rx));

        let worker_clock = clock.clone();
        match select_worker(&sub.resolved) {
            WorkerKind::SingleField => {
                let redis = redis.clone();
                worker_handles.push(tokio::spawn(async move {
                    worker::field::run(
                        redis.as_ref(),
                        &sub.resolved[0],
                        sub.path,
                        sub.mode,
                        sub.sample_interval,
                        worker_stop,
                        signaller,
                        tx,
                        move || worker_clock(),
                    )
                    .await;
                }));
            }
            WorkerKind::MultiField => {
                let redis = redis.clone();
                worker_handles.push(tokio::spawn(async move {
                    worker::multi_field::run(
                        redis.as_ref(),
                        &sub.resolved,
                        sub.path,
                        sub.mode,
                        sub.sample_interval,
                        worker::UpdatesOnly(sub.updates_only),
                        worker_stop,
                        signaller,
                        tx,
                        move || worker_clock(),
                    )
                    .await;
                }));
            }
            WorkerKind::TableKey => {
                let redis = redis.clone();
                let keyspace_source = keyspace_source.clone();
                let tp = sub.resolved[0].clone();
                worker_handles.push(tokio::spawn(async move {
                    worker::table_key::run(
                        redis,
                        keyspace_source,
                        tp,
                        sub.db_number,
                        sub.path,
                        sub.mode,
                        sub.sample_interval,
                        worker::UpdatesOnly(sub.updates_only),
                        worker_stop,
                        signaller,
                        tx,
                        move || worker_clock(),
                    )
                    .await;
                }));
            }
        }
    }

    gate.wait_all().await;
    queue.force_enqueue_item(Value::sync_marker(clock()), clock());

    let mut stop_wait = stop.clone();
    stop_wait.wait_for_stop().await;

    for h in worker_handles {
        h.abort();
    }
    for h in forwarder_handles {
        h.abort();
    }
}

/// `PollRun`: blocks on `poll` signals; each one triggers a full re-read of
/// every path (identical to Get), each value enqueued followed by a
/// `syncResponse=true` marker (spec §4.6.4).
pub async fn poll_run(
    redis: Arc<dyn RedisOps>,
    paths: Vec<PathSubscription>,
    queue: Arc<PriorityQueue<Value>>,
    mut poll: mpsc::Receiver<()>,
    mut stop: StopHandle,
    clock: Clock,
) {
    loop {
        tokio::select! {
            _ = stop.wait_for_stop() => return,
            signal = poll.recv() => {
                if signal.is_none() {
                    return;
                }
                poll_once(redis.as_ref(), &paths, &queue, &clock).await;
            }
        }
    }
}

/// `Once`: performs one full re-read of every path and exits, sharing the
/// Get codec with `PollRun` (spec §4.6.4).
pub async fn once(redis: Arc<dyn RedisOps>, paths: Vec<PathSubscription>, queue: Arc<PriorityQueue<Value>>, clock: Clock) {
    poll_once(redis.as_ref(), &paths, &queue, &clock).await;
}

async fn poll_once(redis: &dyn RedisOps, paths: &[PathSubscription], queue: &Arc<PriorityQueue<Value>>, clock: &Clock) {
    for sub in paths {
        for tp in &sub.resolved {
            match sonic_gnmi_read::table_data_to_typed_value(redis, tp).await {
                Ok(typed) => {
                    let ts = clock();
                    let v = Value::new(ts, Some(sub.path.clone()), Some(typed));
                    let _ = queue.enqueue_item(v, ts);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "poll read failed for path");
                }
            }
        }
    }
    let ts = clock();
    queue.force_enqueue_item(Value::sync_marker(ts), ts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::mock::FakeKeyspaceSource;
    use crate::state::StopController;
    use sonic_gnmi_dbconfig::redis_ops::mock::FakeRedis;

    fn seq_clock() -> Clock {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(1));
        Arc::new(move || counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
    }

    #[tokio::test]
    async fn unsupported_mode_force_enqueues_fatal_and_returns() {
        let redis: Arc<dyn RedisOps> = Arc::new(FakeRedis::new());
        let source: Arc<dyn KeyspaceSource> = Arc::new(FakeKeyspaceSource::new());
        let queue = Arc::new(PriorityQueue::new(1 << 20));
        let (_controller, stop) = StopController::new();

        let sub = PathSubscription {
            path: GnmiPath::from_names(["APPL_DB", "PORT_TABLE"]),
            resolved: vec![TablePath::table("", "", "APPL_DB", "PORT_TABLE", ':')],
            db_number: 0,
            mode: SubscriptionMode::Unsupported,
            sample_interval: Duration::from_secs(1),
            updates_only: false,
        };

        stream_run(redis, source, vec![sub], false, queue.clone(), stop, seq_clock()).await;
        let fatal = queue.dequeue_item().await;
        assert!(fatal.is_fatal());
    }

    /// Spec §4.6 "Sampling interval validation": a non-zero interval below
    /// the minimum is rejected with an invalid-argument fatal before any
    /// worker spawns.
    #[tokio::test]
    async fn below_minimum_sample_interval_force_enqueues_fatal_and_returns() {
        let redis: Arc<dyn RedisOps> = Arc::new(FakeRedis::new());
        let source: Arc<dyn KeyspaceSource> = Arc::new(FakeKeyspaceSource::new());
        let queue = Arc::new(PriorityQueue::new(1 << 20));
        let (_controller, stop) = StopController::new();

        let sub = PathSubscription {
            path: GnmiPath::from_names(["COUNTERS_DB", "COUNTERS", "Ethernet0"]),
            resolved: vec![TablePath::table("", "", "COUNTERS_DB", "COUNTERS", ':')],
            db_number: 2,
            mode: SubscriptionMode::Sample,
            sample_interval: Duration::from_millis(100),
            updates_only: false,
        };

        stream_run(redis, source, vec![sub], false, queue.clone(), stop, seq_clock()).await;
        let fatal = queue.dequeue_item().await;
        assert!(fatal.is_fatal());
    }

    /// Invariant 1: exactly one `syncResponse=true` marker per StreamRun,
    /// injected after every path's initial value.
    #[tokio::test]
    async fn sync_marker_is_injected_exactly_once_after_initial_values() {
        let redis: Arc<dyn RedisOps> = Arc::new(FakeRedis::new());
        redis.hset(
            "PORT_TABLE:Ethernet0",
            &std::collections::HashMap::from([("admin_status".to_string(), sonic_gnmi_dbconfig::FieldValue::Scalar("up".to_string()))]),
        )
        .await
        .unwrap();
        let source: Arc<dyn KeyspaceSource> = Arc::new(FakeKeyspaceSource::new());
        let queue = Arc::new(PriorityQueue::new(1 << 20));
        let (controller, stop) = StopController::new();

        let sub = PathSubscription {
            path: GnmiPath::from_names(["APPL_DB", "PORT_TABLE", "Ethernet0", "admin_status"]),
            resolved: vec![TablePath::table("", "", "APPL_DB", "PORT_TABLE", ':')
                .with_key("Ethernet0")
                .with_field("admin_status")],
            db_number: 0,
            mode: SubscriptionMode::OnChange,
            sample_interval: Duration::from_secs(1),
            updates_only: false,
        };

        let handle = tokio::spawn(stream_run(redis, source, vec![sub], false, queue.clone(), stop, seq_clock()));

        let first = queue.dequeue_item().await;
        assert!(!first.sync_response);
        let second = queue.dequeue_item().await;
        assert!(second.sync_response);

        controller.stop();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn once_emits_every_path_then_a_sync_marker() {
        let redis: Arc<dyn RedisOps> = Arc::new(FakeRedis::new());
        redis.hset(
            "PORT|Ethernet0",
            &std::collections::HashMap::from([("mtu".to_string(), sonic_gnmi_dbconfig::FieldValue::Scalar("9100".to_string()))]),
        )
        .await
        .unwrap();
        let queue = Arc::new(PriorityQueue::new(1 << 20));
        let sub = PathSubscription {
            path: GnmiPath::from_names(["CONFIG_DB", "PORT", "Ethernet0"]),
            resolved: vec![TablePath::table("", "", "CONFIG_DB", "PORT", '|').with_key("Ethernet0")],
            db_number: 4,
            mode: SubscriptionMode::OnChange,
            sample_interval: Duration::from_secs(1),
            updates_only: false,
        };
        once(redis, vec![sub], queue.clone(), seq_clock()).await;
        let first = queue.dequeue_item().await;
        assert!(!first.sync_response);
        let second = queue.dequeue_item().await;
        assert!(second.sync_response);
    }
}
