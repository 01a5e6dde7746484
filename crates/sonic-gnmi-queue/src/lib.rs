//! Bounded, timestamp-ordered priority queue (spec §4.3).
//!
//! Two independent locks guard the structure: the heap's own mutex, and a
//! separate byte-accounting mutex. They are never held together — spec §9's
//! design note warns that wrapping put/get in both invites deadlocks under
//! contention, so every operation below acquires at most one at a time.

use sonic_gnmi_model::{GnmiError, GnmiResult, Value};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A trait for anything that can report the byte size it will occupy in
/// the queue, so the queue crate never depends on the codec or a specific
/// wire encoding (SPEC_FULL §4.3).
pub trait SizedPayload {
    fn encoded_size(&self) -> usize;
}

impl SizedPayload for Value {
    fn encoded_size(&self) -> usize {
        Value::encoded_size(self)
    }
}

struct Entry<T> {
    item: T,
    timestamp_ns: i64,
    insertion_seq: u64,
    size: usize,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_ns == other.timestamp_ns && self.insertion_seq == other.insertion_seq
    }
}
impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    /// `BinaryHeap` is a max-heap; we want the *lowest* timestamp (earliest)
    /// out first, ties broken by insertion order, so this reverses both
    /// comparisons.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp_ns
            .cmp(&self.timestamp_ns)
            .then_with(|| other.insertion_seq.cmp(&self.insertion_seq))
    }
}

/// Bounded priority queue with per-item byte accounting (spec §4.3).
pub struct PriorityQueue<T: SizedPayload> {
    max_size: usize,
    heap: Mutex<BinaryHeap<Entry<T>>>,
    byte_count: Mutex<usize>,
    notify: Notify,
    seq: AtomicU64,
}

impl<T: SizedPayload> PriorityQueue<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            heap: Mutex::new(BinaryHeap::new()),
            byte_count: Mutex::new(0),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Bytes currently outstanding (enqueued, not yet dequeued).
    pub fn queue_length_sum(&self) -> usize {
        *self.byte_count.lock().unwrap()
    }

    /// `EnqueueItem(v)`: accepts if `size(v) + sum <= maxSize`, else rejects
    /// with `resource-exhausted`. The caller (a subscription worker) is then
    /// expected to force-enqueue a fatal marker and terminate.
    pub fn enqueue_item(&self, item: T, timestamp_ns: i64) -> GnmiResult<()> {
        let size = item.encoded_size();
        {
            let mut count = self.byte_count.lock().unwrap();
            if size + *count > self.max_size {
                tracing::warn!(size, current = *count, max = self.max_size, "queue enqueue rejected: byte cap exceeded");
                return Err(GnmiError::resource_exhausted("Subscribe output queue exhausted"));
            }
            *count += size;
        }
        self.push(item, timestamp_ns, size);
        Ok(())
    }

    /// `ForceEnqueueItem(v)`: bypasses the byte cap. Used for fatal markers
    /// and sync responses that must reach the consumer regardless of
    /// backpressure.
    pub fn force_enqueue_item(&self, item: T, timestamp_ns: i64) {
        let size = item.encoded_size();
        {
            let mut count = self.byte_count.lock().unwrap();
            *count += size;
        }
        self.push(item, timestamp_ns, size);
    }

    fn push(&self, item: T, timestamp_ns: i64, size: usize) {
        let insertion_seq = self.seq.fetch_add(1, AtomicOrdering::SeqCst);
        let mut heap = self.heap.lock().unwrap();
        heap.push(Entry {
            item,
            timestamp_ns,
            insertion_seq,
            size,
        });
        drop(heap);
        self.notify.notify_one();
    }

    /// `DequeueItem()`: blocking pop of the lowest-timestamp item.
    /// Decrements `queueLengthSum` by the item's *own* recorded size (not a
    /// recomputation), so the decrement always matches the prior increment.
    pub async fn dequeue_item(&self) -> T {
        loop {
            {
                let mut heap = self.heap.lock().unwrap();
                if let Some(entry) = heap.pop() {
                    drop(heap);
                    let mut count = self.byte_count.lock().unwrap();
                    *count = count.saturating_sub(entry.size);
                    return entry.item;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking pop, used by tests and by Poll-style drains that must
    /// not wait.
    pub fn try_dequeue_item(&self) -> Option<T> {
        let mut heap = self.heap.lock().unwrap();
        let entry = heap.pop()?;
        drop(heap);
        let mut count = self.byte_count.lock().unwrap();
        *count = count.saturating_sub(entry.size);
        Some(entry.item)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }
}
