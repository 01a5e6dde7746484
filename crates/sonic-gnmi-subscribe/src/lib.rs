//! Subscribe engine: StreamRun/PollRun/Once, the per-path workers, and the
//! keyspace-notification listener (spec §4.6-§4.7).

pub mod clock;
pub mod keyspace;
pub mod mode;
pub mod state;
pub mod stream;
pub mod worker;

pub use clock::{system_clock, Clock};
pub use keyspace::{KeyspaceSource, KeyspaceUpdate, ListenerSpec, RawKeyspaceMessage, RedisKeyspaceSource};
pub use mode::{normalize_sample_interval, select_worker, SubscriptionMode, WorkerKind, MIN_SAMPLE_INTERVAL};
pub use state::{StopController, StopHandle, SyncGate, SyncSignaller};
pub use stream::{once, poll_run, stream_run, PathSubscription};
