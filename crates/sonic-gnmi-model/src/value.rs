//! The `Value` type: the unit flowing through the subscription priority
//! queue, and the `TypedValue` payload it carries.

use crate::path::GnmiPath;
use serde::{Deserialize, Serialize};

/// A typed payload, mirroring gNMI's `TypedValue` oneof without depending on
/// generated protobuf code. The external gRPC layer (out of scope here)
/// converts this losslessly into `gnmi::TypedValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    /// RFC 7951 JSON (the default encoding on the wire).
    JsonIetfVal(Vec<u8>),
    /// Plain JSON.
    JsonVal(Vec<u8>),
    /// A bare string value.
    StringVal(String),
    /// Opaque proto-encoded bytes (PROTO encoding).
    ProtoBytes(Vec<u8>),
}

impl TypedValue {
    /// Size of the encoded form, used for queue byte accounting. This is
    /// the size of the payload actually carried on the wire, not a
    /// per-item count (spec §4.3).
    pub fn encoded_size(&self) -> usize {
        match self {
            TypedValue::JsonIetfVal(b) | TypedValue::JsonVal(b) | TypedValue::ProtoBytes(b) => {
                b.len()
            }
            TypedValue::StringVal(s) => s.len(),
        }
    }

    pub fn json_ietf(value: &serde_json::Value) -> serde_json::Result<Self> {
        Ok(TypedValue::JsonIetfVal(serde_json::to_vec(value)?))
    }
}

/// The unit flowing through the priority queue (spec §3).
///
/// Ordering is by ascending timestamp; ties break by insertion order (see
/// `sonic-gnmi-queue`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    /// Nanosecond timestamp.
    pub timestamp_ns: i64,
    pub prefix: Option<GnmiPath>,
    pub path: Option<GnmiPath>,
    pub value: Option<TypedValue>,
    /// Paths that should be emitted as gNMI deletes alongside (or instead
    /// of) `value`.
    pub deletes: Vec<GnmiPath>,
    /// End-of-initial-dump marker.
    pub sync_response: bool,
    /// Non-empty terminates the subscription. Checked before `value`/
    /// `deletes` are otherwise meaningful.
    pub fatal: Option<String>,
}

impl Value {
    pub fn new(timestamp_ns: i64, path: Option<GnmiPath>, value: Option<TypedValue>) -> Self {
        Self {
            timestamp_ns,
            prefix: None,
            path,
            value,
            deletes: Vec::new(),
            sync_response: false,
            fatal: None,
        }
    }

    /// Builds the `syncResponse=true` marker StreamRun force-enqueues after
    /// every worker's initial value has been sent.
    pub fn sync_marker(timestamp_ns: i64) -> Self {
        Self {
            timestamp_ns,
            prefix: None,
            path: None,
            value: None,
            deletes: Vec::new(),
            sync_response: true,
            fatal: None,
        }
    }

    /// Builds a fatal marker. Fatal markers bypass the queue's byte cap
    /// (`ForceEnqueueItem`) and terminate the subscription on dequeue.
    pub fn fatal(timestamp_ns: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ns,
            prefix: None,
            path: None,
            value: None,
            deletes: Vec::new(),
            sync_response: false,
            fatal: Some(message.into()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    /// Size of the encoded payload for queue byte accounting: the value's
    /// encoded size plus a fixed per-delete-path overhead, so deletes-only
    /// notifications still count against the cap.
    pub fn encoded_size(&self) -> usize {
        let value_size = self.value.as_ref().map(TypedValue::encoded_size).unwrap_or(0);
        let deletes_size: usize = self
            .deletes
            .iter()
            .map(|p| p.names().iter().map(|n| n.len() + 1).sum::<usize>())
            .sum();
        value_size + deletes_size + self.fatal.as_ref().map(|m| m.len()).unwrap_or(0)
    }
}
