//! ZMQ producer-state transport, behind the `zmq-transport` feature. This is
//! the wire path SONiC's C++ orchagent producer-state consumers actually
//! speak; the default build stays on [`super::InProcessSink`] so the crate
//! has no hard ZMQ dependency (spec §4.8 "producer-state sink").

use crate::sink::ProducerStateSink;
use async_trait::async_trait;
use sonic_gnmi_dbconfig::FieldValue;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct ZmqProducerStateSink {
    address: String,
    socket: Mutex<Option<zmq::Socket>>,
}

impl ZmqProducerStateSink {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), socket: Mutex::new(None) }
    }

    fn send(&self, payload: &serde_json::Value) -> GnmiResult<()> {
        let guard = self.socket.lock().expect("zmq socket mutex poisoned");
        let socket = guard
            .as_ref()
            .ok_or_else(|| GnmiError::unavailable("zmq producer-state sink is not connected"))?;
        let bytes = serde_json::to_vec(payload).map_err(|e| GnmiError::internal(format!("encode zmq payload: {e}")))?;
        socket
            .send(bytes, 0)
            .map_err(|e| GnmiError::unavailable(format!("zmq send to {}: {e}", self.address)))
    }
}

#[async_trait]
impl ProducerStateSink for ZmqProducerStateSink {
    async fn connect(&self) -> GnmiResult<()> {
        let ctx = zmq::Context::new();
        let socket = ctx
            .socket(zmq::PUSH)
            .map_err(|e| GnmiError::unavailable(format!("zmq socket create: {e}")))?;
        socket
            .connect(&self.address)
            .map_err(|e| GnmiError::unavailable(format!("zmq connect {}: {e}", self.address)))?;
        *self.socket.lock().expect("zmq socket mutex poisoned") = Some(socket);
        Ok(())
    }

    async fn set(&self, table: &str, key: &str, fields: &HashMap<String, FieldValue>, op: &str, tag: &str) -> GnmiResult<()> {
        let flat = sonic_gnmi_dbconfig::flatten_fields(fields);
        self.send(&serde_json::json!({
            "table": table,
            "key": key,
            "fields": flat,
            "op": op,
            "tag": tag,
        }))
    }

    async fn delete(&self, table: &str, key: &str, op: &str, tag: &str) -> GnmiResult<()> {
        self.send(&serde_json::json!({
            "table": table,
            "key": key,
            "op": op,
            "tag": tag,
            "delete": true,
        }))
    }
}
