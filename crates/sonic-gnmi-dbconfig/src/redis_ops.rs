//! `RedisOps`: the narrow surface every other crate in this workspace uses
//! to talk to a single logical Redis database.
//!
//! Real Redis access is never hard-wired into resolver/read/subscribe/set
//! code; everything goes through this trait so unit tests substitute
//! [`mock::FakeRedis`] instead of starting a Redis server (SPEC_FULL
//! ambient-stack note, mirroring `portsyncd::redis_adapter`'s
//! `#[cfg(test)]` mock storage pattern, generalized into a trait object).

use async_trait::async_trait;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::collections::HashMap;

/// A single Redis key-value write: either a scalar or a leaf-list.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    LeafList(Vec<String>),
}

#[async_trait]
pub trait RedisOps: Send + Sync {
    /// `EXISTS key`.
    async fn exists(&self, key: &str) -> GnmiResult<bool>;

    /// `HEXISTS key field`.
    async fn hexists(&self, key: &str, field: &str) -> GnmiResult<bool>;

    /// `HGET key field`. A missing key or field is `Ok(None)`
    /// (`redis-nil` is not an error, spec §7).
    async fn hget(&self, key: &str, field: &str) -> GnmiResult<Option<String>>;

    /// `HGETALL key`.
    async fn hgetall(&self, key: &str) -> GnmiResult<HashMap<String, String>>;

    /// `KEYS pattern`, returning every key matching the glob.
    async fn keys(&self, pattern: &str) -> GnmiResult<Vec<String>>;

    /// `HSET key field value ...` for every field in `fields`, replacing
    /// leaf-list fields with the `"field@"` convention.
    async fn hset(&self, key: &str, fields: &HashMap<String, FieldValue>) -> GnmiResult<()>;

    /// `HDEL key field ...`.
    async fn hdel(&self, key: &str, fields: &[String]) -> GnmiResult<()>;

    /// `DEL key`.
    async fn del(&self, key: &str) -> GnmiResult<()>;
}

/// Flattens a `{field: FieldValue}` map into the raw `{field_name: string}`
/// form Redis stores, applying the leaf-list `"@"` suffix convention
/// (spec §4.4, §4.8).
pub fn flatten_fields(fields: &HashMap<String, FieldValue>) -> HashMap<String, String> {
    let mut out = HashMap::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            FieldValue::Scalar(s) => {
                out.insert(name.clone(), s.clone());
            }
            FieldValue::LeafList(items) => {
                out.insert(format!("{name}@"), items.join(","));
            }
        }
    }
    out
}

/// Real Redis backend over `redis::aio::ConnectionManager`, matching the
/// teacher's `sonic-orch-common::redis_backend` connection-manager usage.
pub struct RedisConnection {
    conn: redis::aio::ConnectionManager,
}

impl RedisConnection {
    pub async fn connect(addr: &RedisAddr, db: u8) -> GnmiResult<Self> {
        let uri = addr.uri(db);
        let client = redis::Client::open(uri.clone())
            .map_err(|e| GnmiError::unavailable(format!("redis client open '{uri}': {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| GnmiError::unavailable(format!("redis connect '{uri}': {e}")))?;
        Ok(Self { conn })
    }
}

/// Either a UNIX socket (production) or a TCP host/port (tests).
#[derive(Debug, Clone)]
pub enum RedisAddr {
    Unix(String),
    Tcp { hostname: String, port: u16 },
}

impl RedisAddr {
    fn uri(&self, db: u8) -> String {
        match self {
            RedisAddr::Unix(path) => format!("redis+unix://{path}?db={db}"),
            RedisAddr::Tcp { hostname, port } => format!("redis://{hostname}:{port}/{db}"),
        }
    }
}

#[async_trait]
impl RedisOps for RedisConnection {
    async fn exists(&self, key: &str) -> GnmiResult<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|n| n > 0)
            .map_err(|e| GnmiError::unavailable(format!("EXISTS {key}: {e}")))
    }

    async fn hexists(&self, key: &str, field: &str) -> GnmiResult<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("HEXISTS")
            .arg(key)
            .arg(field)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|n| n > 0)
            .map_err(|e| GnmiError::unavailable(format!("HEXISTS {key} {field}: {e}")))
    }

    async fn hget(&self, key: &str, field: &str) -> GnmiResult<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("HGET {key} {field}: {e}")))
    }

    async fn hgetall(&self, key: &str) -> GnmiResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        redis::cmd("HGETALL")
            .arg(key)
            .query_async::<_, HashMap<String, String>>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("HGETALL {key}: {e}")))
    }

    async fn keys(&self, pattern: &str) -> GnmiResult<Vec<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("KEYS")
            .arg(pattern)
            .query_async::<_, Vec<String>>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("KEYS {pattern}: {e}")))
    }

    async fn hset(&self, key: &str, fields: &HashMap<String, FieldValue>) -> GnmiResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let flat = flatten_fields(fields);
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in &flat {
            cmd.arg(field).arg(value);
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("HSET {key}: {e}")))
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> GnmiResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key);
        for f in fields {
            cmd.arg(f);
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("HDEL {key}: {e}")))
    }

    async fn del(&self, key: &str) -> GnmiResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| GnmiError::unavailable(format!("DEL {key}: {e}")))
    }
}

/// In-memory fake Redis, for unit tests across the whole workspace.
pub mod mock {
    use super::*;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    pub struct FakeRedis {
        data: RwLock<HashMap<String, HashMap<String, String>>>,
    }

    impl FakeRedis {
        pub fn new() -> Self {
            Self::default()
        }

        /// Test helper: seed a key's hash directly.
        pub async fn seed(&self, key: &str, fields: impl IntoIterator<Item = (&'static str, &'static str)>) {
            let mut data = self.data.write().await;
            let entry = data.entry(key.to_string()).or_default();
            for (f, v) in fields {
                entry.insert(f.to_string(), v.to_string());
            }
        }

        fn glob_match(pattern: &str, candidate: &str) -> bool {
            // Minimal glob: '*' matches any suffix/prefix/infix, no other wildcards.
            if let Some(prefix) = pattern.strip_suffix('*') {
                candidate.starts_with(prefix)
            } else {
                pattern == candidate
            }
        }
    }

    #[async_trait]
    impl RedisOps for FakeRedis {
        async fn exists(&self, key: &str) -> GnmiResult<bool> {
            Ok(self.data.read().await.contains_key(key))
        }

        async fn hexists(&self, key: &str, field: &str) -> GnmiResult<bool> {
            Ok(self
                .data
                .read()
                .await
                .get(key)
                .map(|h| h.contains_key(field))
                .unwrap_or(false))
        }

        async fn hget(&self, key: &str, field: &str) -> GnmiResult<Option<String>> {
            Ok(self.data.read().await.get(key).and_then(|h| h.get(field).cloned()))
        }

        async fn hgetall(&self, key: &str) -> GnmiResult<HashMap<String, String>> {
            Ok(self.data.read().await.get(key).cloned().unwrap_or_default())
        }

        async fn keys(&self, pattern: &str) -> GnmiResult<Vec<String>> {
            Ok(self
                .data
                .read()
                .await
                .keys()
                .filter(|k| Self::glob_match(pattern, k))
                .cloned()
                .collect())
        }

        async fn hset(&self, key: &str, fields: &HashMap<String, FieldValue>) -> GnmiResult<()> {
            let flat = flatten_fields(fields);
            let mut data = self.data.write().await;
            let entry = data.entry(key.to_string()).or_default();
            entry.extend(flat);
            Ok(())
        }

        async fn hdel(&self, key: &str, fields: &[String]) -> GnmiResult<()> {
            if let Some(entry) = self.data.write().await.get_mut(key) {
                for f in fields {
                    entry.remove(f);
                }
            }
            Ok(())
        }

        async fn del(&self, key: &str) -> GnmiResult<()> {
            self.data.write().await.remove(key);
            Ok(())
        }
    }

}
