//! DB registry: one Redis handle per `(namespace, container, dbName)`,
//! built from a DB configuration file (spec §4.1).

pub mod config;
pub mod redis_ops;
pub mod registry;

pub use config::{DatabaseConfig, DbConfig, InstanceConfig, NamespaceConfig};
pub use redis_ops::{FieldValue, RedisAddr, RedisConnection, RedisOps};
pub use registry::{ClientFor, DbRegistry};
