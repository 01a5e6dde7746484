//! Virtual-to-real table/key name remaps (spec §4.2 step 2).
//!
//! The upstream gNMI server ships exactly one such mapping: friendly port
//! names (`Ethernet0`) in `COUNTERS_DB/COUNTERS/<name>/...` paths resolve
//! against the real Redis key, which is OID-addressed
//! (`COUNTERS:oid:0x1000000000002`). `VirtualPathMap` generalizes this so
//! additional mappings (e.g. queue names) can be registered without
//! touching the resolver's core dispatch.

use async_trait::async_trait;
use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiResult, TablePath};

#[async_trait]
pub trait VirtualPathMap: Send + Sync {
    /// Returns the mapped `TablePath`s if `string_slice` (`[dbName, elem1,
    /// elem2, ...]`) matches this mapping, with `json_table_name` /
    /// `json_table_key` / `json_field` populated so rendered JSON uses the
    /// virtual names while Redis lookups use the real keys. `None` if this
    /// mapping does not apply to the given path.
    async fn resolve(
        &self,
        redis: &dyn RedisOps,
        string_slice: &[String],
        db_namespace: &str,
        db_container: &str,
        delimitor: char,
    ) -> GnmiResult<Option<Vec<TablePath>>>;
}

/// The `COUNTERS/Ethernet*` -> `COUNTERS:oid:...` indirection, driven by a
/// Redis hash mapping friendly name -> OID (`COUNTERS_PORT_NAME_MAP`,
/// `COUNTERS_QUEUE_NAME_MAP` and similar in the real system).
pub struct CountersNameMap {
    pub db_name: &'static str,
    pub table_name: &'static str,
    pub name_map_key: &'static str,
}

impl CountersNameMap {
    pub fn port_name_map() -> Self {
        Self {
            db_name: "COUNTERS_DB",
            table_name: "COUNTERS",
            name_map_key: "COUNTERS_PORT_NAME_MAP",
        }
    }

    pub fn queue_name_map() -> Self {
        Self {
            db_name: "COUNTERS_DB",
            table_name: "COUNTERS",
            name_map_key: "COUNTERS_QUEUE_NAME_MAP",
        }
    }
}

#[async_trait]
impl VirtualPathMap for CountersNameMap {
    async fn resolve(
        &self,
        redis: &dyn RedisOps,
        string_slice: &[String],
        db_namespace: &str,
        db_container: &str,
        delimitor: char,
    ) -> GnmiResult<Option<Vec<TablePath>>> {
        if string_slice.len() < 2 || string_slice[0] != self.db_name {
            return Ok(None);
        }
        let virtual_name = &string_slice[1];
        let Some(oid) = redis.hget(self.name_map_key, virtual_name).await? else {
            return Ok(None);
        };

        let mut tp = TablePath::table(db_namespace, db_container, self.db_name, self.table_name, delimitor)
            .with_key(oid);
        tp.json_table_key = Some(virtual_name.clone());

        if string_slice.len() >= 3 {
            let field = string_slice[2].clone();
            tp = tp.with_field(field.clone());
            tp.json_field = Some(field);
        }
        if string_slice.len() >= 4 {
            let index: usize = string_slice[3]
                .parse()
                .map_err(|_| sonic_gnmi_model::GnmiError::invalid_argument("non-numeric list index"))?;
            tp = tp.with_index(index);
        }
        Ok(Some(vec![tp]))
    }
}
