//! Path resolver: gNMI prefix+path -> one or more [`TablePath`]s (spec §4.2).
//!
//! The gNMI path grammar is ambiguous between "key" and "field" at length
//! 3-4; this resolver disambiguates by probing Redis, preferring the
//! interpretation that names an existing entity. Spec §9's design note:
//! resolution is best-effort and only snapshots the decision at resolve
//! time — two concurrent resolutions of the same path could disagree if
//! the DB mutates between probes.

pub mod virtual_map;

pub use virtual_map::VirtualPathMap;

use sonic_gnmi_dbconfig::RedisOps;
use sonic_gnmi_model::{GnmiError, GnmiResult, TablePath, TablePathOp};
use std::sync::Arc;

/// Databases for which table-only (2-element) and key-existence
/// pre-checks are skipped: `APPL_DB` and the state databases, whose
/// contents may legitimately not exist yet (spec §4.2 step 3, §4.2 step 4).
fn skips_existence_precheck(db_name: &str) -> bool {
    db_name == "APPL_DB" || db_name.contains("STATE_DB") || db_name == "DPU_APPL_DB"
}

pub struct PathResolver {
    virtual_maps: Vec<Arc<dyn VirtualPathMap>>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PathResolver {
    pub fn new(virtual_maps: Vec<Arc<dyn VirtualPathMap>>) -> Self {
        Self { virtual_maps }
    }

    /// Resolves a gNMI path within one already-selected logical database.
    ///
    /// `elems` is the path after the DB target (`[table, key_or_field?,
    /// field_or_key?, index?]`); `explicit_namespace` mirrors the target's
    /// `/namespace` suffix, which disables virtual-path mapping (spec §4.2
    /// step 2).
    pub async fn resolve(
        &self,
        redis: &dyn RedisOps,
        db_namespace: &str,
        db_container: &str,
        db_name: &str,
        delimitor: char,
        explicit_namespace: bool,
        elems: &[String],
    ) -> GnmiResult<Vec<TablePath>> {
        let mut string_slice = Vec::with_capacity(elems.len() + 1);
        string_slice.push(db_name.to_string());
        string_slice.extend(elems.iter().cloned());

        if !explicit_namespace {
            for vmap in &self.virtual_maps {
                if let Some(resolved) = vmap
                    .resolve(redis, &string_slice, db_namespace, db_container, delimitor)
                    .await?
                {
                    return Ok(resolved);
                }
            }
        }

        match string_slice.len() {
            2 => {
                self.resolve_table_only(redis, db_namespace, db_container, db_name, delimitor, &string_slice)
                    .await
            }
            3 => {
                self.resolve_len3(redis, db_namespace, db_container, db_name, delimitor, &string_slice)
                    .await
            }
            4 | 5 => {
                self.resolve_len4(redis, db_namespace, db_container, db_name, delimitor, &string_slice)
                    .await
            }
            n => Err(GnmiError::invalid_argument(format!("invalid path: {n} elements"))),
        }
    }

    async fn resolve_table_only(
        &self,
        redis: &dyn RedisOps,
        db_namespace: &str,
        db_container: &str,
        db_name: &str,
        delimitor: char,
        string_slice: &[String],
    ) -> GnmiResult<Vec<TablePath>> {
        let table_name = &string_slice[1];
        let tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor);
        if !skips_existence_precheck(db_name) && !tp.is_bare_counters_table() {
            let matches = redis.keys(&tp.key_glob()).await?;
            if matches.is_empty() {
                return Err(GnmiError::not_found(format!("no keys under table '{table_name}'")));
            }
        }
        Ok(vec![tp])
    }

    async fn resolve_len3(
        &self,
        redis: &dyn RedisOps,
        db_namespace: &str,
        db_container: &str,
        db_name: &str,
        delimitor: char,
        string_slice: &[String],
    ) -> GnmiResult<Vec<TablePath>> {
        let table_name = &string_slice[1];
        let candidate = &string_slice[2];
        let key_probe = format!("{table_name}{delimitor}{candidate}");

        if redis.exists(&key_probe).await? {
            let tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor)
                .with_key(candidate.clone());
            return Ok(vec![tp]);
        }

        if db_name == "APPL_DB" {
            if redis.hexists(table_name, candidate).await? {
                let tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor)
                    .with_field(candidate.clone());
                return Ok(vec![tp]);
            }
            return Err(GnmiError::not_found(format!("'{table_name}/{candidate}' is neither a key nor a field")));
        }

        // Otherwise default to field, per spec §4.2 step 3.
        let tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor)
            .with_field(candidate.clone());
        Ok(vec![tp])
    }

    async fn resolve_len4(
        &self,
        redis: &dyn RedisOps,
        db_namespace: &str,
        db_container: &str,
        db_name: &str,
        delimitor: char,
        string_slice: &[String],
    ) -> GnmiResult<Vec<TablePath>> {
        let table_name = &string_slice[1];
        let s2 = &string_slice[2];
        let s3 = &string_slice[3];

        // First try `s2 + sep + s3` as a single (compound) key — e.g.
        // VLAN_MEMBER|Vlan100|Ethernet0 keys joined on the same separator.
        let compound_key = format!("{s2}{delimitor}{s3}");
        let compound_full = format!("{table_name}{delimitor}{compound_key}");
        if redis.exists(&compound_full).await? {
            let tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor)
                .with_key(compound_key);
            return Ok(vec![tp]);
        }

        // Otherwise s2 is the key and s3 is the field.
        let key_probe = format!("{table_name}{delimitor}{s2}");
        if db_name != "APPL_DB" && !redis.exists(&key_probe).await? {
            return Err(GnmiError::not_found(format!("key '{key_probe}' not found")));
        }
        let mut tp = TablePath::table(db_namespace, db_container, db_name, table_name.clone(), delimitor)
            .with_key(s2.clone())
            .with_field(s3.clone());

        if let Some(idx_str) = string_slice.get(4) {
            let index: usize = idx_str
                .parse()
                .map_err(|_| GnmiError::invalid_argument(format!("non-numeric list index '{idx_str}'")))?;
            tp = tp.with_index(index);
        }
        Ok(vec![tp])
    }
}

impl TablePath {
    /// Builds a set-side `TablePath` bypassing resolve-time existence
    /// checks: `add` operations may target keys that do not exist yet
    /// (spec §3 invariant).
    pub fn for_set(mut self, op: TablePathOp) -> Self {
        self.operation = op;
        self
    }
}
