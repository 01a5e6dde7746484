//! gNMI path grammar and the resolved `TablePath` address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One element of a gNMI path.
///
/// SONiC's gNMI target grammar is purely positional (DB, table, key, field,
/// index) rather than YANG-list-keyed, so unlike a general gNMI path element
/// this carries only a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElem {
    pub name: String,
}

impl PathElem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A gNMI path: an ordered sequence of named elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnmiPath {
    pub elem: Vec<PathElem>,
}

impl GnmiPath {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elem: names.into_iter().map(PathElem::new).collect(),
        }
    }

    /// Returns the element names as plain strings, in order.
    pub fn names(&self) -> Vec<&str> {
        self.elem.iter().map(|e| e.name.as_str()).collect()
    }

    /// Concatenates `prefix` and `path` into the `stringSlice` the resolver
    /// operates on: `[dbName, elem_1.name, elem_2.name, ...]`.
    pub fn full_path_names(prefix: &GnmiPath, path: &GnmiPath) -> Vec<String> {
        prefix
            .elem
            .iter()
            .chain(path.elem.iter())
            .map(|e| e.name.clone())
            .collect()
    }
}

/// `add` inserts/replaces a value; `remove` deletes it. Set-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TablePathOp {
    Add,
    Remove,
}

/// The resolved, canonical address of a leaf or subtree in Redis.
///
/// See spec §3 for the full invariant list. Exactly one of the following
/// shapes is legal: bare table, table+key, table+field, table+key+field,
/// table+key+field+index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePath {
    /// Smart-switch DPU namespace; empty for a single-ASIC deployment.
    pub db_namespace: String,
    /// Smart-switch DPU container; empty for a single-ASIC deployment.
    pub db_container: String,
    /// Logical database name, e.g. `APPL_DB`, `CONFIG_DB`, `COUNTERS_DB`.
    pub db_name: String,
    /// Redis key prefix.
    pub table_name: String,
    /// `None` means "all keys matching `tableName + sep + *`".
    pub table_key: Option<String>,
    /// Per-DB key separator: `|` for CONFIG_DB/STATE_DB, `:` elsewhere.
    pub delimitor: char,
    /// Hash field for field-granularity operations.
    pub field: Option<String>,
    /// Position into a leaf-list field. `None` means unset (spec's `-1`).
    pub index: Option<usize>,
    /// Set-side operation; meaningless for Get/Subscribe paths.
    pub operation: TablePathOp,
    /// Payload for `add` operations, JSON-encoded.
    pub json_value: Option<serde_json::Value>,
    /// Payload for `add` operations, raw proto bytes (PROTO encoding).
    pub proto_value: Option<Vec<u8>>,
    /// Virtual table name exposed to the gNMI peer, when it differs from
    /// `table_name` (the Redis key uses a real OID, the gNMI path a friendly
    /// name).
    pub json_table_name: Option<String>,
    /// Virtual key exposed to the gNMI peer.
    pub json_table_key: Option<String>,
    /// Virtual field name exposed to the gNMI peer.
    pub json_field: Option<String>,
}

impl TablePath {
    /// Builds a minimal `TablePath` for a bare table address.
    pub fn table(
        db_namespace: impl Into<String>,
        db_container: impl Into<String>,
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        delimitor: char,
    ) -> Self {
        Self {
            db_namespace: db_namespace.into(),
            db_container: db_container.into(),
            db_name: db_name.into(),
            table_name: table_name.into(),
            table_key: None,
            delimitor,
            field: None,
            index: None,
            operation: TablePathOp::Add,
            json_value: None,
            proto_value: None,
            json_table_name: None,
            json_table_key: None,
            json_field: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.table_key = Some(key.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Returns true if `COUNTERS_DB` semantics apply: tables other than
    /// `COUNTERS` have no per-key suffix.
    pub fn is_bare_counters_table(&self) -> bool {
        self.db_name == "COUNTERS_DB" && self.table_name != "COUNTERS"
    }

    /// The Redis key this `TablePath` addresses, ignoring field/index. This
    /// is testable property 3 in spec §8: the reverse composition of a
    /// resolved `TablePath` must yield the key the caller would have used
    /// directly.
    pub fn redis_key(&self) -> String {
        match &self.table_key {
            Some(key) if !key.is_empty() && !self.is_bare_counters_table() => {
                format!("{}{}{}", self.table_name, self.delimitor, key)
            }
            Some(key) if !key.is_empty() => {
                // COUNTERS_DB tables other than COUNTERS have no separator
                // after the table name.
                format!("{}{}", self.table_name, key)
            }
            _ => self.table_name.clone(),
        }
    }

    /// The glob pattern matching every key under this table.
    pub fn key_glob(&self) -> String {
        if self.is_bare_counters_table() {
            self.table_name.clone()
        } else {
            format!("{}{}*", self.table_name, self.delimitor)
        }
    }

    /// The virtual (gNMI-facing) key, falling back to the real Redis key.
    pub fn display_key(&self) -> Option<&str> {
        self.json_table_key
            .as_deref()
            .or(self.table_key.as_deref())
    }

    /// The virtual (gNMI-facing) field, falling back to the real field.
    pub fn display_field(&self) -> Option<&str> {
        self.json_field.as_deref().or(self.field.as_deref())
    }

    /// The virtual (gNMI-facing) table name, falling back to the real one.
    pub fn display_table_name(&self) -> &str {
        self.json_table_name.as_deref().unwrap_or(&self.table_name)
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.db_name, self.redis_key())?;
        if let Some(field) = &self.field {
            write!(f, "/{}", field)?;
        }
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}
