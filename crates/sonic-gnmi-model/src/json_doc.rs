//! `JsonDocument`: the in-memory representation of a `CONFIG_DB` checkpoint
//! (spec §3, operations detailed in §4.9).
//!
//! The document is rooted at table level — one level below the logical
//! database, since a checkpoint always belongs to a single DB (`CONFIG_DB`).
//! A path of length 0 addresses the whole document; length 1 a table;
//! length 2 a table entry; length 3 a field (scalar or leaf-list); length 4
//! an index into a leaf-list field.

use crate::error::{GnmiError, GnmiResult};
use serde_json::{Map, Value as Json};

/// A nested JSON object addressable by a 0–4 element path
/// (Table, Key, Field, Index).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDocument {
    root: Map<String, Json>,
}

/// Unescapes a single JSON-Patch path segment (`~1` -> `/`, `~0` -> `~`).
/// Must run before a path segment coming off the wire is used to index
/// into the document.
pub fn unescape_path_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escapes a single path segment for inclusion in a JSON-Patch `path`
/// string (`~` -> `~0`, `/` -> `~1`); inverse of [`unescape_path_segment`].
pub fn escape_path_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Joins escaped path segments into a JSON-Patch `path` string, e.g.
/// `["PORT", "Ethernet0"]` -> `/PORT/Ethernet0`.
pub fn json_patch_path(segments: &[String]) -> String {
    let mut out = String::new();
    for s in segments {
        out.push('/');
        out.push_str(&escape_path_segment(s));
    }
    out
}

impl JsonDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Json>) -> Self {
        Self { root }
    }

    pub fn from_json(value: Json) -> GnmiResult<Self> {
        match value {
            Json::Object(map) => Ok(Self { root: map }),
            _ => Err(GnmiError::internal("checkpoint root must be a JSON object")),
        }
    }

    pub fn into_json(self) -> Json {
        Json::Object(self.root)
    }

    pub fn as_map(&self) -> &Map<String, Json> {
        &self.root
    }

    /// `Get(path)`: the JSON value addressed by `path`, or `not-found` if
    /// any intermediate segment is absent.
    pub fn get(&self, path: &[String]) -> GnmiResult<Json> {
        if path.is_empty() {
            return Ok(Json::Object(self.root.clone()));
        }
        let (table, rest) = (&path[0], &path[1..]);
        let table_val = self
            .root
            .get(table)
            .ok_or_else(|| GnmiError::not_found(format!("table '{table}' not found")))?;
        if rest.is_empty() {
            return Ok(table_val.clone());
        }
        let key = &rest[0];
        let entry = table_val
            .as_object()
            .and_then(|m| m.get(key))
            .ok_or_else(|| GnmiError::not_found(format!("key '{table}|{key}' not found")))?;
        let rest = &rest[1..];
        if rest.is_empty() {
            return Ok(entry.clone());
        }
        let field = &rest[0];
        let field_val = entry
            .as_object()
            .and_then(|m| m.get(field))
            .ok_or_else(|| GnmiError::not_found(format!("field '{table}|{key}/{field}' not found")))?;
        let rest = &rest[1..];
        if rest.is_empty() {
            return Ok(field_val.clone());
        }
        // length 4: index into a leaf-list field.
        let index: usize = rest[0]
            .parse()
            .map_err(|_| GnmiError::invalid_argument(format!("non-numeric index '{}'", rest[0])))?;
        let list = field_val
            .as_array()
            .ok_or_else(|| GnmiError::invalid_argument(format!("field '{field}' is not a leaf-list")))?;
        list.get(index)
            .cloned()
            .ok_or_else(|| GnmiError::not_found(format!("index {index} out of range for '{field}'")))
    }

    /// `Add(path, json)`: creates missing intermediate maps. For list
    /// insertion at index `i`: `i == len` appends, `0 <= i < len` inserts
    /// before position `i`.
    pub fn add(&mut self, path: &[String], value: Json) -> GnmiResult<()> {
        match path.len() {
            0 => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| GnmiError::invalid_argument("root add requires a JSON object"))?;
                self.root = obj.clone();
                Ok(())
            }
            1 => {
                self.root
                    .entry(path[0].clone())
                    .or_insert_with(|| Json::Object(Map::new()));
                *self.root.get_mut(&path[0]).unwrap() = value;
                Ok(())
            }
            2 => {
                let table = self
                    .root
                    .entry(path[0].clone())
                    .or_insert_with(|| Json::Object(Map::new()));
                let table_map = table
                    .as_object_mut()
                    .ok_or_else(|| GnmiError::internal(format!("table '{}' is not an object", path[0])))?;
                table_map.insert(path[1].clone(), value);
                Ok(())
            }
            3 => {
                let entry = self.entry_mut_creating(&path[0], &path[1])?;
                entry.insert(path[2].clone(), value);
                Ok(())
            }
            4 => {
                let entry = self.entry_mut_creating(&path[0], &path[1])?;
                let field = entry
                    .entry(path[2].clone())
                    .or_insert_with(|| Json::Array(Vec::new()));
                let list = field
                    .as_array_mut()
                    .ok_or_else(|| GnmiError::invalid_argument(format!("field '{}' is not a leaf-list", path[2])))?;
                let index: usize = path[3]
                    .parse()
                    .map_err(|_| GnmiError::invalid_argument(format!("non-numeric index '{}'", path[3])))?;
                if index == list.len() {
                    list.push(value);
                } else if index < list.len() {
                    list.insert(index, value);
                } else {
                    return Err(GnmiError::invalid_argument(format!(
                        "index {index} out of range for insert (len {})",
                        list.len()
                    )));
                }
                Ok(())
            }
            n => Err(GnmiError::invalid_argument(format!("path too long ({n} elements)"))),
        }
    }

    /// `Remove(path)`: removes the addressed element and prunes now-empty
    /// parent maps upward. Removing a path that does not exist is tolerated
    /// by callers in the Set engine (spec §4.8.3) but this primitive itself
    /// reports `not-found` so callers can choose to ignore it.
    pub fn remove(&mut self, path: &[String]) -> GnmiResult<()> {
        match path.len() {
            0 => {
                self.root.clear();
                Ok(())
            }
            1 => {
                self.root
                    .remove(&path[0])
                    .map(|_| ())
                    .ok_or_else(|| GnmiError::not_found(format!("table '{}' not found", path[0])))
            }
            2 => {
                let removed = {
                    let table = self
                        .root
                        .get_mut(&path[0])
                        .and_then(|v| v.as_object_mut())
                        .ok_or_else(|| GnmiError::not_found(format!("table '{}' not found", path[0])))?;
                    table.remove(&path[1]).is_some()
                };
                if !removed {
                    return Err(GnmiError::not_found(format!("key '{}|{}' not found", path[0], path[1])));
                }
                self.prune_if_empty(&path[0]);
                Ok(())
            }
            3 => {
                let removed = {
                    let entry = self.entry_mut(&path[0], &path[1])?;
                    entry.remove(&path[2]).is_some()
                };
                if !removed {
                    return Err(GnmiError::not_found(format!(
                        "field '{}|{}/{}' not found",
                        path[0], path[1], path[2]
                    )));
                }
                self.prune_entry_if_empty(&path[0], &path[1]);
                self.prune_if_empty(&path[0]);
                Ok(())
            }
            4 => {
                let index: usize = path[3]
                    .parse()
                    .map_err(|_| GnmiError::invalid_argument(format!("non-numeric index '{}'", path[3])))?;
                {
                    let entry = self.entry_mut(&path[0], &path[1])?;
                    let list = entry
                        .get_mut(&path[2])
                        .and_then(|v| v.as_array_mut())
                        .ok_or_else(|| GnmiError::not_found(format!("field '{}' not found", path[2])))?;
                    if index >= list.len() {
                        return Err(GnmiError::not_found(format!("index {index} out of range")));
                    }
                    list.remove(index);
                }
                self.prune_entry_if_empty(&path[0], &path[1]);
                self.prune_if_empty(&path[0]);
                Ok(())
            }
            n => Err(GnmiError::invalid_argument(format!("path too long ({n} elements)"))),
        }
    }

    /// `Replace(path, json)`: `Remove` then `Add`. Tolerates the path not
    /// existing yet (behaves as a plain `Add`).
    pub fn replace(&mut self, path: &[String], value: Json) -> GnmiResult<()> {
        match self.remove(path) {
            Ok(()) | Err(GnmiError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.add(path, value)
    }

    fn entry_mut_creating(&mut self, table: &str, key: &str) -> GnmiResult<&mut Map<String, Json>> {
        let table_entry = self
            .root
            .entry(table.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
        let table_map = table_entry
            .as_object_mut()
            .ok_or_else(|| GnmiError::internal(format!("table '{table}' is not an object")))?;
        let entry = table_map
            .entry(key.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
        entry
            .as_object_mut()
            .ok_or_else(|| GnmiError::internal(format!("entry '{table}|{key}' is not an object")))
    }

    fn entry_mut(&mut self, table: &str, key: &str) -> GnmiResult<&mut Map<String, Json>> {
        self.root
            .get_mut(table)
            .and_then(|v| v.as_object_mut())
            .ok_or_else(|| GnmiError::not_found(format!("table '{table}' not found")))?
            .get_mut(key)
            .and_then(|v| v.as_object_mut())
            .ok_or_else(|| GnmiError::not_found(format!("key '{table}|{key}' not found")))
    }

    fn prune_entry_if_empty(&mut self, table: &str, key: &str) {
        let should_prune = self
            .root
            .get(table)
            .and_then(|v| v.as_object())
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_object())
            .map(|m| m.is_empty())
            .unwrap_or(false);
        if should_prune {
            if let Some(table_map) = self.root.get_mut(table).and_then(|v| v.as_object_mut()) {
                table_map.remove(key);
            }
        }
    }

    fn prune_if_empty(&mut self, table: &str) {
        let should_prune = self
            .root
            .get(table)
            .and_then(|v| v.as_object())
            .map(|m| m.is_empty())
            .unwrap_or(false);
        if should_prune {
            self.root.remove(table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonDocument {
        JsonDocument::from_json(json!({
            "PORT": {
                "Ethernet0": {"admin_status": "up", "mtu": "9100"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn get_table_key_field() {
        let doc = sample();
        let path = vec!["PORT".into(), "Ethernet0".into(), "admin_status".into()];
        assert_eq!(doc.get(&path).unwrap(), json!("up"));
    }

    #[test]
    fn add_creates_missing_intermediate_maps() {
        let mut doc = JsonDocument::new();
        let path = vec!["PORT".into(), "Ethernet8".into(), "mtu".into()];
        doc.add(&path, json!("9100")).unwrap();
        assert_eq!(doc.get(&path).unwrap(), json!("9100"));
    }

    #[test]
    fn remove_prunes_empty_parents() {
        let mut doc = sample();
        doc.remove(&["PORT".into(), "Ethernet0".into(), "admin_status".into()])
            .unwrap();
        doc.remove(&["PORT".into(), "Ethernet0".into(), "mtu".into()])
            .unwrap();
        // Ethernet0 is now empty, and so is PORT: both should be pruned.
        assert!(doc.as_map().get("PORT").is_none());
    }

    #[test]
    fn replace_is_remove_then_add() {
        let mut doc = sample();
        let path = vec!["PORT".into(), "Ethernet0".into()];
        doc.replace(&path, json!({"admin_status": "down"})).unwrap();
        assert_eq!(doc.get(&path).unwrap(), json!({"admin_status": "down"}));
    }

    #[test]
    fn remove_missing_path_is_not_found() {
        let mut doc = JsonDocument::new();
        let err = doc.remove(&["PORT".into(), "Ethernet8".into()]).unwrap_err();
        assert_eq!(err.status_code(), "not-found");
    }

    #[test]
    fn leaf_list_insert_and_index() {
        let mut doc = JsonDocument::new();
        let field_path = vec!["VLAN".into(), "Vlan100".into(), "members@".into()];
        doc.add(&field_path, json!([])).unwrap();
        doc.add(
            &[
                "VLAN".into(),
                "Vlan100".into(),
                "members@".into(),
                "0".into(),
            ],
            json!("Ethernet0"),
        )
        .unwrap();
        doc.add(
            &[
                "VLAN".into(),
                "Vlan100".into(),
                "members@".into(),
                "1".into(),
            ],
            json!("Ethernet4"),
        )
        .unwrap();
        assert_eq!(doc.get(&field_path).unwrap(), json!(["Ethernet0", "Ethernet4"]));
    }

    #[test]
    fn path_segment_escaping_round_trips() {
        let escaped = escape_path_segment("a/b~c");
        assert_eq!(escaped, "a~1b~0c");
        assert_eq!(unescape_path_segment(&escaped), "a/b~c");
    }

    #[test]
    fn json_patch_path_formats_segments() {
        assert_eq!(
            json_patch_path(&["PORT".into(), "Ethernet0".into()]),
            "/PORT/Ethernet0"
        );
    }
}
