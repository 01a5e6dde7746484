//! JSON rendering of Redis hash data, and the reverse decode (spec §4.4).
//!
//! Conventions that must be preserved bit-exact (spec §6): a field name
//! ending in `"@"` is a leaf-list, stored comma-joined; a field named
//! `NULL` is the `CONFIG_DB` empty-entry marker and is dropped from
//! rendered output; JSON encoding is always compact (no indentation).

use serde_json::{Map, Value as Json};
use sonic_gnmi_dbconfig::FieldValue;
use sonic_gnmi_model::{GnmiError, GnmiResult};
use std::collections::HashMap;

const NULL_FIELD: &str = "NULL";
const LEAF_LIST_SUFFIX: char = '@';

/// Renders one Redis hash entry (`{field: value}`) to the JSON shape a
/// gNMI peer expects, applying the leaf-list and `NULL`-marker conventions.
/// `json_field`, when set, overrides the displayed field name for a
/// single-field render (virtual-path remap, spec §3/§4.2).
pub fn render_entry(fields: &HashMap<String, String>) -> Json {
    let mut out = Map::new();
    for (name, value) in fields {
        if name == NULL_FIELD {
            continue;
        }
        if let Some(base) = name.strip_suffix(LEAF_LIST_SUFFIX) {
            let items: Vec<Json> = if value.is_empty() {
                Vec::new()
            } else {
                value.split(',').map(|s| Json::String(s.to_string())).collect()
            };
            out.insert(base.to_string(), Json::Array(items));
        } else {
            out.insert(name.clone(), Json::String(value.clone()));
        }
    }
    Json::Object(out)
}

/// Renders a whole table (`{key: {field: value, ...}, ...}`). `key_override`
/// lets a caller substitute the virtual (gNMI-facing) key for a single
/// entry when rendering one key at a time via repeated calls.
pub fn render_table(entries: &HashMap<String, HashMap<String, String>>) -> Json {
    let mut out = Map::new();
    for (key, fields) in entries {
        out.insert(key.clone(), render_entry(fields));
    }
    Json::Object(out)
}

/// Reads a scalar field, falling back to the leaf-list form
/// (`field@`, split on `,`) if the bare field is absent — "for bare field
/// reads, first try field as a scalar, else field@ as a list" (spec §4.4).
pub fn scalar_or_list(fields: &HashMap<String, String>, field: &str) -> Option<Json> {
    if let Some(v) = fields.get(field) {
        return Some(Json::String(v.clone()));
    }
    let list_key = format!("{field}{LEAF_LIST_SUFFIX}");
    fields.get(&list_key).map(|v| {
        let items: Vec<Json> = if v.is_empty() {
            Vec::new()
        } else {
            v.split(',').map(|s| Json::String(s.to_string())).collect()
        };
        Json::Array(items)
    })
}

/// Reads `field@`, splits on `,`, and returns the element at `index`,
/// bounds-checked (spec §4.4 "for field+index reads").
pub fn list_index(fields: &HashMap<String, String>, field: &str, index: usize) -> GnmiResult<Json> {
    let list_key = format!("{field}{LEAF_LIST_SUFFIX}");
    let raw = fields
        .get(&list_key)
        .ok_or_else(|| GnmiError::not_found(format!("leaf-list field '{field}' not found")))?;
    let items: Vec<&str> = if raw.is_empty() { Vec::new() } else { raw.split(',').collect() };
    items
        .get(index)
        .map(|s| Json::String(s.to_string()))
        .ok_or_else(|| GnmiError::not_found(format!("index {index} out of range for '{field}'")))
}

/// Serializes a JSON value compactly (no pretty-printing), matching the
/// teacher stack's `serde_json` usage elsewhere.
pub fn to_compact_bytes(value: &Json) -> GnmiResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| GnmiError::internal(format!("json encode failed: {e}")))
}

/// Decodes a gNMI JSON_IETF payload (`{field: string | []string}`) into the
/// `FieldValue` map that `RedisOps::hset` expects, flattening leaf-lists
/// (spec §4.8 "add with a key").
pub fn decode_fields(value: &Json) -> GnmiResult<HashMap<String, FieldValue>> {
    let obj = value
        .as_object()
        .ok_or_else(|| GnmiError::invalid_argument("set value must be a JSON object of fields"))?;
    let mut out = HashMap::with_capacity(obj.len());
    for (field, v) in obj {
        match v {
            Json::String(s) => {
                out.insert(field.clone(), FieldValue::Scalar(s.clone()));
            }
            Json::Array(items) => {
                let strings: GnmiResult<Vec<String>> = items
                    .iter()
                    .map(|i| {
                        i.as_str()
                            .map(|s| s.to_string())
                            .ok_or_else(|| GnmiError::invalid_argument(format!("leaf-list field '{field}' has a non-string element")))
                    })
                    .collect();
                out.insert(field.clone(), FieldValue::LeafList(strings?));
            }
            Json::Number(n) => {
                out.insert(field.clone(), FieldValue::Scalar(n.to_string()));
            }
            Json::Bool(b) => {
                out.insert(field.clone(), FieldValue::Scalar(b.to_string()));
            }
            other => {
                return Err(GnmiError::invalid_argument(format!(
                    "field '{field}' has unsupported value shape {other:?}"
                )))
            }
        }
    }
    Ok(out)
}

/// Decodes a bulk set value (`{key: {field: value, ...}, ...}`, spec §4.8
/// "add without a key").
pub fn decode_bulk(value: &Json) -> GnmiResult<HashMap<String, HashMap<String, FieldValue>>> {
    let obj = value
        .as_object()
        .ok_or_else(|| GnmiError::invalid_argument("bulk set value must be a JSON object of keys"))?;
    let mut out = HashMap::with_capacity(obj.len());
    for (key, entry) in obj {
        out.insert(key.clone(), decode_fields(entry)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn leaf_list_suffix_is_split_into_array() {
        let rendered = render_entry(&fields(&[("members@", "Ethernet0,Ethernet4")]));
        assert_eq!(rendered, json!({"members": ["Ethernet0", "Ethernet4"]}));
    }

    #[test]
    fn empty_leaf_list_value_renders_empty_array() {
        let rendered = render_entry(&fields(&[("members@", "")]));
        assert_eq!(rendered, json!({"members": []}));
    }

    #[test]
    fn null_marker_field_is_dropped() {
        let rendered = render_entry(&fields(&[("NULL", "NULL"), ("mtu", "9100")]));
        assert_eq!(rendered, json!({"mtu": "9100"}));
    }

    #[test]
    fn scalar_field_renders_as_string() {
        let rendered = render_entry(&fields(&[("admin_status", "up")]));
        assert_eq!(rendered, json!({"admin_status": "up"}));
    }

    #[test]
    fn scalar_or_list_prefers_scalar_field() {
        let f = fields(&[("admin_status", "up")]);
        assert_eq!(scalar_or_list(&f, "admin_status"), Some(json!("up")));
    }

    #[test]
    fn scalar_or_list_falls_back_to_leaf_list() {
        let f = fields(&[("members@", "Ethernet0,Ethernet4")]);
        assert_eq!(scalar_or_list(&f, "members"), Some(json!(["Ethernet0", "Ethernet4"])));
    }

    #[test]
    fn scalar_or_list_absent_field_is_none() {
        let f = fields(&[("mtu", "9100")]);
        assert_eq!(scalar_or_list(&f, "admin_status"), None);
    }

    #[test]
    fn list_index_bounds_checked() {
        let f = fields(&[("members@", "Ethernet0,Ethernet4")]);
        assert_eq!(list_index(&f, "members", 1).unwrap(), json!("Ethernet4"));
        assert!(list_index(&f, "members", 5).is_err());
    }

    #[test]
    fn decode_fields_flattens_leaf_lists() {
        let decoded = decode_fields(&json!({"members": ["Ethernet0", "Ethernet4"], "admin_status": "up"})).unwrap();
        assert_eq!(decoded.get("members"), Some(&FieldValue::LeafList(vec!["Ethernet0".into(), "Ethernet4".into()])));
        assert_eq!(decoded.get("admin_status"), Some(&FieldValue::Scalar("up".into())));
    }

    #[test]
    fn decode_bulk_decodes_per_key() {
        let decoded = decode_bulk(&json!({
            "Ethernet0": {"admin_status": "up"},
            "Ethernet4": {"admin_status": "down"}
        }))
        .unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["Ethernet0"].get("admin_status"), Some(&FieldValue::Scalar("up".into())));
    }

    #[test]
    fn compact_encoding_has_no_whitespace() {
        let bytes = to_compact_bytes(&json!({"a": 1})).unwrap();
        assert_eq!(bytes, b"{\"a\":1}");
    }
}
