//! Decoding of protobuf wrappers that the read API embeds in JSON.
//!
//! The read API serialises `google.protobuf.StringValue` as
//! `{"typeUrl": "...StringValue", "value": "<hex of utf-8 bytes>"}`, sometimes
//! nested inside a JSON-encoded string. Attribute values additionally arrive
//! as protobuf `Struct`s or as `columns`/`rows` tables.
//!
//! - [`decode_protobuf_values`] replaces every wrapped string with its text
//! - [`has_protobuf_values`] reports whether any wrapped string is present
//! - [`decode_protobuf_struct`] turns an attribute payload into a table

use core_types::AttributeValueData;
use serde_json::{Map, Value};

/// Type tag identifying a wrapped string.
pub const STRING_VALUE_TYPE: &str = "google.protobuf.StringValue";

/// Decode a hex payload into a UTF-8 string.
///
/// Returns `None` for odd-length input, non-hex digits, or bytes that are
/// not valid UTF-8.
pub fn hex_to_string(hex: &str) -> Option<String> {
    let bytes = hex::decode(hex).ok()?;
    String::from_utf8(bytes).ok()
}

/// Hex payload of a wrapped string, if `map` has the wrapped shape.
fn wrapped_payload(map: &Map<String, Value>) -> Option<&str> {
    let type_url = map.get("typeUrl")?.as_str()?;
    if !type_url.contains(STRING_VALUE_TYPE) {
        return None;
    }
    map.get("value")?.as_str()
}

fn decode_wrapped(map: &Map<String, Value>) -> Option<String> {
    wrapped_payload(map).and_then(hex_to_string)
}

/// Decode a string that is itself a JSON-encoded wrapped string.
fn decode_embedded(text: &str) -> Option<String> {
    // Only objects can match; skip the parse for ordinary text.
    if !text.trim_start().starts_with('{') {
        return None;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => decode_wrapped(&map),
        _ => None,
    }
}

/// Replace every wrapped string in `value` with its decoded text.
///
/// Wrapped strings are recognised as objects and as JSON-encoded strings of
/// that shape, at any depth. Everything else is returned unchanged, with
/// object key order and array order preserved. A wrapped string whose
/// payload cannot be decoded is left exactly as it was.
pub fn decode_protobuf_values(value: Value) -> Value {
    match value {
        Value::String(text) => match decode_embedded(&text) {
            Some(decoded) => Value::String(decoded),
            None => Value::String(text),
        },
        Value::Array(items) => {
            Value::Array(items.into_iter().map(decode_protobuf_values).collect())
        }
        Value::Object(map) => {
            if wrapped_payload(&map).is_some() {
                return match decode_wrapped(&map) {
                    Some(decoded) => Value::String(decoded),
                    None => Value::Object(map),
                };
            }

            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, decode_protobuf_values(value)))
                    .collect(),
            )
        }
        scalar => scalar,
    }
}

/// Whether [`decode_protobuf_values`] would rewrite anything in `value`.
pub fn has_protobuf_values(value: &Value) -> bool {
    match value {
        Value::String(text) => decode_embedded(text).is_some(),
        Value::Array(items) => items.iter().any(has_protobuf_values),
        Value::Object(map) => {
            if wrapped_payload(map).is_some() {
                return decode_wrapped(map).is_some();
            }
            map.values().any(has_protobuf_values)
        }
        _ => false,
    }
}

/// Interpret an attribute payload (already passed through
/// [`decode_protobuf_values`]) as a table.
///
/// Accepts either an array of attribute values or an object with a
/// `values` array; the first entry's `value` is parsed with
/// [`parse_struct_value`]. Returns `None` only for `null`.
pub fn decode_protobuf_struct(data: &Value) -> Option<AttributeValueData> {
    match data {
        Value::Null => None,
        Value::Array(items) => Some(match first_entry_value(items) {
            Some(value) => parse_struct_value(value),
            None => AttributeValueData::raw_only(data.clone()),
        }),
        Value::Object(map) => {
            let entry = map
                .get("values")
                .and_then(Value::as_array)
                .and_then(|values| first_entry_value(values));

            Some(match entry {
                Some(value) => parse_struct_value(value),
                None => AttributeValueData::raw_only(data.clone()),
            })
        }
        _ => Some(AttributeValueData::raw_only(data.clone())),
    }
}

fn first_entry_value(items: &[Value]) -> Option<&Value> {
    items.first()?.as_object()?.get("value")
}

/// Parse one attribute value into columns and rows.
///
/// Recognises `{columns, rows}` tables and protobuf `Struct`s
/// (`{fields: {...}}`, yielding a single row). Anything else keeps only
/// the raw value.
pub fn parse_struct_value(value: &Value) -> AttributeValueData {
    let Some(obj) = value.as_object() else {
        return AttributeValueData::raw_only(value.clone());
    };

    if obj.contains_key("columns") && obj.contains_key("rows") {
        let columns = obj
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| cols.iter().map(column_name).collect())
            .unwrap_or_default();

        let rows = obj
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| match row {
                        Value::Array(cells) => cells.clone(),
                        other => vec![other.clone()],
                    })
                    .collect()
            })
            .unwrap_or_default();

        return AttributeValueData {
            columns,
            rows,
            raw: value.clone(),
        };
    }

    if let Some(fields) = obj.get("fields").and_then(Value::as_object) {
        let columns: Vec<String> = fields.keys().cloned().collect();
        let row = fields.values().map(extract_field_value).collect();

        return AttributeValueData {
            columns,
            rows: vec![row],
            raw: value.clone(),
        };
    }

    AttributeValueData::raw_only(value.clone())
}

fn column_name(column: &Value) -> String {
    match column {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Unwrap a protobuf `Value` (`stringValue`, `numberValue`, `boolValue`,
/// `listValue`, `structValue`) into plain JSON.
pub fn extract_field_value(field: &Value) -> Value {
    let Some(obj) = field.as_object() else {
        return field.clone();
    };

    for key in ["stringValue", "numberValue", "boolValue"] {
        if let Some(inner) = obj.get(key) {
            return inner.clone();
        }
    }

    if let Some(list) = obj.get("listValue") {
        let values = list
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(extract_field_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }

    if let Some(inner) = obj.get("structValue") {
        return inner.clone();
    }

    field.clone()
}
