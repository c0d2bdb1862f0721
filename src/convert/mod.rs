//! Coercion of raw spreadsheet cells into typed [`Value`]s.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;

use crate::error::{ExportError, Result};
use crate::model::Value;
use crate::schema::{Primitive, TypeDescriptor};

/// A cell as materialised by the workbook reader, before any typing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawCell {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl RawCell {
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::String(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Bool(value) => write!(f, "{value}"),
            RawCell::Int(value) => write!(f, "{value}"),
            RawCell::Float(value) => write!(f, "{value}"),
            RawCell::String(value) => f.write_str(value),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::String(value.to_string())
    }
}

impl From<i64> for RawCell {
    fn from(value: i64) -> Self {
        RawCell::Int(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Float(value)
    }
}

impl From<bool> for RawCell {
    fn from(value: bool) -> Self {
        RawCell::Bool(value)
    }
}

/// Converts `raw` into a value of type `ty`.
///
/// `row_id` and `field` only enrich the error; they never influence the
/// converted value.
pub fn convert(row_id: &Value, ty: &TypeDescriptor, field: &str, raw: &RawCell) -> Result<Value> {
    convert_cell(ty, raw).map_err(|reason| ExportError::Conversion {
        row: row_id.to_string(),
        field: field.to_string(),
        declared: ty.to_string(),
        raw: raw.to_string(),
        reason,
    })
}

type Reason = String;

fn convert_cell(ty: &TypeDescriptor, raw: &RawCell) -> std::result::Result<Value, Reason> {
    match ty {
        TypeDescriptor::Primitive(primitive) => convert_primitive(*primitive, raw),
        TypeDescriptor::Sequence(element) => convert_sequence(element, raw),
        TypeDescriptor::Mapping { key, value } => convert_mapping(*key, value, raw),
    }
}

fn convert_primitive(primitive: Primitive, raw: &RawCell) -> std::result::Result<Value, Reason> {
    match primitive {
        Primitive::Integer => to_int(raw).map(Value::Int),
        Primitive::Float => to_float(raw).map(Value::Float),
        Primitive::String => Ok(Value::String(to_text(raw))),
        Primitive::Boolean => to_bool(raw).map(Value::Bool),
    }
}

fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

fn to_int(raw: &RawCell) -> std::result::Result<i64, Reason> {
    match raw {
        RawCell::Empty => Ok(0),
        RawCell::Int(value) => Ok(*value),
        RawCell::Float(value) => {
            integral(*value).ok_or_else(|| format!("{value} is not a whole number"))
        }
        RawCell::Bool(_) => Err("boolean cell in an integer column".to_string()),
        RawCell::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0);
            }
            if let Ok(value) = text.parse::<i64>() {
                return Ok(value);
            }
            text.parse::<f64>()
                .ok()
                .and_then(integral)
                .ok_or_else(|| format!("'{text}' is not an integer"))
        }
    }
}

fn to_float(raw: &RawCell) -> std::result::Result<f64, Reason> {
    match raw {
        RawCell::Empty => Ok(0.0),
        RawCell::Int(value) => Ok(*value as f64),
        RawCell::Float(value) => Ok(*value),
        RawCell::Bool(_) => Err("boolean cell in a float column".to_string()),
        RawCell::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0.0);
            }
            text.parse::<f64>()
                .map_err(|_| format!("'{text}' is not a number"))
        }
    }
}

fn to_text(raw: &RawCell) -> String {
    // Display already renders 3.0 as "3", which is what an id typed as
    // text in Excel looks like to the user.
    raw.to_string()
}

fn to_bool(raw: &RawCell) -> std::result::Result<bool, Reason> {
    match raw {
        RawCell::Empty => Ok(false),
        RawCell::Bool(value) => Ok(*value),
        RawCell::Int(value) => Ok(*value != 0),
        RawCell::Float(value) => Ok(*value != 0.0),
        RawCell::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "no" | "0" => Ok(false),
            "true" | "yes" | "1" => Ok(true),
            other => Err(format!("'{other}' is not a boolean")),
        },
    }
}

fn json_to_raw(value: serde_json::Value) -> RawCell {
    match value {
        serde_json::Value::Null => RawCell::Empty,
        serde_json::Value::Bool(value) => RawCell::Bool(value),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(value) => RawCell::Int(value),
            None => number.as_f64().map(RawCell::Float).unwrap_or_default(),
        },
        serde_json::Value::String(value) => RawCell::String(value),
        nested => RawCell::String(nested.to_string()),
    }
}

/// Turns one decoded JSON member back into a cell. Nested containers keep
/// their source text and are decoded again one level down, so duplicate keys
/// inside them are still seen.
fn json_member(raw: &RawValue) -> std::result::Result<RawCell, Reason> {
    let text = raw.get().trim();
    if text.starts_with(['[', '{']) {
        return Ok(RawCell::String(text.to_string()));
    }
    serde_json::from_str(text)
        .map(json_to_raw)
        .map_err(|error| format!("invalid JSON: {error}"))
}

fn parse_json<'de, T: Deserialize<'de>>(text: &'de str) -> std::result::Result<T, Reason> {
    serde_json::from_str(text).map_err(|error| format!("invalid JSON: {error}"))
}

/// Object members in document order. Unlike `serde_json::Map`, repeated keys
/// are all kept.
struct JsonEntries(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for JsonEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = JsonEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<JsonEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    entries.push(entry);
                }
                Ok(JsonEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn sequence_items(element: &TypeDescriptor, raw: &RawCell) -> std::result::Result<Vec<RawCell>, Reason> {
    let text = match raw {
        RawCell::String(text) => text.trim(),
        RawCell::Empty => return Ok(Vec::new()),
        scalar => return Ok(vec![scalar.clone()]),
    };

    if text.is_empty() {
        Ok(Vec::new())
    } else if text.starts_with('{') {
        Err("expected a JSON array".to_string())
    } else if text.starts_with('[') {
        parse_json::<Vec<Box<RawValue>>>(text)?
            .iter()
            .map(|item| json_member(item))
            .collect()
    } else if element.is_composite() {
        Err("nested containers must be written as JSON".to_string())
    } else {
        Ok(text.split(',').map(|item| RawCell::from(item.trim())).collect())
    }
}

fn convert_sequence(element: &TypeDescriptor, raw: &RawCell) -> std::result::Result<Value, Reason> {
    sequence_items(element, raw)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            convert_cell(element, item).map_err(|reason| format!("element {index}: {reason}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Value::List)
}

fn mapping_entries(
    value_type: &TypeDescriptor,
    raw: &RawCell,
) -> std::result::Result<Vec<(RawCell, RawCell)>, Reason> {
    let text = match raw {
        RawCell::String(text) => text.trim(),
        RawCell::Empty => return Ok(Vec::new()),
        _ => return Err("expected a dictionary".to_string()),
    };

    if text.is_empty() {
        return Ok(Vec::new());
    }
    if text.starts_with('[') {
        return Err("expected a JSON object".to_string());
    }
    if text.starts_with('{') {
        let JsonEntries(entries) = parse_json(text)?;
        return entries
            .into_iter()
            .map(|(key, value)| json_member(&value).map(|value| (RawCell::String(key), value)))
            .collect();
    }
    if value_type.is_composite() {
        return Err("nested containers must be written as JSON".to_string());
    }

    text.split(',')
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(key, value)| (RawCell::from(key.trim()), RawCell::from(value.trim())))
                .ok_or_else(|| format!("entry '{}' is not written as key:value", entry.trim()))
        })
        .collect()
}

fn convert_mapping(
    key_type: Primitive,
    value_type: &TypeDescriptor,
    raw: &RawCell,
) -> std::result::Result<Value, Reason> {
    let mut entries = BTreeMap::new();
    for (raw_key, raw_value) in mapping_entries(value_type, raw)? {
        let key = convert_primitive(key_type, &raw_key)
            .map_err(|reason| format!("key '{raw_key}': {reason}"))?;
        let value = convert_cell(value_type, &raw_value)
            .map_err(|reason| format!("value of key '{raw_key}': {reason}"))?;
        if entries.contains_key(&key) {
            return Err(format!("duplicate key {key}"));
        }
        entries.insert(key, value);
    }
    Ok(Value::Dict(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(token: &str) -> TypeDescriptor {
        TypeDescriptor::parse(token).unwrap()
    }

    fn ok(token: &str, raw: impl Into<RawCell>) -> Value {
        convert(&Value::Int(1), &ty(token), "field", &raw.into()).unwrap()
    }

    fn reason(token: &str, raw: impl Into<RawCell>) -> String {
        match convert(&Value::Int(1), &ty(token), "field", &raw.into()) {
            Err(ExportError::Conversion { reason, .. }) => reason,
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn blank_cells_take_type_defaults() {
        let empty = RawCell::Empty;
        let id = Value::Int(1);
        assert_eq!(convert(&id, &ty("int"), "f", &empty).unwrap(), Value::Int(0));
        assert_eq!(convert(&id, &ty("float"), "f", &empty).unwrap(), Value::Float(0.0));
        assert_eq!(convert(&id, &ty("string"), "f", &empty).unwrap(), Value::String(String::new()));
        assert_eq!(convert(&id, &ty("bool"), "f", &empty).unwrap(), Value::Bool(false));
        assert_eq!(convert(&id, &ty("array<int>"), "f", &empty).unwrap(), Value::List(vec![]));
        assert_eq!(ok("dict<int,int>", " "), Value::Dict(BTreeMap::new()));
    }

    #[test]
    fn spreadsheet_numbers_coerce_to_strict_types() {
        assert_eq!(ok("int", 42.0), Value::Int(42));
        assert_eq!(ok("int", " 17 "), Value::Int(17));
        assert_eq!(ok("int", "3.0"), Value::Int(3));
        assert_eq!(ok("float", 2_i64), Value::Float(2.0));
        assert_eq!(ok("float", "2.5"), Value::Float(2.5));
        assert_eq!(ok("string", 1001.0), Value::String("1001".into()));
        assert_eq!(ok("string", 1.5), Value::String("1.5".into()));
        assert_eq!(ok("bool", "Yes"), Value::Bool(true));
        assert_eq!(ok("bool", 0.0), Value::Bool(false));
    }

    #[test]
    fn invalid_primitives_are_reported() {
        assert!(reason("int", "abc").contains("not an integer"));
        assert!(reason("int", 1.5).contains("not a whole number"));
        assert!(reason("float", "1,5").contains("not a number"));
        assert!(reason("bool", "maybe").contains("not a boolean"));
    }

    #[test]
    fn conversion_error_names_row_field_and_raw_value() {
        let error = convert(&Value::String("hero_01".into()), &ty("int"), "level", &"high".into())
            .unwrap_err();
        match error {
            ExportError::Conversion { row, field, declared, raw, .. } => {
                assert_eq!(row, "hero_01");
                assert_eq!(field, "level");
                assert_eq!(declared, "int");
                assert_eq!(raw, "high");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn row_identifier_does_not_change_result() {
        let raw = RawCell::from("[1, 2]");
        let lhs = convert(&Value::Int(1), &ty("array<int>"), "f", &raw).unwrap();
        let rhs = convert(&Value::String("other".into()), &ty("array<int>"), "f", &raw).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn sequences_accept_json_and_shorthand() {
        let expected = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(ok("array<int>", "[1, 2, 3]"), expected);
        assert_eq!(ok("array<int>", "1, 2,3"), expected);
        assert_eq!(ok("array<int>", 7.0), Value::List(vec![Value::Int(7)]));
        assert_eq!(
            ok("array<string>", r#"["a", 2]"#),
            Value::List(vec![Value::String("a".into()), Value::String("2".into())])
        );
    }

    #[test]
    fn nested_sequences_decode_recursively() {
        let value = ok("array<array<int>>", "[[1], [2, 3], []]");
        assert_eq!(
            value,
            Value::List(vec![
                Value::List(vec![Value::Int(1)]),
                Value::List(vec![Value::Int(2), Value::Int(3)]),
                Value::List(vec![]),
            ])
        );
        assert!(reason("array<array<int>>", "1,2").contains("JSON"));
    }

    #[test]
    fn sequence_errors_point_at_element() {
        assert!(reason("array<int>", "[1, \"x\"]").starts_with("element 1"));
        assert!(reason("array<int>", "{\"a\": 1}").contains("JSON array"));
        assert!(reason("array<int>", "[1,").contains("invalid JSON"));
    }

    #[test]
    fn mappings_accept_json_and_shorthand() {
        let mut expected = BTreeMap::new();
        expected.insert(Value::Int(1), Value::String("one".into()));
        expected.insert(Value::Int(2), Value::String("two".into()));
        let expected = Value::Dict(expected);

        assert_eq!(ok("dict<int, string>", r#"{"1": "one", "2": "two"}"#), expected);
        assert_eq!(ok("map<int,string>", "1:one, 2:two"), expected);
    }

    #[test]
    fn mapping_values_may_be_containers() {
        let value = ok("dict<string, array<float>>", r#"{"pos": [1.5, 2]}"#);
        let mut expected = BTreeMap::new();
        expected.insert(
            Value::String("pos".into()),
            Value::List(vec![Value::Float(1.5), Value::Float(2.0)]),
        );
        assert_eq!(value, Value::Dict(expected));
    }

    #[test]
    fn duplicate_keys_after_conversion_fail() {
        assert!(reason("dict<int, int>", "1:10, 01:20").contains("duplicate key 1"));
        assert!(reason("dict<int, int>", r#"{"1": 1, "1.0": 2}"#).contains("duplicate key"));
    }

    #[test]
    fn repeated_json_keys_are_not_collapsed() {
        assert!(reason("dict<string, int>", r#"{"a": 1, "a": 2}"#).contains("duplicate key a"));

        let nested = reason("array<dict<string, int>>", r#"[{"b": 1}, {"c": 1, "c": 1}]"#);
        assert!(nested.starts_with("element 1"));
        assert!(nested.contains("duplicate key c"));
    }

    #[test]
    fn malformed_mappings_fail() {
        assert!(reason("dict<int, int>", "1=2").contains("key:value"));
        assert!(reason("dict<int, int>", 3.0).contains("expected a dictionary"));
        assert!(reason("dict<int, int>", "x:1").starts_with("key 'x'"));
    }

    #[test]
    fn converting_twice_gives_equal_values() {
        for (token, raw) in [("int", RawCell::Int(5)), ("float", RawCell::Float(0.25)), ("string", "abc".into()), ("bool", RawCell::Bool(true))] {
            let first = convert(&Value::Int(0), &ty(token), "f", &raw).unwrap();
            let second = convert(&Value::Int(0), &ty(token), "f", &raw).unwrap();
            assert_eq!(first, second);
        }
    }
}
