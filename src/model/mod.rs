use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::schema::TypeDescriptor;

/// One converted row: field name → typed value, in column order.
pub type Record = IndexMap<String, Value>;

/// A typed cell value produced by the converter.
///
/// Values are totally ordered and hashable so they can key both tables and
/// dictionaries. Floats compare with [`f64::total_cmp`], which makes `NaN`
/// equal to itself and keeps `0.0` and `-0.0` apart.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(BTreeMap<Value, Value>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Dict(_) => 5,
        }
    }

    /// Converts the value into the JSON representation handed to generators.
    /// Dictionary keys are rendered as text since JSON objects only allow
    /// string keys.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(value) => serde_json::Value::String(value.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Dict(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs.cmp(rhs),
            (Value::Int(lhs), Value::Int(rhs)) => lhs.cmp(rhs),
            (Value::Float(lhs), Value::Float(rhs)) => lhs.total_cmp(rhs),
            (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),
            (Value::List(lhs), Value::List(rhs)) => lhs.cmp(rhs),
            (Value::Dict(lhs), Value::Dict(rhs)) => lhs.cmp(rhs),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Bool(value) => value.hash(state),
            Value::Int(value) => value.hash(state),
            // Bit equality matches total_cmp equality.
            Value::Float(value) => value.to_bits().hash(state),
            Value::String(value) => value.hash(state),
            Value::List(items) => items.hash(state),
            Value::Dict(entries) => entries.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::List(_) | Value::Dict(_) => write!(f, "{}", self.to_json()),
        }
    }
}

/// A column that survived filtering, with its parsed type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub ty: TypeDescriptor,
    pub description: String,
    pub name: String,
}

/// A data row dropped because its identifier cell did not convert.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// Zero-based index among the sheet's data rows.
    pub row_index: usize,
    pub reason: String,
}

/// The typed result of assembling one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    /// Sheet name as it appears in the workbook.
    pub sheet: String,
    /// Retained columns; the first one is the identifier column.
    pub columns: Vec<Column>,
    /// Identifier → record. A repeated identifier replaces the earlier record
    /// in place, so iteration follows first appearance.
    pub rows: IndexMap<Value, Record>,
    pub rejected: Vec<RejectedRow>,
}

impl KeyedTable {
    pub fn new(sheet: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            sheet: sheet.into(),
            columns,
            rows: IndexMap::new(),
            rejected: Vec::new(),
        }
    }

    pub fn get(&self, id: &Value) -> Option<&Record> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts the table into a JSON object keyed by identifier text.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|(id, record)| {
                let fields = record
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect();
                (id.to_string(), serde_json::Value::Object(fields))
            })
            .collect();
        serde_json::Value::Object(rows)
    }
}
