//! Column type grammar.
//!
//! A header cell declares a column's type with a short token. Primitive
//! tokens name a scalar kind; composite tokens wrap nested tokens in angle
//! brackets:
//!
//! ```text
//! int | float | string | bool
//! array<T>      (alias list<T>)
//! dict<K, V>    (alias map<K, V>)
//! ```
//!
//! Nesting is unbounded, e.g. `array<dict<string, array<int>>>`.

use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, Result};

/// Scalar kinds a cell can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Integer,
    Float,
    String,
    Boolean,
}

impl Primitive {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "long" => Some(Primitive::Integer),
            "float" | "double" | "number" => Some(Primitive::Float),
            "str" | "string" | "text" => Some(Primitive::String),
            "bool" | "boolean" => Some(Primitive::Boolean),
            _ => None,
        }
    }

    /// Canonical spelling used when rendering descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Integer => "int",
            Primitive::Float => "float",
            Primitive::String => "string",
            Primitive::Boolean => "bool",
        }
    }
}

/// Parsed form of a column type token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    /// Ordered sequence of elements sharing one type.
    Sequence(Box<TypeDescriptor>),
    /// Mapping from primitive keys to values of one type.
    Mapping {
        key: Primitive,
        value: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Parses a type token. Surrounding whitespace is ignored and container
    /// and primitive names are matched case-insensitively.
    pub fn parse(token: &str) -> Result<Self> {
        parse_token(token.trim(), token)
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, TypeDescriptor::Primitive(_))
    }

    /// Number of container levels, zero for primitives.
    pub fn depth(&self) -> usize {
        match self {
            TypeDescriptor::Primitive(_) => 0,
            TypeDescriptor::Sequence(element) => 1 + element.depth(),
            TypeDescriptor::Mapping { value, .. } => 1 + value.depth(),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = ExportError;

    fn from_str(token: &str) -> Result<Self> {
        TypeDescriptor::parse(token)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(primitive) => f.write_str(primitive.as_str()),
            TypeDescriptor::Sequence(element) => write!(f, "array<{element}>"),
            TypeDescriptor::Mapping { key, value } => write!(f, "dict<{}, {value}>", key.as_str()),
        }
    }
}

fn malformed(original: &str, reason: impl Into<String>) -> ExportError {
    ExportError::MalformedType {
        token: original.to_string(),
        reason: reason.into(),
    }
}

// `original` is the full header token, kept verbatim for diagnostics while
// `token` walks the nested parts.
fn parse_token(token: &str, original: &str) -> Result<TypeDescriptor> {
    if token.is_empty() {
        return Err(malformed(original, "empty type"));
    }

    let Some(open) = token.find('<') else {
        return Primitive::from_name(token)
            .map(TypeDescriptor::Primitive)
            .ok_or_else(|| malformed(original, format!("unknown type '{token}'")));
    };

    if !token.ends_with('>') {
        return Err(malformed(original, "missing closing '>'"));
    }

    let container = token[..open].trim().to_ascii_lowercase();
    let arguments = split_arguments(&token[open + 1..token.len() - 1])
        .ok_or_else(|| malformed(original, "unbalanced angle brackets"))?;

    match container.as_str() {
        "array" | "list" => match arguments.as_slice() {
            [element] => Ok(TypeDescriptor::Sequence(Box::new(parse_token(
                element, original,
            )?))),
            _ => Err(malformed(original, "array takes exactly one type argument")),
        },
        "dict" | "map" => match arguments.as_slice() {
            [key, value] => {
                let key = match parse_token(key, original)? {
                    TypeDescriptor::Primitive(primitive) => primitive,
                    _ => return Err(malformed(original, "dictionary keys must be primitive")),
                };
                Ok(TypeDescriptor::Mapping {
                    key,
                    value: Box::new(parse_token(value, original)?),
                })
            }
            _ => Err(malformed(original, "dict takes exactly two type arguments")),
        },
        other => Err(malformed(original, format!("unknown container '{other}'"))),
    }
}

/// Splits the inside of `<...>` on commas at nesting depth zero. Returns
/// `None` when the brackets do not balance.
fn split_arguments(inner: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(inner[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    parts.push(inner[start..].trim());
    Some(parts)
}
