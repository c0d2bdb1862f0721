use crate::config::Configuration;
use crate::error::Result;
use crate::generator::Generator;
use crate::model::{KeyedTable, Value};

pub const NAME: &str = "GDSCRIPT";

/// Name older configurations use for this generator.
pub const LEGACY_NAME: &str = "GDS2.0";

/// Renders a table as a GDScript constant dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdScriptGenerator;

impl Generator for GdScriptGenerator {
    fn name(&self) -> &str {
        NAME
    }

    fn extension(&self) -> &str {
        "gd"
    }

    fn render(&self, table: &KeyedTable, _config: &Configuration) -> Result<String> {
        let mut out = String::new();
        out.push_str(&format!("# Generated from sheet \"{}\", do not edit.\n", table.sheet));
        for column in &table.columns {
            if !column.description.is_empty() {
                out.push_str(&format!("# {}: {}\n", column.name, column.description));
            }
        }
        out.push_str("const DATA := {\n");
        for (id, record) in &table.rows {
            out.push('\t');
            literal(&mut out, id);
            out.push_str(": {");
            for (index, (name, value)) in record.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                string_literal(&mut out, name);
                out.push_str(": ");
                literal(&mut out, value);
            }
            out.push_str("},\n");
        }
        out.push_str("}\n");
        Ok(out)
    }
}

fn string_literal(out: &mut String, text: &str) {
    // JSON string escapes are valid GDScript escapes.
    out.push_str(&serde_json::Value::String(text.to_string()).to_string());
}

fn literal(out: &mut String, value: &Value) {
    match value {
        Value::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        Value::Int(value) => out.push_str(&value.to_string()),
        Value::Float(value) if value.is_nan() => out.push_str("NAN"),
        Value::Float(value) if value.is_infinite() => {
            out.push_str(if *value > 0.0 { "INF" } else { "-INF" })
        }
        // Debug keeps the fractional part so the literal stays a float.
        Value::Float(value) => out.push_str(&format!("{value:?}")),
        Value::String(text) => string_literal(out, text),
        Value::List(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                literal(out, item);
            }
            out.push(']');
        }
        Value::Dict(entries) => {
            out.push('{');
            for (index, (key, item)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                literal(out, key);
                out.push_str(": ");
                literal(out, item);
            }
            out.push('}');
        }
    }
}
