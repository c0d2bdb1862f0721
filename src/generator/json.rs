use crate::config::Configuration;
use crate::error::Result;
use crate::generator::Generator;
use crate::model::KeyedTable;

pub const NAME: &str = "JSON";

/// Renders a table as a pretty-printed JSON object keyed by identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn name(&self) -> &str {
        NAME
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, table: &KeyedTable, _config: &Configuration) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&table.to_json())?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;

    #[test]
    fn renders_rows_keyed_by_identifier() {
        let grid = vec![
            vec!["string".into(), "array<int>".into()],
            vec!["key".into(), "drops".into()],
            vec!["key".into(), "drops".into()],
            vec!["slime".into(), "[1, 2]".into()],
        ];
        let table = assemble("Monsters", grid, "*").unwrap();
        let text = JsonGenerator.render(&table, &Configuration::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, serde_json::json!({"slime": {"key": "slime", "drops": [1, 2]}}));
        assert!(text.ends_with('\n'));
    }
}
