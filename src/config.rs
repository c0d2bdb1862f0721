//! Exporter configuration persisted as `export.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name used when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "export.toml";

/// Settings shared read-only by every stage of an export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Sheets whose name starts with this prefix are never exported.
    pub ignore_sheet_mark: String,
    /// Columns whose field name starts with this prefix are dropped.
    pub ignore_field_mark: String,
    /// Name of the registered generator used to render tables.
    #[serde(alias = "custom_generator")]
    pub generator: String,
    /// Root directory holding the workbooks.
    pub input: PathBuf,
    /// Root directory receiving rendered artifacts.
    pub output: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            ignore_sheet_mark: "~".to_string(),
            ignore_field_mark: "*".to_string(),
            generator: "JSON".to_string(),
            input: PathBuf::from("data"),
            output: PathBuf::from("dist"),
        }
    }
}

impl Configuration {
    /// Loads the configuration from a TOML file. Missing keys fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(toml::from_str(&source)?)
    }

    /// Writes the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn is_ignored_sheet(&self, sheet_name: &str) -> bool {
        has_mark(sheet_name, &self.ignore_sheet_mark)
    }
}

/// Prefix test shared by sheet filtering here and field filtering in
/// [`crate::assemble`]. An empty marker would
/// match every name, so it disables filtering instead.
pub(crate) fn has_mark(name: &str, mark: &str) -> bool {
    !mark.is_empty() && name.starts_with(mark)
}
