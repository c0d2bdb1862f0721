//! Generators render a [`KeyedTable`] into the text of one artifact.
//!
//! Generators are registered by name in a [`GeneratorRegistry`]; the engine
//! only sees the resolved trait object and does not care where it came from.

pub mod gdscript;
pub mod json;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::Configuration;
use crate::error::{ExportError, Result};
use crate::model::KeyedTable;

/// A target format the exporter can render tables into.
pub trait Generator {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// File extension of rendered artifacts, without the leading dot.
    fn extension(&self) -> &str;

    fn render(&self, table: &KeyedTable, config: &Configuration) -> Result<String>;

    /// Runs once after a whole batch, whatever the number of failed sheets.
    fn completed(&self, _config: &Configuration) -> Result<()> {
        Ok(())
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Generator>>;

/// Case-insensitive map from generator names to constructors.
#[derive(Default)]
pub struct GeneratorRegistry {
    factories: BTreeMap<String, Factory>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the generators shipped with the crate.
    /// `GDS2.0` is the name older configurations use for the GDScript output.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(json::NAME, || Box::new(json::JsonGenerator));
        registry.insert(gdscript::NAME, || Box::new(gdscript::GdScriptGenerator));
        registry.insert(gdscript::LEGACY_NAME, || Box::new(gdscript::GdScriptGenerator));
        registry
    }

    fn insert<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Generator> + 'static,
    {
        self.factories
            .insert(name.trim().to_ascii_uppercase(), Box::new(factory));
    }

    /// Registers a generator under `name`, replacing any previous one. The
    /// factory is run once so that a generator without a file extension is
    /// refused here rather than at export time.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Generator> + 'static,
    {
        let illegal = |reason: &str| ExportError::IllegalGenerator {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.trim().is_empty() {
            return Err(illegal("generator name is empty"));
        }
        if factory().extension().trim().is_empty() {
            return Err(illegal("generator does not declare a file extension"));
        }
        self.insert(name, factory);
        Ok(())
    }

    /// Builds the generator registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Generator>> {
        let factory = self
            .factories
            .get(&name.trim().to_ascii_uppercase())
            .ok_or_else(|| ExportError::IllegalGenerator {
                name: name.to_string(),
                reason: format!("not registered, known generators: {}", self.names().collect::<Vec<_>>().join(", ")),
            })?;
        Ok(factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
