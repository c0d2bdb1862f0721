//! Core library for the sheet-exporter command line application.
//!
//! Workbooks authored as configuration tables declare, in three header rows,
//! each column's type token, description and field name. The library parses
//! the type tokens ([`schema`]), coerces raw cells into typed values
//! ([`convert`]), assembles each sheet into a table keyed by its first column
//! ([`assemble`]) and hands the tables to a registered [`generator`]. The
//! [`engine`] drives whole batches and keeps one bad sheet from stopping the
//! rest, while spreadsheet access and artifact placement live under [`io`].

pub mod assemble;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod generator;
pub mod io;
pub mod model;
pub mod schema;

pub use config::Configuration;
pub use engine::{BatchReport, Engine, SheetFailure};
pub use error::{ExportError, Result};
