//! Turns a raw sheet grid into a [`KeyedTable`].
//!
//! The first three rows of a sheet declare, per column, the type token, a
//! free-form description and the field name. Every following row is data
//! whose first cell identifies the row.

use tracing::{debug, warn};

use crate::config::has_mark;
use crate::convert::{RawCell, convert};
use crate::error::{ExportError, Result};
use crate::model::{Column, KeyedTable, Record, RejectedRow, Value};
use crate::schema::TypeDescriptor;

/// Number of header rows preceding the data.
pub const HEADER_ROWS: usize = 3;

/// Header cells of one column before its type is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub ty: String,
    pub description: String,
    pub name: String,
}

/// Column definitions together with the data rows they describe.
///
/// Columns and row cells are index-aligned; [`RawTable::retain_columns`] is the
/// only way to drop a column and it removes the definition and every row's
/// cell in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    /// Splits a grid into header definitions and data rows.
    pub fn from_grid(sheet: &str, mut grid: Vec<Vec<RawCell>>) -> Result<Self> {
        if grid.len() < HEADER_ROWS {
            return Err(illegal(sheet, format!("expected {HEADER_ROWS} header rows, found {}", grid.len())));
        }

        let rows = grid.split_off(HEADER_ROWS);
        let [types, descriptions, names]: [Vec<RawCell>; HEADER_ROWS] = grid
            .try_into()
            .map_err(|_| illegal(sheet, "header rows are missing"))?;

        if types.len() != descriptions.len() || types.len() != names.len() {
            return Err(illegal(
                sheet,
                format!(
                    "header rows differ in width ({} types, {} descriptions, {} names)",
                    types.len(),
                    descriptions.len(),
                    names.len()
                ),
            ));
        }

        let columns = types
            .iter()
            .zip(&descriptions)
            .zip(&names)
            .map(|((ty, description), name)| ColumnDef {
                ty: ty.to_string(),
                description: description.to_string(),
                name: name.to_string(),
            })
            .collect::<Vec<_>>();

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawCell::Empty);
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    /// Keeps only the columns for which `keep` returns true, preserving order.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&ColumnDef) -> bool) {
        let mask: Vec<bool> = self.columns.iter().map(&mut keep).collect();
        let mut index = 0;
        self.columns.retain(|_| {
            index += 1;
            mask[index - 1]
        });
        for row in &mut self.rows {
            let mut index = 0;
            row.retain(|_| {
                index += 1;
                mask[index - 1]
            });
        }
    }

    /// Drops every column whose field name starts with `mark`. Blank names
    /// are never dropped.
    pub fn drop_ignored_fields(&mut self, mark: &str) {
        self.retain_columns(|column| column.name.is_empty() || !has_mark(&column.name, mark));
    }
}

fn illegal(sheet: &str, reason: impl Into<String>) -> ExportError {
    ExportError::IllegalSheet {
        sheet: sheet.to_string(),
        reason: reason.into(),
    }
}

/// Assembles one sheet into a table keyed by the first column.
///
/// Ignored columns are removed before any type token is parsed. A row whose
/// identifier fails to convert is recorded in [`KeyedTable::rejected`] and
/// skipped; a failure in any other field fails the whole sheet. Rows sharing
/// an identifier overwrite each other, the last one wins.
pub fn assemble(sheet: &str, grid: Vec<Vec<RawCell>>, ignore_field_mark: &str) -> Result<KeyedTable> {
    let mut raw = RawTable::from_grid(sheet, grid)?;
    raw.drop_ignored_fields(ignore_field_mark);

    if raw.columns().is_empty() {
        return Err(illegal(sheet, "no identifier column"));
    }

    let columns = raw
        .columns()
        .iter()
        .map(|def| {
            Ok(Column {
                ty: TypeDescriptor::parse(&def.ty)?,
                description: def.description.clone(),
                name: def.name.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = KeyedTable::new(sheet, columns);
    let id_column = table.columns[0].clone();

    let mut converted = Vec::with_capacity(raw.rows().len());
    for (row_index, row) in raw.rows().iter().enumerate() {
        let id_cell = &row[0];
        let context = Value::String(id_cell.to_string());
        let id = match convert(&context, &id_column.ty, &id_column.name, id_cell) {
            Ok(id) => id,
            Err(error) => {
                warn!(sheet, row = row_index, %error, "skipping row with invalid identifier");
                table.rejected.push(RejectedRow {
                    row_index,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        let record = convert_row(&table, &id, row)?;
        converted.push((id, record));
    }

    for (id, record) in converted {
        table.rows.insert(id, record);
    }

    debug!(
        sheet,
        rows = table.len(),
        rejected = table.rejected.len(),
        "sheet assembled"
    );
    Ok(table)
}

fn convert_row(table: &KeyedTable, id: &Value, row: &[RawCell]) -> Result<Record> {
    table
        .columns
        .iter()
        .zip(row)
        .map(|(column, cell)| {
            let value = convert(id, &column.ty, &column.name, cell)?;
            Ok((column.name.clone(), value))
        })
        .collect()
}
