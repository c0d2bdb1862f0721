use std::path::{Path, PathBuf};

use calamine::{DataType, Reader, open_workbook_auto};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::convert::RawCell;
use crate::error::{ExportError, Result};

/// Extensions of workbooks calamine can open.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Prefix Office uses for lock files of workbooks that are currently open.
pub const LOCK_FILE_PREFIX: &str = "~$";

/// The raw cells of one sheet, row-major, or the error that kept the sheet
/// from being loaded.
#[derive(Debug)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Result<Vec<Vec<RawCell>>>,
}

/// Source of sheet grids for a workbook path.
pub trait WorkbookReader {
    /// Reads every sheet whose name passes `keep`. Sheets rejected by `keep`
    /// are not loaded at all. The outer error means the workbook itself could
    /// not be opened; a sheet that fails to load carries its own error.
    fn read(&self, path: &Path, keep: &dyn Fn(&str) -> bool) -> Result<Vec<SheetGrid>>;
}

/// Reads workbooks from disk with calamine.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl WorkbookReader for CalamineReader {
    fn read(&self, path: &Path, keep: &dyn Fn(&str) -> bool) -> Result<Vec<SheetGrid>> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_vec();

        let mut sheets = Vec::new();
        for name in names {
            if !keep(&name) {
                debug!(sheet = %name, "sheet ignored");
                continue;
            }
            let rows = match workbook.worksheet_range(&name) {
                Some(Ok(range)) => Ok(contiguous_region(
                    range
                        .rows()
                        .map(|row| row.iter().map(cell_to_raw).collect())
                        .collect(),
                )),
                Some(Err(error)) => Err(ExportError::from(error)),
                None => Err(ExportError::IllegalSheet {
                    sheet: name.clone(),
                    reason: "sheet listed but not readable".to_string(),
                }),
            };
            sheets.push(SheetGrid { name, rows });
        }

        Ok(sheets)
    }
}

fn cell_to_raw(cell: &DataType) -> RawCell {
    match cell {
        DataType::Empty => RawCell::Empty,
        DataType::Bool(value) => RawCell::Bool(*value),
        DataType::Int(value) => RawCell::Int(*value),
        DataType::Float(value) => RawCell::Float(*value),
        DataType::String(value) => RawCell::String(value.clone()),
        other => RawCell::String(other.to_string()),
    }
}

/// Cuts a sheet down to the block anchored at its top-left cell: columns up
/// to the first blank type cell, rows up to the first fully blank row.
pub fn contiguous_region(mut rows: Vec<Vec<RawCell>>) -> Vec<Vec<RawCell>> {
    let width = rows
        .first()
        .map(|header| header.iter().take_while(|cell| !cell.is_blank()).count())
        .unwrap_or(0);

    let height = rows
        .iter()
        .position(|row| row.iter().take(width).all(RawCell::is_blank))
        .unwrap_or(rows.len());

    rows.truncate(height);
    for row in &mut rows {
        row.truncate(width);
    }
    rows
}

/// Lists the workbooks below `root`, sorted by path. Office lock files are
/// skipped with a warning.
pub fn discover_workbooks(root: &Path) -> Result<Vec<PathBuf>> {
    let mut workbooks = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            });
        if !supported {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with(LOCK_FILE_PREFIX) {
            warn!(file = %path.display(), "skipping lock file of an open workbook");
            continue;
        }

        workbooks.push(path.to_path_buf());
    }

    workbooks.sort();
    Ok(workbooks)
}
