use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, Result};

/// Splits `"Items-item"` into the sheet's name and the rename used for its
/// artifact. Only the first `-` separates the two parts.
pub fn split_sheet_name(sheet: &str) -> (&str, Option<&str>) {
    match sheet.split_once('-') {
        Some((name, rename)) if !rename.trim().is_empty() => (name, Some(rename.trim())),
        Some((name, _)) => (name, None),
        None => (sheet, None),
    }
}

/// File stem of the artifact rendered from `sheet`.
pub fn output_name(sheet: &str) -> &str {
    let (name, rename) = split_sheet_name(sheet);
    rename.unwrap_or(name)
}

/// Checks that `workbook` lies under `input_root` and returns both in
/// absolute, canonical form.
pub fn resolve_within(input_root: &Path, workbook: &Path) -> Result<(PathBuf, PathBuf)> {
    let root = input_root
        .canonicalize()
        .map_err(|_| ExportError::MissingInput(input_root.to_path_buf()))?;
    let file = workbook
        .canonicalize()
        .map_err(|_| ExportError::MissingInput(workbook.to_path_buf()))?;

    if !file.starts_with(&root) {
        return Err(ExportError::IllegalFile { file, root });
    }
    Ok((root, file))
}

/// Path of the artifact for one sheet: the workbook's location relative to
/// the input root, without its extension, becomes a directory under the
/// output root that holds one file per sheet.
pub fn output_path(
    input_root: &Path,
    output_root: &Path,
    workbook: &Path,
    sheet: &str,
    extension: &str,
) -> Result<PathBuf> {
    let relative = workbook
        .strip_prefix(input_root)
        .map_err(|_| ExportError::IllegalFile {
            file: workbook.to_path_buf(),
            root: input_root.to_path_buf(),
        })?
        .with_extension("");

    Ok(output_root
        .join(relative)
        .join(format!("{}.{extension}", output_name(sheet))))
}

/// Writes a rendered artifact, creating parent directories as needed.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}
