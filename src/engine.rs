use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use crate::assemble::assemble;
use crate::config::Configuration;
use crate::convert::RawCell;
use crate::error::{ExportError, Result};
use crate::generator::{Generator, GeneratorRegistry};
use crate::io::output::{output_path, resolve_within, write_artifact};
use crate::io::{CalamineReader, SheetGrid, WorkbookReader, discover_workbooks};

/// A sheet, or a whole workbook when `sheet` is `None`, that produced no
/// artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFailure {
    pub workbook: PathBuf,
    pub sheet: Option<String>,
    pub reason: String,
}

/// Outcome of one export batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<SheetFailure>,
    /// Data rows skipped across all sheets because their identifier did not
    /// convert.
    pub rejected_rows: usize,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives workbooks through assembly, rendering and writing.
///
/// Every sheet is handled on its own: a failure is logged, recorded in the
/// [`BatchReport`] and the batch moves on. Only misconfiguration (unknown
/// generator, workbook outside the input root, missing input root) aborts a
/// run.
pub struct Engine {
    config: Configuration,
    generator: Box<dyn Generator>,
    reader: Box<dyn WorkbookReader>,
}

impl Engine {
    pub fn new(config: Configuration, generator: Box<dyn Generator>) -> Self {
        Self {
            config,
            generator,
            reader: Box::new(CalamineReader),
        }
    }

    /// Creates an engine using the generator named in the configuration.
    pub fn from_registry(config: Configuration, registry: &GeneratorRegistry) -> Result<Self> {
        let generator = registry.resolve(&config.generator)?;
        info!(requested = %config.generator, generator = generator.name(), "using generator");
        Ok(Self::new(config, generator))
    }

    /// Replaces the workbook reader, calamine by default.
    pub fn with_reader(mut self, reader: impl WorkbookReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Exports a single workbook, then runs the completion hook.
    pub fn export_file(&self, path: &Path) -> Result<BatchReport> {
        self.export_files(&[path.to_path_buf()])
    }

    /// Exports the given workbooks, then runs the completion hook once. Every
    /// path is checked against the input root before anything is read.
    #[instrument(level = "info", skip_all, fields(count = paths.len()))]
    pub fn export_files(&self, paths: &[PathBuf]) -> Result<BatchReport> {
        let resolved = paths
            .iter()
            .map(|path| resolve_within(&self.config.input, path))
            .collect::<Result<Vec<_>>>()?;

        let mut report = BatchReport::default();
        for (root, workbook) in &resolved {
            self.export_workbook(root, workbook, &mut report);
        }
        self.complete(&report)?;
        Ok(report)
    }

    /// Exports every workbook found below the input root, then runs the
    /// completion hook once.
    #[instrument(level = "info", skip_all, fields(input = %self.config.input.display()))]
    pub fn export_all(&self) -> Result<BatchReport> {
        let root = self
            .config
            .input
            .canonicalize()
            .map_err(|_| ExportError::MissingInput(self.config.input.clone()))?;

        let mut report = BatchReport::default();
        for workbook in discover_workbooks(&root)? {
            self.export_workbook(&root, &workbook, &mut report);
        }
        self.complete(&report)?;
        Ok(report)
    }

    fn complete(&self, report: &BatchReport) -> Result<()> {
        info!(
            written = report.written.len(),
            failed = report.failures.len(),
            rejected_rows = report.rejected_rows,
            "batch finished"
        );
        self.generator.completed(&self.config)
    }

    #[instrument(level = "debug", skip_all, fields(workbook = %workbook.display()))]
    fn export_workbook(&self, root: &Path, workbook: &Path, report: &mut BatchReport) {
        let keep = |name: &str| !self.config.is_ignored_sheet(name);
        let sheets = match self.reader.read(workbook, &keep) {
            Ok(sheets) => sheets,
            Err(error) => {
                error!(workbook = %workbook.display(), %error, "cannot read workbook");
                report.failures.push(SheetFailure {
                    workbook: workbook.to_path_buf(),
                    sheet: None,
                    reason: error.to_string(),
                });
                return;
            }
        };

        for SheetGrid { name, rows } in sheets {
            match rows.and_then(|rows| self.export_sheet(root, workbook, &name, rows)) {
                Ok((output, rejected)) => {
                    info!(sheet = %name, output = %output.display(), "exported");
                    report.written.push(output);
                    report.rejected_rows += rejected;
                }
                Err(error) => {
                    error!(sheet = %name, %error, "sheet export failed");
                    report.failures.push(SheetFailure {
                        workbook: workbook.to_path_buf(),
                        sheet: Some(name),
                        reason: error.to_string(),
                    });
                }
            }
        }
    }

    fn export_sheet(
        &self,
        root: &Path,
        workbook: &Path,
        sheet: &str,
        rows: Vec<Vec<RawCell>>,
    ) -> Result<(PathBuf, usize)> {
        let table = assemble(sheet, rows, &self.config.ignore_field_mark)?;
        if !table.rejected.is_empty() {
            warn!(
                sheet,
                rejected = table.rejected.len(),
                "rows with invalid identifiers were left out"
            );
        }

        let text = self.generator.render(&table, &self.config)?;
        let output = output_path(
            root,
            &self.config.output,
            workbook,
            sheet,
            self.generator.extension(),
        )?;
        write_artifact(&output, &text)?;
        Ok((output, table.rejected.len()))
    }
}
