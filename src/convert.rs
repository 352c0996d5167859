//! Legacy (`.xls`) container support.
//!
//! calamine reads legacy workbooks directly, but only the xlsx container can
//! be written. In [`LegacyMode::External`] a headless office suite converts
//! legacy inputs to xlsx before loading and converts results back afterwards.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::excel::{Workbook, open_workbook};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LegacyMode {
    /// Read .xls with the built-in reader and write results as .xlsx.
    #[default]
    Native,
    /// Round-trip .xls through an external office converter.
    External,
}

pub fn is_legacy(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xls"))
}

pub trait FormatConverter {
    fn name(&self) -> &str;

    /// Converts a legacy workbook into an xlsx file inside `out_dir`.
    fn to_modern(&mut self, legacy: &Path, out_dir: &Path) -> Result<PathBuf, ProcessError>;

    /// Converts an xlsx workbook into a legacy file inside `out_dir`.
    fn to_legacy(&mut self, modern: &Path, out_dir: &Path) -> Result<PathBuf, ProcessError>;
}

/// Drives `soffice --headless --convert-to`.
pub struct OfficeConverter {
    program: PathBuf,
    name: String,
}

impl OfficeConverter {
    /// Checks that `program` runs before handing out a converter.
    pub fn probe(program: &Path) -> Result<Self, String> {
        let output = Command::new(program)
            .arg("--version")
            .output()
            .map_err(|e| format!("{} is not available: {}", program.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {} when probed",
                program.display(),
                output.status
            ));
        }

        Ok(Self {
            program: program.to_path_buf(),
            name: program.display().to_string(),
        })
    }

    fn convert(&self, input: &Path, format: &str, out_dir: &Path) -> Result<PathBuf, ProcessError> {
        let conversion_error = |message: String| ProcessError::Conversion {
            program: self.name.clone(),
            path: input.to_path_buf(),
            message,
        };

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg(format)
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .output()
            .map_err(|e| conversion_error(e.to_string()))?;

        if !output.status.success() {
            return Err(conversion_error(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| conversion_error("input has no file name".to_string()))?;
        let mut file_name = stem.to_os_string();
        file_name.push(".");
        file_name.push(format);
        let produced = out_dir.join(file_name);

        if !produced.is_file() {
            return Err(conversion_error(format!(
                "expected output {} was not produced",
                produced.display()
            )));
        }

        Ok(produced)
    }
}

impl FormatConverter for OfficeConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_modern(&mut self, legacy: &Path, out_dir: &Path) -> Result<PathBuf, ProcessError> {
        self.convert(legacy, "xlsx", out_dir)
    }

    fn to_legacy(&mut self, modern: &Path, out_dir: &Path) -> Result<PathBuf, ProcessError> {
        self.convert(modern, "xls", out_dir)
    }
}

enum ConverterState {
    Disabled,
    Ready(Box<dyn FormatConverter>),
    Unavailable(String),
}

/// Batch-wide conversion resource: acquired once before the first file and
/// released (scratch directory removed) when dropped.
pub struct ConversionSession {
    state: ConverterState,
    scratch: TempDir,
}

impl ConversionSession {
    pub fn acquire(mode: LegacyMode, program: &Path) -> Result<Self, ProcessError> {
        let state = match mode {
            LegacyMode::Native => ConverterState::Disabled,
            LegacyMode::External => match OfficeConverter::probe(program) {
                Ok(converter) => {
                    info!(converter = converter.name(), "external converter ready");
                    ConverterState::Ready(Box::new(converter))
                }
                Err(reason) => {
                    warn!("{}; legacy files will fail", reason);
                    ConverterState::Unavailable(reason)
                }
            },
        };

        Self::with_state(state)
    }

    /// Session around an already constructed converter.
    pub fn with_converter(converter: Box<dyn FormatConverter>) -> Result<Self, ProcessError> {
        Self::with_state(ConverterState::Ready(converter))
    }

    pub fn unavailable(reason: impl Into<String>) -> Result<Self, ProcessError> {
        Self::with_state(ConverterState::Unavailable(reason.into()))
    }

    fn with_state(state: ConverterState) -> Result<Self, ProcessError> {
        let scratch = tempfile::Builder::new().prefix("excel-marker-").tempdir()?;
        debug!(scratch = %scratch.path().display(), "conversion session acquired");
        Ok(Self { state, scratch })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Loads `path`, converting a legacy file first when the session runs an
    /// external converter.
    pub fn load(&mut self, path: &Path) -> Result<Workbook, ProcessError> {
        if !is_legacy(path) {
            return Ok(open_workbook(path)?);
        }

        match &mut self.state {
            ConverterState::Disabled => Ok(open_workbook(path)?),
            ConverterState::Unavailable(reason) => Err(ProcessError::EnvironmentUnavailable {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }),
            ConverterState::Ready(converter) => {
                let converted = converter.to_modern(path, self.scratch.path())?;
                debug!(from = %path.display(), to = %converted.display(), "converted to xlsx");
                let workbook = open_workbook(&converted)?;
                if let Err(e) = std::fs::remove_file(&converted) {
                    debug!("could not remove {}: {}", converted.display(), e);
                }
                Ok(workbook)
            }
        }
    }

    /// Every path [`save`](Self::save) may write for `output`.
    pub fn output_paths(&self, output: &Path) -> Vec<PathBuf> {
        if !is_legacy(output) {
            return vec![output.to_path_buf()];
        }

        match self.state {
            ConverterState::Ready(_) => vec![output.to_path_buf(), output.with_extension("xlsx")],
            ConverterState::Disabled | ConverterState::Unavailable(_) => {
                vec![output.with_extension("xlsx")]
            }
        }
    }

    /// Saves `workbook` at `output`. Legacy outputs go through the converter
    /// when one is ready; otherwise, or if that fails, the result is written
    /// as xlsx next to it. Returns the path actually written.
    pub fn save(&mut self, workbook: &Workbook, output: &Path) -> Result<PathBuf, ProcessError> {
        if !is_legacy(output) {
            save_xlsx(workbook, output)?;
            return Ok(output.to_path_buf());
        }

        if let ConverterState::Ready(converter) = &mut self.state {
            let file_name = output.file_name().unwrap_or_else(|| OsStr::new("workbook.xls"));
            let staged = self.scratch.path().join(file_name).with_extension("xlsx");
            save_xlsx(workbook, &staged)?;

            let out_dir = output.parent().unwrap_or_else(|| Path::new("."));
            match converter.to_legacy(&staged, out_dir) {
                Ok(written) => return Ok(written),
                Err(e) => warn!("{}; keeping the xlsx result", e),
            }
        }

        let fallback = output.with_extension("xlsx");
        save_xlsx(workbook, &fallback)?;
        Ok(fallback)
    }
}

impl Drop for ConversionSession {
    fn drop(&mut self) {
        debug!(scratch = %self.scratch.path().display(), "conversion session released");
    }
}

fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), ProcessError> {
    workbook
        .save_as(path)
        .map_err(|source| ProcessError::Save {
            path: path.to_path_buf(),
            source,
        })
}
