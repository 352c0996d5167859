//! One selector applied to a file or a folder of workbooks, one file at a
//! time. A failing file is reported and the batch moves on.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::convert::ConversionSession;
use crate::error::ProcessError;
use crate::history::ProcessedLog;
use crate::marking::{Selector, process_workbook};
use crate::report::{BatchReport, FileReport, FileStatus, SheetEntry};

pub enum FileOutcome {
    Saved {
        output: PathBuf,
        sheets: Vec<SheetEntry>,
    },
    /// No sheet had an unmarked row; nothing was written.
    Unchanged { sheets: Vec<SheetEntry> },
}

pub fn is_workbook(path: &Path) -> bool {
    let lock_file = path
        .file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with("~$"));

    !lock_file
        && path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xls") || ext.eq_ignore_ascii_case("xlsx"))
}

/// The workbooks named by `path`: the file itself, or the workbooks directly
/// inside a directory sorted by name. Paths are made absolute.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Invalid path: {}", path.display()))?;

    if path.is_file() {
        if is_workbook(&path) {
            return Ok(vec![path]);
        }
        warn!("not an Excel workbook: {}", path.display());
        return Ok(Vec::new());
    }

    if !path.is_dir() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&path)
        .with_context(|| format!("Unable to read directory: {}", path.display()))?
    {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_workbook(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();

    Ok(files)
}

/// Paths a batch may not write over, each owned by one input: the inputs
/// themselves, the output each input is named after and every result
/// already written.
#[derive(Debug, Default)]
pub struct OutputClaims {
    owners: HashMap<PathBuf, PathBuf>,
}

impl OutputClaims {
    pub fn new(inputs: &[PathBuf], output_dir: &Path) -> Self {
        let mut claims = Self::default();
        for input in inputs {
            claims.claim(input, input);
            if let Some(name) = input.file_name() {
                claims.claim(input, &output_dir.join(name));
            }
        }
        claims
    }

    fn check(&self, input: &Path, target: &Path) -> Result<(), ProcessError> {
        match self.owners.get(&resolved(target)) {
            Some(owner) if *owner != resolved(input) => Err(ProcessError::OutputConflict {
                path: target.to_path_buf(),
                owner: owner.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn claim(&mut self, input: &Path, target: &Path) {
        self.owners
            .entry(resolved(target))
            .or_insert_with(|| resolved(input));
    }
}

/// Canonical parent joined with the file name, so paths that do not exist
/// yet still compare equal to their existing spellings.
fn resolved(path: &Path) -> PathBuf {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Loads `path`, marks every sheet and saves the result under `output_dir`
/// with the same file name when any sheet changed. Nothing is touched when
/// a possible result path is claimed by another input.
pub fn process_file(
    path: &Path,
    selector: Selector,
    output_dir: &Path,
    session: &mut ConversionSession,
    claims: &mut OutputClaims,
) -> Result<FileOutcome, ProcessError> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "input path has no file name")
    })?;
    let output = output_dir.join(file_name);
    let targets = session.output_paths(&output);

    for target in &targets {
        claims.check(path, target)?;
    }

    // A stale result from an earlier run is replaced, never the input itself.
    for target in &targets {
        if target.is_file() && !same_file(target, path) {
            fs::remove_file(target)?;
        }
    }

    let mut workbook = session.load(path)?;
    debug!(source = %workbook.get_file_path().display(), sheets = workbook.sheets().len(), "marking");
    let outcomes = process_workbook(&mut workbook, selector);

    let sheets: Vec<SheetEntry> = outcomes
        .iter()
        .map(|(name, outcome)| SheetEntry::from_outcome(name, outcome))
        .collect();

    if !outcomes.iter().any(|(_, outcome)| outcome.is_modified()) {
        return Ok(FileOutcome::Unchanged { sheets });
    }

    let output = session.save(&workbook, &output)?;
    claims.claim(path, &output);
    Ok(FileOutcome::Saved { output, sheets })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub fn run_batch(
    config: &RunConfig,
    session: &mut ConversionSession,
    log: &mut ProcessedLog,
) -> Result<BatchReport> {
    let inputs = collect_inputs(&config.input)?;

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let mut claims = OutputClaims::new(&inputs, &config.output_dir);
    let (skipped, pending): (Vec<PathBuf>, Vec<PathBuf>) =
        inputs.into_iter().partition(|path| log.contains(path));

    info!(
        found = skipped.len() + pending.len(),
        pending = pending.len(),
        skipped = skipped.len(),
        "workbooks found"
    );
    for path in &skipped {
        info!("skipping already processed file: {}", path.display());
    }

    let total = pending.len();
    let mut files = Vec::with_capacity(total);

    for (index, path) in pending.into_iter().enumerate() {
        info!("[{}/{}] processing {}", index + 1, total, display_name(&path));

        let report = match process_file(
            &path,
            config.selector,
            &config.output_dir,
            session,
            &mut claims,
        ) {
            Ok(outcome) => {
                if let Err(e) = log.record(&path) {
                    warn!("could not record {}: {:#}", path.display(), e);
                }
                match outcome {
                    FileOutcome::Saved { output, sheets } => {
                        info!("saved {}", output.display());
                        FileReport {
                            path,
                            status: FileStatus::Saved { output },
                            sheets,
                        }
                    }
                    FileOutcome::Unchanged { sheets } => {
                        info!("no unmarked rows in {}", display_name(&path));
                        FileReport {
                            path,
                            status: FileStatus::Unchanged,
                            sheets,
                        }
                    }
                }
            }
            Err(e) => {
                error!("failed to process {}: {}", path.display(), e);
                FileReport {
                    path,
                    status: FileStatus::Failed {
                        error: e.to_string(),
                    },
                    sheets: Vec::new(),
                }
            }
        };

        files.push(report);
    }

    Ok(BatchReport {
        selector: config.selector,
        output_dir: config.output_dir.clone(),
        files,
        skipped,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_extensions() {
        assert!(is_workbook(Path::new("a.xlsx")));
        assert!(is_workbook(Path::new("a.XLS")));
        assert!(!is_workbook(Path::new("a.csv")));
        assert!(!is_workbook(Path::new("a")));
        assert!(!is_workbook(Path::new("~$a.xlsx")));
    }

    #[test]
    fn directory_listing_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.xls", "notes.txt", "~$b.xlsx"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.xlsx")).unwrap();

        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();

        assert_eq!(names, vec!["a.xls", "b.xlsx"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn same_stem_inputs_claim_each_others_names() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("a.xls");
        let modern = dir.path().join("a.xlsx");
        let claims = OutputClaims::new(&[legacy.clone(), modern.clone()], dir.path());

        let err = claims.check(&legacy, &modern).unwrap_err();
        assert!(matches!(err, ProcessError::OutputConflict { .. }));
        assert!(claims.check(&modern, &modern).is_ok());
        assert!(claims.check(&legacy, &legacy).is_ok());
    }

    #[test]
    fn written_results_are_claimed() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let first = input.path().join("a.xls");
        let second = input.path().join("b.xls");
        let mut claims = OutputClaims::new(&[first.clone(), second.clone()], output.path());

        let result = output.path().join("a.xlsx");
        assert!(claims.check(&second, &result).is_ok());
        claims.claim(&first, &result);
        assert!(claims.check(&second, &result).is_err());
        assert!(claims.check(&first, &result).is_ok());
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_inputs(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn non_workbook_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"x").unwrap();

        assert!(collect_inputs(&path).unwrap().is_empty());
    }
}
