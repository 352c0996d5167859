use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::marking::{Selector, SheetOutcome, SkipReason};
use crate::utils::{cell_reference, column_span};

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub selector: Selector,
    pub output_dir: PathBuf,
    pub files: Vec<FileReport>,
    /// Inputs already recorded in the processed log.
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Saved { output: PathBuf },
    Unchanged,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    /// `area1` .. `area6` mapped to their recorded column span.
    pub areas: IndexMap<String, String>,
    pub highlighted: Vec<String>,
}

impl SheetEntry {
    pub fn from_outcome(name: &str, outcome: &SheetOutcome) -> Self {
        match outcome {
            SheetOutcome::Skipped(reason) => Self {
                name: name.to_string(),
                target_row: None,
                skipped: Some(*reason),
                areas: IndexMap::new(),
                highlighted: Vec::new(),
            },
            SheetOutcome::Marked(report) => Self {
                name: name.to_string(),
                target_row: Some(report.target_row),
                skipped: None,
                areas: report
                    .areas
                    .iter()
                    .map(|range| {
                        (
                            format!("area{}", range.area),
                            column_span(range.start, range.end),
                        )
                    })
                    .collect(),
                highlighted: report
                    .highlighted
                    .iter()
                    .map(|&(row, col)| cell_reference(row, col))
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub saved: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            skipped: self.skipped.len(),
            ..Summary::default()
        };

        for file in &self.files {
            match file.status {
                FileStatus::Saved { .. } => summary.saved += 1,
                FileStatus::Unchanged => summary.unchanged += 1,
                FileStatus::Failed { .. } => summary.failed += 1,
            }
        }

        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Failed { .. }))
    }
}

pub fn serialize_to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize data to JSON")
}

pub fn write_json_to_file<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;

    let json_string = serialize_to_json(data)?;

    file.write_all(json_string.as_bytes())
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::{AreaRange, SheetReport};
    use serde_json::json;

    fn marked() -> SheetOutcome {
        SheetOutcome::Marked(SheetReport {
            sheet: "Data".to_string(),
            target_row: 4,
            areas: vec![
                AreaRange { area: 1, start: 3, end: 3 },
                AreaRange { area: 2, start: 26, end: 26 },
            ],
            highlighted: vec![(4, 2), (4, 26)],
        })
    }

    #[test]
    fn sheet_entry_uses_letters() {
        let entry = SheetEntry::from_outcome("Data", &marked());

        assert_eq!(entry.target_row, Some(4));
        assert_eq!(entry.areas.get("area1").map(String::as_str), Some("C-C"));
        assert_eq!(entry.areas.get("area2").map(String::as_str), Some("Z-Z"));
        assert_eq!(entry.highlighted, vec!["B4", "Z4"]);
    }

    #[test]
    fn report_json_shape() {
        let report = BatchReport {
            selector: Selector::try_from(2).unwrap(),
            output_dir: PathBuf::from("out"),
            files: vec![
                FileReport {
                    path: PathBuf::from("a.xlsx"),
                    status: FileStatus::Saved {
                        output: PathBuf::from("out/a.xlsx"),
                    },
                    sheets: vec![
                        SheetEntry::from_outcome("Data", &marked()),
                        SheetEntry::from_outcome("Blank", &SheetOutcome::Skipped(SkipReason::Blank)),
                    ],
                },
                FileReport {
                    path: PathBuf::from("b.xls"),
                    status: FileStatus::Failed {
                        error: "boom".to_string(),
                    },
                    sheets: Vec::new(),
                },
            ],
            skipped: vec![PathBuf::from("c.xlsx")],
        };

        let value: serde_json::Value =
            serde_json::from_str(&serialize_to_json(&report).unwrap()).unwrap();

        assert_eq!(value["selector"], json!(2));
        assert_eq!(value["files"][0]["status"], json!("saved"));
        assert_eq!(value["files"][0]["output"], json!("out/a.xlsx"));
        assert_eq!(value["files"][0]["sheets"][0]["areas"]["area2"], json!("Z-Z"));
        assert_eq!(value["files"][0]["sheets"][1]["skipped"], json!("blank"));
        assert_eq!(value["files"][1]["error"], json!("boom"));

        assert_eq!(
            report.summary(),
            Summary {
                saved: 1,
                unchanged: 0,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(report.failures().count(), 1);
    }
}
