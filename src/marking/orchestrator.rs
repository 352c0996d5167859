use serde::Serialize;
use tracing::{debug, info};

use crate::excel::{CellValue, Sheet, Workbook};
use crate::marking::highlight::highlight_row;
use crate::marking::locator::{MARKER_COLUMN, locate_target_row};
use crate::marking::rules::{RuleTable, Selector};
use crate::marking::segment::{AreaRange, MAX_AREAS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No cell in the sheet holds a value.
    Blank,
    /// Every row from row 2 down already carries a marker.
    NoUnmarkedRow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    pub target_row: usize,
    pub areas: Vec<AreaRange>,
    pub highlighted: Vec<(usize, usize)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetOutcome {
    Skipped(SkipReason),
    Marked(SheetReport),
}

impl SheetOutcome {
    /// A marked row counts as a modification even when nothing was painted.
    pub fn is_modified(&self) -> bool {
        matches!(self, SheetOutcome::Marked(_))
    }
}

pub fn process_sheet(sheet: &mut Sheet, selector: Selector) -> SheetOutcome {
    if sheet.is_blank() {
        debug!(sheet = %sheet.name, "blank sheet skipped");
        return SheetOutcome::Skipped(SkipReason::Blank);
    }

    let Some(row) = locate_target_row(sheet) else {
        debug!(sheet = %sheet.name, "no unmarked row");
        return SheetOutcome::Skipped(SkipReason::NoUnmarkedRow);
    };

    // Written before the scan: the marker column becomes part of the used
    // range and takes part in segmentation.
    sheet.set_value(row, MARKER_COLUMN, CellValue::Int(i64::from(selector.get())));

    for area in 1..=MAX_AREAS {
        if let Some(pair) = RuleTable::accepted(selector, area) {
            debug!(area, ?pair, "rule");
        }
    }

    let pass = highlight_row(sheet, row, selector);

    info!(
        sheet = %sheet.name,
        row,
        areas = pass.areas.len(),
        highlighted = pass.highlighted.len(),
        "sheet marked"
    );

    SheetOutcome::Marked(SheetReport {
        sheet: sheet.name.clone(),
        target_row: row,
        areas: pass.areas,
        highlighted: pass.highlighted,
    })
}

/// Processes every sheet in order and returns the outcome per sheet name.
pub fn process_workbook(workbook: &mut Workbook, selector: Selector) -> Vec<(String, SheetOutcome)> {
    workbook
        .sheets_mut()
        .iter_mut()
        .map(|sheet| {
            let outcome = process_sheet(sheet, selector);
            (sheet.name.clone(), outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::HIGHLIGHT_FILL;

    fn selector(n: u8) -> Selector {
        Selector::try_from(n).unwrap()
    }

    fn data_sheet() -> Sheet {
        let mut sheet = Sheet::new("Data", 4, 7);
        for col in [2, 3, 5, 6, 7] {
            sheet.set_value(1, col, CellValue::Text("h".to_string()));
        }
        for row in 2..=4 {
            sheet.set_value(row, 2, CellValue::Int(6));
            sheet.set_value(row, 5, CellValue::Int(5));
        }
        sheet
    }

    #[test]
    fn blank_sheet_is_not_modified() {
        let mut sheet = Sheet::new("Empty", 0, 0);
        let outcome = process_sheet(&mut sheet, selector(1));

        assert_eq!(outcome, SheetOutcome::Skipped(SkipReason::Blank));
        assert!(!outcome.is_modified());
        assert_eq!(sheet.max_cols, 0);
    }

    #[test]
    fn marks_first_free_row_with_the_selector() {
        let mut sheet = data_sheet();
        let outcome = process_sheet(&mut sheet, selector(4));

        let SheetOutcome::Marked(report) = outcome else {
            panic!("expected a marked sheet");
        };
        assert_eq!(report.target_row, 2);
        assert_eq!(sheet.value(2, MARKER_COLUMN), &CellValue::Int(4));
        assert_eq!(sheet.max_cols, MARKER_COLUMN);
    }

    #[test]
    fn marker_column_joins_the_scan() {
        let mut sheet = data_sheet();
        let SheetOutcome::Marked(report) = process_sheet(&mut sheet, selector(1)) else {
            panic!("expected a marked sheet");
        };

        // B..C, E..G and the marker column Z form three areas.
        assert_eq!(report.areas.len(), 3);
        assert_eq!(report.areas[2].start, MARKER_COLUMN);
        assert_eq!(report.areas[2].end, MARKER_COLUMN);

        // B=6 matches area 1 [6, 1], E=5 matches area 2 [5, 6], the marker
        // value 1 in area 3 [4, 5] does not.
        assert_eq!(report.highlighted, vec![(2, 2), (2, 5)]);
        assert_eq!(sheet.cell(2, MARKER_COLUMN).unwrap().fill, None);
    }

    #[test]
    fn marker_is_painted_when_it_forms_the_first_area() {
        // Only column A holds data, so Z is the first area and every
        // selector accepts its own value there.
        for s in Selector::all() {
            let mut sheet = Sheet::new("Ids", 3, 1);
            for row in 1..=3 {
                sheet.set_value(row, 1, CellValue::Int(row as i64));
            }

            let SheetOutcome::Marked(report) = process_sheet(&mut sheet, s) else {
                panic!("expected a marked sheet");
            };
            assert_eq!(report.highlighted, vec![(2, MARKER_COLUMN)]);
            assert_eq!(
                sheet.cell(2, MARKER_COLUMN).unwrap().fill,
                Some(HIGHLIGHT_FILL)
            );
        }
    }

    #[test]
    fn reruns_choose_the_next_row() {
        let mut sheet = data_sheet();

        let rows: Vec<usize> = (0..3)
            .filter_map(|_| match process_sheet(&mut sheet, selector(2)) {
                SheetOutcome::Marked(report) => Some(report.target_row),
                SheetOutcome::Skipped(_) => None,
            })
            .collect();
        assert_eq!(rows, vec![2, 3, 4]);

        let outcome = process_sheet(&mut sheet, selector(2));
        assert_eq!(outcome, SheetOutcome::Skipped(SkipReason::NoUnmarkedRow));
        assert!(!outcome.is_modified());
    }

    #[test]
    fn marked_without_highlights_is_still_modified() {
        let mut sheet = Sheet::new("Text", 2, 3);
        sheet.set_value(1, 2, CellValue::Text("name".to_string()));
        sheet.set_value(2, 2, CellValue::Text("value".to_string()));

        let outcome = process_sheet(&mut sheet, selector(6));
        let SheetOutcome::Marked(report) = &outcome else {
            panic!("expected a marked sheet");
        };
        assert!(report.highlighted.is_empty());
        assert!(outcome.is_modified());
        assert_eq!(sheet.cell(2, 2).unwrap().fill, None);
    }

    #[test]
    fn every_sheet_is_visited() {
        let mut workbook = Workbook::new(
            vec![data_sheet(), Sheet::new("Blank", 0, 0)],
            "book.xlsx",
        );

        let outcomes = process_workbook(&mut workbook, selector(1));

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, "Data");
        assert!(outcomes[0].1.is_modified());
        assert_eq!(outcomes[1], ("Blank".to_string(), SheetOutcome::Skipped(SkipReason::Blank)));
        assert_eq!(
            workbook.sheets()[0].cell(2, 2).unwrap().fill,
            Some(HIGHLIGHT_FILL)
        );
    }
}
