use serde::Serialize;

use crate::excel::Sheet;

/// Column A is reserved and never part of an area.
pub const FIRST_SCAN_COLUMN: usize = 2;

/// Only the first six runs have rules; later runs are neither reported nor
/// highlighted.
pub const MAX_AREAS: usize = 6;

/// Inclusive column range recorded for an area.
///
/// `start` is the watermark of the last non-empty column seen when the area
/// was closed, not the first column of the run, so a closed area usually
/// reports a single column and the last area runs to the sheet's max column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AreaRange {
    pub area: usize,
    pub start: usize,
    pub end: usize,
}

/// State of the left-to-right column scan that numbers areas.
#[derive(Clone, Debug)]
pub struct ColumnScan {
    area: usize,
    consecutive_empty: usize,
    last_non_empty: Option<usize>,
    ranges: Vec<AreaRange>,
}

impl Default for ColumnScan {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnScan {
    pub fn new() -> Self {
        Self {
            area: 1,
            consecutive_empty: 0,
            last_non_empty: None,
            ranges: Vec::new(),
        }
    }

    /// Feeds the next column. Returns the area the column belongs to when it
    /// is non-empty.
    pub fn visit(&mut self, col: usize, is_empty: bool) -> Option<usize> {
        if is_empty {
            self.consecutive_empty += 1;
            return None;
        }

        if self.consecutive_empty > 0 {
            // Leading empty columns only reset the counter.
            if let Some(last) = self.last_non_empty {
                self.close(last, col - self.consecutive_empty - 1);
                self.area += 1;
            }
            self.consecutive_empty = 0;
        }

        self.last_non_empty = Some(col);
        Some(self.area)
    }

    fn close(&mut self, start: usize, end: usize) {
        if self.area <= MAX_AREAS {
            self.ranges.push(AreaRange {
                area: self.area,
                start,
                end,
            });
        }
    }

    pub fn finish(mut self, max_col: usize) -> Vec<AreaRange> {
        if let Some(last) = self.last_non_empty {
            self.close(last, max_col);
        }
        self.ranges
    }
}

/// Runs the column scan over `sheet` and calls `on_column` for every
/// non-empty column with its area number.
pub(crate) fn scan_columns<F>(sheet: &Sheet, mut on_column: F) -> Vec<AreaRange>
where
    F: FnMut(usize, usize),
{
    let emptiness = sheet.column_emptiness();
    let mut scan = ColumnScan::new();

    for col in FIRST_SCAN_COLUMN..=sheet.max_cols {
        if let Some(area) = scan.visit(col, emptiness[col]) {
            on_column(col, area);
        }
    }

    scan.finish(sheet.max_cols)
}

/// Area ranges of `sheet`, in left-to-right order.
pub fn segment(sheet: &Sheet) -> Vec<AreaRange> {
    scan_columns(sheet, |_, _| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;
    use proptest::prelude::*;

    fn sheet_with_columns(max_cols: usize, filled: &[usize]) -> Sheet {
        let mut sheet = Sheet::new("Sheet1", 3, max_cols);
        for &col in filled {
            sheet.set_value(1, col, CellValue::Text("h".to_string()));
        }
        sheet
    }

    fn area_of_each_column(sheet: &Sheet) -> Vec<(usize, usize)> {
        let mut seen = Vec::new();
        scan_columns(sheet, |col, area| seen.push((col, area)));
        seen
    }

    #[test]
    fn runs_split_on_fully_empty_columns() {
        // B C | D empty | E F G
        let sheet = sheet_with_columns(7, &[2, 3, 5, 6, 7]);

        assert_eq!(
            area_of_each_column(&sheet),
            vec![(2, 1), (3, 1), (5, 2), (6, 2), (7, 2)]
        );
    }

    #[test]
    fn recorded_start_is_the_watermark() {
        // Known quirk: area 1 spans B..C but is recorded as C..C.
        let sheet = sheet_with_columns(7, &[2, 3, 5, 6, 7]);

        assert_eq!(
            segment(&sheet),
            vec![
                AreaRange { area: 1, start: 3, end: 3 },
                AreaRange { area: 2, start: 7, end: 7 },
            ]
        );
    }

    #[test]
    fn last_area_extends_to_max_column() {
        // Trailing empty columns H, I stay inside the final recorded range.
        let sheet = sheet_with_columns(9, &[2, 4, 5, 6, 7]);

        assert_eq!(
            segment(&sheet),
            vec![
                AreaRange { area: 1, start: 2, end: 2 },
                AreaRange { area: 2, start: 7, end: 9 },
            ]
        );
    }

    #[test]
    fn leading_empty_columns_do_not_consume_an_area() {
        let sheet = sheet_with_columns(8, &[5, 6, 8]);

        assert_eq!(
            area_of_each_column(&sheet),
            vec![(5, 1), (6, 1), (8, 2)]
        );
    }

    #[test]
    fn column_a_is_never_scanned() {
        let sheet = sheet_with_columns(3, &[1]);
        assert!(segment(&sheet).is_empty());
        assert!(area_of_each_column(&sheet).is_empty());
    }

    #[test]
    fn emptiness_is_a_whole_column_property() {
        let mut sheet = Sheet::new("Sheet1", 4, 4);
        // Target row 2 has nothing in C, but C has data further down.
        sheet.set_value(2, 2, CellValue::Int(1));
        sheet.set_value(4, 3, CellValue::Int(1));
        sheet.set_value(2, 4, CellValue::Int(1));

        assert_eq!(
            area_of_each_column(&sheet),
            vec![(2, 1), (3, 1), (4, 1)]
        );
    }

    #[test]
    fn runs_past_the_sixth_are_not_reported() {
        // Eight single-column runs: B D F H J L N P.
        let filled: Vec<usize> = (0..8).map(|i| 2 + i * 2).collect();
        let sheet = sheet_with_columns(17, &filled);

        let ranges = segment(&sheet);
        assert_eq!(ranges.len(), MAX_AREAS);
        assert_eq!(ranges.last().map(|r| r.area), Some(6));

        let areas = area_of_each_column(&sheet);
        assert_eq!(areas.last(), Some(&(16, 8)));
    }

    proptest! {
        #[test]
        fn ranges_are_bounded_disjoint_and_increasing(
            columns in proptest::collection::vec(any::<bool>(), 1..40)
        ) {
            let filled: Vec<usize> = columns
                .iter()
                .enumerate()
                .filter(|(_, f)| **f)
                .map(|(i, _)| i + 1)
                .collect();
            let sheet = sheet_with_columns(columns.len(), &filled);

            let ranges = segment(&sheet);
            prop_assert!(ranges.len() <= MAX_AREAS);

            for (i, range) in ranges.iter().enumerate() {
                prop_assert_eq!(range.area, i + 1);
                prop_assert!(range.start <= range.end);
                prop_assert!(range.start >= FIRST_SCAN_COLUMN);
            }
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }

            let areas = area_of_each_column(&sheet);
            for pair in areas.windows(2) {
                prop_assert!(pair[0].0 < pair[1].0);
                prop_assert!(pair[0].1 <= pair[1].1);
            }
        }
    }
}
