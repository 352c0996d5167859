use tracing::debug;

use crate::excel::{HIGHLIGHT_FILL, Sheet};
use crate::marking::rules::{RuleTable, Selector};
use crate::marking::segment::{AreaRange, scan_columns};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightPass {
    pub areas: Vec<AreaRange>,
    /// `(row, column)` of every painted cell, in column order.
    pub highlighted: Vec<(usize, usize)>,
}

/// Segments `sheet` and paints every numeric cell of `row` whose value is
/// accepted for its area under `selector`.
pub fn highlight_row(sheet: &mut Sheet, row: usize, selector: Selector) -> HighlightPass {
    let mut matches = Vec::new();

    let areas = scan_columns(sheet, |col, area| {
        let Some(value) = sheet.value(row, col).as_integer() else {
            return;
        };
        if RuleTable::matches(selector, area, value) {
            debug!(area, col, value, "matched");
            matches.push((row, col));
        }
    });

    for &(row, col) in &matches {
        sheet.set_fill(row, col, HIGHLIGHT_FILL);
    }

    HighlightPass {
        areas,
        highlighted: matches,
    }
}
