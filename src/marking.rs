//! Row location, area segmentation and rule-based highlighting.
//!
//! For every worksheet the first unmarked row (column Z empty, from row 2
//! down) is chosen, the selector is written into its marker cell and the
//! row's cells are highlighted area by area according to [`RuleTable`].

mod highlight;
mod locator;
mod orchestrator;
mod rules;
mod segment;

pub use highlight::{HighlightPass, highlight_row};
pub use locator::{FIRST_DATA_ROW, MARKER_COLUMN, locate_target_row};
pub use orchestrator::{SheetOutcome, SheetReport, SkipReason, process_sheet, process_workbook};
pub use rules::{InvalidSelector, RULES, RuleTable, Selector};
pub use segment::{AreaRange, ColumnScan, FIRST_SCAN_COLUMN, MAX_AREAS, segment};
