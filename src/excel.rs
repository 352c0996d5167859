mod cell;
mod fills;
mod sheet;
mod workbook;

pub use cell::{Cell, CellValue, Fill, HIGHLIGHT_FILL};
pub use fills::{SheetFills, read_fills, read_fills_from};
pub use sheet::Sheet;
pub use workbook::{Workbook, open_workbook};
