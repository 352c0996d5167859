use crate::excel::Sheet;

/// Column Z: empty means the row is still unprocessed, otherwise it holds
/// the selector the row was processed with.
pub const MARKER_COLUMN: usize = 26;

/// Row 1 is the header row and is never marked.
pub const FIRST_DATA_ROW: usize = 2;

/// First row from row 2 down whose marker cell is empty.
pub fn locate_target_row(sheet: &Sheet) -> Option<usize> {
    (FIRST_DATA_ROW..=sheet.max_rows).find(|&row| sheet.value(row, MARKER_COLUMN).is_empty())
}
