use crate::excel::{Cell, CellValue, Fill};

/// A worksheet grid with 1-based row and column indexes. Row 0 and
/// column 0 of `data` are padding so coordinates can be used directly.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub data: Vec<Vec<Cell>>,
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Sheet {
    pub fn new(name: impl Into<String>, max_rows: usize, max_cols: usize) -> Self {
        Self {
            name: name.into(),
            data: vec![vec![Cell::empty(); max_cols + 1]; max_rows + 1],
            max_rows,
            max_cols,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.data.get(row).and_then(|cells| cells.get(col))
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.cell(row, col)
            .map(|cell| &cell.value)
            .unwrap_or(&CellValue::Empty)
    }

    /// True when no cell anywhere holds a value.
    pub fn is_blank(&self) -> bool {
        self.data
            .iter()
            .all(|row| row.iter().all(|cell| cell.value.is_empty()))
    }

    fn ensure_cell_exists(&mut self, row: usize, col: usize) {
        if row >= self.data.len() {
            let row_len = self.data.first().map_or(col + 1, Vec::len);
            self.data.resize_with(row + 1, || vec![Cell::empty(); row_len]);
        }

        if col >= self.data[0].len() {
            for cells in &mut self.data {
                cells.resize_with(col + 1, Cell::empty);
            }
        }

        self.max_rows = self.max_rows.max(row);
        self.max_cols = self.max_cols.max(col);
    }

    /// Writes a value, growing the used range when the cell lies outside it.
    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.ensure_cell_exists(row, col);
        self.data[row][col].value = value;
    }

    pub fn set_fill(&mut self, row: usize, col: usize, fill: Fill) {
        self.ensure_cell_exists(row, col);
        self.data[row][col].fill = Some(fill);
    }

    /// Whole-column emptiness for columns `0..=max_cols`: entry `c` is true
    /// when no row of column `c` holds a value.
    pub fn column_emptiness(&self) -> Vec<bool> {
        let mut empty = vec![true; self.max_cols + 1];

        for cells in self.data.iter().take(self.max_rows + 1).skip(1) {
            for (col, cell) in cells.iter().enumerate().take(self.max_cols + 1) {
                if !cell.value.is_empty() {
                    empty[col] = false;
                }
            }
        }

        empty
    }
}
