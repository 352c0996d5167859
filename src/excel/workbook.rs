use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::{Color, Format, FormatPattern, Formula, Workbook as XlsxWorkbook, Worksheet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::excel::{Cell, CellValue, Fill, Sheet, read_fills};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

#[derive(Clone, Debug)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    file_path: PathBuf,
}

pub fn open_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Unable to parse Excel file: {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .with_context(|| format!("Unable to read worksheet: {}", name))?;

        let formulas = workbook
            .worksheet_formula(name)
            .with_context(|| format!("Unable to read formulas of worksheet: {}", name))?;

        let mut sheet = create_sheet_from_range(name, range);
        apply_formulas(&mut sheet, &formulas);
        sheets.push(sheet);
    }

    if sheets.is_empty() {
        anyhow::bail!("No worksheets found in file");
    }

    if has_zip_container(path) {
        match read_fills(path) {
            Ok(fills) => {
                for sheet in &mut sheets {
                    for &((row, col), rgb) in fills.get(&sheet.name).into_iter().flatten() {
                        sheet.set_fill(row, col, Fill::Solid { rgb });
                    }
                }
            }
            Err(e) => warn!("cell fills of {} not read: {:#}", path.display(), e),
        }
    }

    debug!(path = %path.display(), sheets = sheets.len(), "workbook loaded");

    Ok(Workbook {
        sheets,
        file_path: path.to_path_buf(),
    })
}

fn has_zip_container(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

fn create_sheet_from_range(name: &str, range: Range<Data>) -> Sheet {
    // The range starts at the first used cell, not necessarily A1.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (max_rows, max_cols) = range
        .end()
        .map(|(row, col)| (row as usize + 1, col as usize + 1))
        .unwrap_or((0, 0));

    let mut sheet = Sheet::new(name, max_rows, max_cols);

    for (row_idx, col_idx, data) in range.used_cells() {
        let row = start_row as usize + row_idx + 1;
        let col = start_col as usize + col_idx + 1;
        sheet.data[row][col] = Cell::new(CellValue::from(data.clone()));
    }

    sheet
}

/// Formula cells replace their cached results.
fn apply_formulas(sheet: &mut Sheet, formulas: &Range<String>) {
    let (start_row, start_col) = formulas.start().unwrap_or((0, 0));

    for (row_idx, col_idx, text) in formulas.used_cells() {
        if text.is_empty() {
            continue;
        }
        let row = start_row as usize + row_idx + 1;
        let col = start_col as usize + col_idx + 1;
        sheet.set_value(row, col, CellValue::formula(text));
    }
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            sheets,
            file_path: file_path.into(),
        }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    pub fn get_file_path(&self) -> &Path {
        &self.file_path
    }

    /// Writes every sheet to `path` in the xlsx container, replacing any
    /// existing file. Values keep their kind and cell fills become solid
    /// background patterns.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<(), rust_xlsxwriter::XlsxError> {
        let mut workbook = XlsxWorkbook::new();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for row in 1..=sheet.max_rows {
                for col in 1..=sheet.max_cols {
                    if let Some(cell) = sheet.cell(row, col) {
                        write_cell(worksheet, (row - 1) as u32, (col - 1) as u16, cell)?;
                    }
                }
            }
        }

        workbook.save(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "workbook saved");

        Ok(())
    }
}

fn fill_format(format: Format, fill: Option<Fill>) -> Format {
    match fill {
        Some(Fill::Solid { rgb }) => format
            .set_background_color(Color::RGB(rgb))
            .set_pattern(FormatPattern::Solid),
        None => format,
    }
}

/// Serials with a time of day keep it.
fn date_format(serial: f64) -> &'static str {
    if serial.fract() == 0.0 {
        DATE_FORMAT
    } else {
        DATE_TIME_FORMAT
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let format = cell.fill.map(|fill| fill_format(Format::new(), Some(fill)));

    match (&cell.value, &format) {
        (CellValue::Empty, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Empty, None) => {}
        (CellValue::Int(i), Some(format)) => {
            worksheet.write_number_with_format(row, col, *i as f64, format)?;
        }
        (CellValue::Int(i), None) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        (CellValue::Float(f), Some(format)) => {
            worksheet.write_number_with_format(row, col, *f, format)?;
        }
        (CellValue::Float(f), None) => {
            worksheet.write_number(row, col, *f)?;
        }
        (CellValue::Bool(b), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        (CellValue::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (CellValue::DateTime(serial), _) => {
            let date_format =
                fill_format(Format::new().set_num_format(date_format(*serial)), cell.fill);
            worksheet.write_number_with_format(row, col, *serial, &date_format)?;
        }
        (CellValue::Formula(text), Some(format)) => {
            worksheet.write_formula_with_format(row, col, Formula::new(text), format)?;
        }
        (CellValue::Formula(text), None) => {
            worksheet.write_formula(row, col, Formula::new(text))?;
        }
        (CellValue::Text(s) | CellValue::Error(s), Some(format)) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        (CellValue::Text(s) | CellValue::Error(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
    }

    Ok(())
}
