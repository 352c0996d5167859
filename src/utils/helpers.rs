/// Last column (`XFD`) and row of an xlsx worksheet.
pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_ROWS: usize = 1_048_576;

#[must_use]
pub fn index_to_col_name(index: usize) -> String {
    let mut col_name = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        col_name.insert(0, (b'A' + remainder as u8) as char);
        n = (n - 1) / 26;
    }

    if col_name.is_empty() {
        col_name.push('A');
    }

    col_name
}

#[must_use]
pub fn col_name_to_index(name: &str) -> Option<usize> {
    if name.is_empty() || name.len() > 3 {
        return None;
    }

    let mut result = 0;

    for c in name.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }

        let val = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        result = result * 26 + val;
    }

    (result <= MAX_COLUMNS).then_some(result)
}

/// Splits an A1-style reference into 1-based `(row, column)`.
#[must_use]
pub fn parse_cell_reference(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = col_name_to_index(letters.trim_matches('$'))?;
    let row = digits.trim_start_matches('$').parse::<usize>().ok()?;
    (row > 0 && row <= MAX_ROWS).then_some((row, col))
}

// Format cell reference (e.g., A1, Z12)
#[must_use]
pub fn cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col_name(col), row)
}

// Format a column span (e.g., B-C)
#[must_use]
pub fn column_span(start: usize, end: usize) -> String {
    format!("{}-{}", index_to_col_name(start), index_to_col_name(end))
}
