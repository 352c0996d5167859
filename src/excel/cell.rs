/// Solid orange used to flag matching cells (RGB 237, 112, 45).
pub const HIGHLIGHT_FILL: Fill = Fill::Solid { rgb: 0xED702D };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fill {
    Solid { rgb: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    DateTime(f64),
    Error(String),
    /// Formula text including the leading `=`. Present but never numeric,
    /// whatever its cached result.
    Formula(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Formula cell from the text calamine reports, with or without `=`.
    pub fn formula(text: &str) -> Self {
        match text.strip_prefix('=') {
            Some(_) => CellValue::Formula(text.to_string()),
            None => CellValue::Formula(format!("={}", text)),
        }
    }

    /// Integer view of a numeric value. Floats are truncated toward zero;
    /// text, booleans, dates and formulas are not numeric.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => None,
        }
    }
}

impl From<calamine::Data> for CellValue {
    fn from(data: calamine::Data) -> Self {
        use calamine::Data;

        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Int(i),
            Data::Float(f) => CellValue::Float(f),
            Data::String(s) if s.is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s),
            Data::Bool(b) => CellValue::Bool(b),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s),
            Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub fill: Option<Fill>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, fill: None }
    }

    pub fn empty() -> Self {
        Self {
            value: CellValue::Empty,
            fill: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_truncate_toward_zero() {
        assert_eq!(CellValue::Float(5.9).as_integer(), Some(5));
        assert_eq!(CellValue::Float(-1.5).as_integer(), Some(-1));
        assert_eq!(CellValue::Int(6).as_integer(), Some(6));
    }

    #[test]
    fn non_numeric_values_have_no_integer() {
        assert_eq!(CellValue::Text("4".to_string()).as_integer(), None);
        assert_eq!(CellValue::Bool(true).as_integer(), None);
        assert_eq!(CellValue::DateTime(45000.0).as_integer(), None);
        assert_eq!(CellValue::Empty.as_integer(), None);
        assert_eq!(CellValue::formula("2*3").as_integer(), None);
    }

    #[test]
    fn formulas_are_present_and_keep_one_equals_sign() {
        assert_eq!(CellValue::formula("B2*2"), CellValue::Formula("=B2*2".to_string()));
        assert_eq!(CellValue::formula("=SUM(B2:C2)"), CellValue::Formula("=SUM(B2:C2)".to_string()));
        assert!(!CellValue::formula("B2*2").is_empty());
    }

    #[test]
    fn empty_strings_read_as_absent() {
        let value = CellValue::from(calamine::Data::String(String::new()));
        assert!(value.is_empty());
    }
}
