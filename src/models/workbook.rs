use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("number pattern is valid")
    })
}

impl CellValue {
    /// Trim `raw`; keep it as a number when the whole trimmed text is a finite
    /// decimal number, otherwise as text (empty included).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if number_regex().is_match(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return Self::Number(n);
                }
            }
        }
        Self::Text(trimmed.to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }

    /// Character length of the rendered value, used for column sizing.
    pub fn rendered_len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Number(_) => self.to_string().chars().count(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&render_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip digits, switching to exponent form (`1e+21`, `1e-7`)
/// outside `[1e-6, 1e21)` as JavaScript's `Number#toString` does. `-0`
/// renders as `0`.
fn render_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => exp,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BorderStyle {
    None,
    Thin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellStyle {
    pub bold: bool,
    /// Applied to all four sides.
    pub border: BorderStyle,
    pub vertical: VerticalAlign,
}

impl CellStyle {
    pub fn body() -> Self {
        Self {
            bold: false,
            border: BorderStyle::Thin,
            vertical: VerticalAlign::Middle,
        }
    }

    pub fn header() -> Self {
        Self {
            bold: true,
            ..Self::body()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// Inclusive rectangle of zero-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MergeRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergeRegion {
    /// Region anchored at (`row`, `col`) covering `row_span` x `col_span` cells.
    pub fn new(row: usize, col: usize, row_span: usize, col_span: usize) -> Self {
        Self {
            first_row: row,
            first_col: col,
            last_row: row + row_span.max(1) - 1,
            last_col: col + col_span.max(1) - 1,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn overlaps(&self, other: &MergeRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// `A1:B2` notation.
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_name(self.first_col),
            self.first_row + 1,
            column_name(self.last_col),
            self.last_row + 1
        )
    }
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 26 -> AA.
pub fn column_name(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    name: String,
    #[serde(skip)]
    cells: BTreeMap<(usize, usize), Cell>,
    merges: Vec<MergeRegion>,
    column_widths: Vec<f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.get(row, col).map(|c| &c.value)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    pub fn merges(&self) -> &[MergeRegion] {
        &self.merges
    }

    /// Register a merge. Returns `false`, leaving the sheet unchanged, when the
    /// region overlaps one already registered.
    pub fn add_merge(&mut self, region: MergeRegion) -> bool {
        if self.merges.iter().any(|m| m.overlaps(&region)) {
            return false;
        }
        self.merges.push(region);
        true
    }

    pub fn column_widths(&self) -> &[f64] {
        &self.column_widths
    }

    pub fn set_column_width(&mut self, col: usize, width: f64) {
        if self.column_widths.len() <= col {
            self.column_widths.resize(col + 1, 0.0);
        }
        self.column_widths[col] = width;
    }

    /// (rows, columns) spanned by cells, merges and sized columns.
    pub fn dimensions(&self) -> (usize, usize) {
        let mut rows = 0;
        let mut cols = self.column_widths.len();
        for &(row, col) in self.cells.keys() {
            rows = rows.max(row + 1);
            cols = cols.max(col + 1);
        }
        for m in &self.merges {
            rows = rows.max(m.last_row + 1);
            cols = cols.max(m.last_col + 1);
        }
        (rows, cols)
    }

    /// Dense grid of rendered values; positions covered by a merge are empty.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let (rows, cols) = self.dimensions();
        let mut grid = vec![vec![String::new(); cols]; rows];
        for (&(row, col), cell) in &self.cells {
            grid[row][col] = cell.value.to_string();
        }
        grid
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> &mut Sheet {
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_becomes_a_number() {
        assert_eq!(CellValue::parse("42"), CellValue::Number(42.0));
        assert_eq!(CellValue::parse(" -2 "), CellValue::Number(-2.0));
        assert_eq!(CellValue::parse("2.25"), CellValue::Number(2.25));
        assert_eq!(CellValue::parse("1e3"), CellValue::Number(1000.0));
        assert_eq!(CellValue::parse(".5"), CellValue::Number(0.5));
    }

    #[test]
    fn everything_else_stays_text() {
        assert_eq!(CellValue::parse("4.2kg"), CellValue::Text("4.2kg".into()));
        assert_eq!(CellValue::parse("12 apples"), CellValue::Text("12 apples".into()));
        assert_eq!(CellValue::parse("  "), CellValue::Text(String::new()));
        assert_eq!(CellValue::parse("NaN"), CellValue::Text("NaN".into()));
        assert_eq!(CellValue::parse("inf"), CellValue::Text("inf".into()));
        assert_eq!(CellValue::parse("1e999"), CellValue::Text("1e999".into()));
    }

    #[test]
    fn rendered_length_uses_number_rendering() {
        assert_eq!(CellValue::parse("1e3").rendered_len(), 4);
        assert_eq!(CellValue::parse("007").rendered_len(), 1);
        assert_eq!(CellValue::parse("3.50").rendered_len(), 3);
        assert_eq!(CellValue::parse("héllo").rendered_len(), 5);
    }

    #[test]
    fn very_large_and_small_numbers_render_in_exponent_form() {
        assert_eq!(CellValue::parse("1e21").to_string(), "1e+21");
        assert_eq!(CellValue::parse("1e300").to_string(), "1e+300");
        assert_eq!(CellValue::parse("-1.5e22").to_string(), "-1.5e+22");
        assert_eq!(CellValue::parse("0.0000001").to_string(), "1e-7");
        assert_eq!(CellValue::parse("1e20").to_string(), "100000000000000000000");
        assert_eq!(CellValue::parse("0.000001").to_string(), "0.000001");
        assert_eq!(CellValue::parse("-0").to_string(), "0");

        assert_eq!(CellValue::parse("1e300").rendered_len(), 6);
        assert_eq!(CellValue::parse("1e-7").rendered_len(), 4);
        assert_eq!(CellValue::parse("1e21").rendered_len(), 5);
    }

    #[test]
    fn merge_regions_render_a1_and_detect_overlap() {
        let a = MergeRegion::new(0, 0, 2, 2);
        assert_eq!(a.to_a1(), "A1:B2");
        assert!(a.contains(1, 1));
        assert!(!a.contains(2, 0));
        assert!(a.overlaps(&MergeRegion::new(1, 1, 1, 3)));
        assert!(!a.overlaps(&MergeRegion::new(0, 2, 2, 1)));
    }

    #[test]
    fn column_names_roll_over() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn sheet_rejects_overlapping_merges() {
        let mut sheet = Sheet::new("S");
        assert!(sheet.add_merge(MergeRegion::new(0, 0, 2, 1)));
        assert!(!sheet.add_merge(MergeRegion::new(1, 0, 1, 2)));
        assert_eq!(sheet.merges().len(), 1);
    }
}
