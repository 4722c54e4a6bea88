use serde::{Deserialize, Serialize};

/// Largest colspan a browser honours.
pub const MAX_COLSPAN: u32 = 1000;
/// Largest rowspan a browser honours.
pub const MAX_ROWSPAN: u32 = 65534;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCell {
    /// Raw text content, untrimmed.
    pub text: String,
    pub row_span: u32,
    pub col_span: u32,
    /// Whether the cell came from a `th` element.
    pub header: bool,
}

impl SourceCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            row_span: 1,
            col_span: 1,
            header: false,
        }
    }

    pub fn header(text: impl Into<String>) -> Self {
        Self {
            header: true,
            ..Self::new(text)
        }
    }

    pub fn with_spans(mut self, row_span: u32, col_span: u32) -> Self {
        self.row_span = row_span.clamp(1, MAX_ROWSPAN);
        self.col_span = col_span.clamp(1, MAX_COLSPAN);
        self
    }

    /// Build a cell from raw `rowspan`/`colspan` attribute values.
    pub fn from_attrs(
        text: impl Into<String>,
        rowspan: Option<&str>,
        colspan: Option<&str>,
        header: bool,
    ) -> Self {
        Self {
            text: text.into(),
            row_span: parse_span(rowspan, MAX_ROWSPAN),
            col_span: parse_span(colspan, MAX_COLSPAN),
            header,
        }
    }
}

/// Lenient span parsing: the leading digits of the trimmed value, like
/// `parseInt`. Missing, non-numeric, zero or negative values become 1.
pub fn parse_span(raw: Option<&str>, max: u32) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..digits_end];
    if digits.is_empty() {
        return 1;
    }
    match digits.parse::<u64>() {
        Ok(0) => 1,
        Ok(n) => n.min(u64::from(max)) as u32,
        // only overflow is possible here
        Err(_) => max,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceRow {
    pub cells: Vec<SourceCell>,
}

impl SourceRow {
    pub fn new(cells: Vec<SourceCell>) -> Self {
        Self { cells }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceTable {
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }

    /// Shorthand for tables of plain text cells.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| SourceRow::new(row.into_iter().map(SourceCell::new).collect()))
                .collect(),
        }
    }

    pub fn add_row(&mut self, row: SourceRow) {
        self.rows.push(row);
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_parse_leniently() {
        assert_eq!(parse_span(None, MAX_ROWSPAN), 1);
        assert_eq!(parse_span(Some("3"), MAX_ROWSPAN), 3);
        assert_eq!(parse_span(Some(" 2 "), MAX_ROWSPAN), 2);
        assert_eq!(parse_span(Some("2abc"), MAX_ROWSPAN), 2);
        assert_eq!(parse_span(Some("abc"), MAX_ROWSPAN), 1);
        assert_eq!(parse_span(Some(""), MAX_ROWSPAN), 1);
        assert_eq!(parse_span(Some("0"), MAX_ROWSPAN), 1);
        assert_eq!(parse_span(Some("-4"), MAX_ROWSPAN), 1);
        assert_eq!(parse_span(Some("5000"), MAX_COLSPAN), MAX_COLSPAN);
        assert_eq!(parse_span(Some("99999999999999999999999"), MAX_COLSPAN), MAX_COLSPAN);
    }

    #[test]
    fn cells_from_attributes_default_to_single_span() {
        let cell = SourceCell::from_attrs("x", Some("two"), None, true);
        assert_eq!((cell.row_span, cell.col_span), (1, 1));
        assert!(cell.header);
    }

    #[test]
    fn text_rows_build_plain_cells() {
        let table = SourceTable::from_text_rows([vec!["a", "b"], vec!["c"]]);
        assert_eq!(table.cell_count(), 3);
        assert!(!table.is_empty());
        assert!(SourceTable::default().is_empty());
    }
}
