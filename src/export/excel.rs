use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{ColNum, Format, FormatAlign, FormatBorder, RowNum, Worksheet};
use tracing::{debug, warn};

use super::Exporter;
use crate::error::ExportError;
use crate::models::{
    BorderStyle, Cell, CellStyle, CellValue, MergeRegion, Sheet, SourceTable, VerticalAlign,
    Workbook,
};

/// Character units added to the widest value of each column.
pub const WIDTH_PADDING: f64 = 2.0;

const ROW_LIMIT: usize = 1_048_576;
const COL_LIMIT: usize = 16_384;

/// Convert a source table into a one-sheet workbook with the same layout.
///
/// Cells are placed left to right, skipping positions claimed by a span from
/// an earlier row. Every cell gets a thin border and vertical centring, the
/// first row is bold, spans become merge regions and each column is sized to
/// its widest value plus [`WIDTH_PADDING`].
pub fn table_to_book(source: &SourceTable, sheet_name: &str) -> Workbook {
    let mut sheet = Sheet::new(sheet_name);
    // row -> occupied columns; rows above the current one are dropped as we go
    let mut occupied: BTreeMap<usize, HashSet<usize>> = BTreeMap::new();
    let mut widths: Vec<usize> = Vec::new();

    for (r, row) in source.rows.iter().enumerate() {
        occupied = occupied.split_off(&r);
        let mut c = 0;

        for source_cell in &row.cells {
            while occupied.get(&r).is_some_and(|cols| cols.contains(&c)) {
                c += 1;
            }

            let value = CellValue::parse(&source_cell.text);
            let row_span = source_cell.row_span.max(1) as usize;
            let col_span = source_cell.col_span.max(1) as usize;
            let style = if r == 0 {
                CellStyle::header()
            } else {
                CellStyle::body()
            };

            let len = value.rendered_len();
            if widths.len() < c + col_span {
                widths.resize(c + col_span, 0);
            }
            for width in &mut widths[c..c + col_span] {
                *width = (*width).max(len);
            }

            // rows past the end of the table never receive cells
            for rr in r..(r + row_span).min(source.rows.len()) {
                occupied.entry(rr).or_default().extend(c..c + col_span);
            }

            if row_span > 1 || col_span > 1 {
                let region = MergeRegion::new(r, c, row_span, col_span);
                if !sheet.add_merge(region) {
                    warn!(
                        region = %region.to_a1(),
                        "span overlaps an earlier merge, leaving cells unmerged"
                    );
                }
            }

            sheet.set(r, c, Cell { value, style });
            c += col_span;
        }
    }

    for (col, len) in widths.iter().enumerate() {
        sheet.set_column_width(col, *len as f64 + WIDTH_PADDING);
    }

    debug!(
        sheet = sheet_name,
        rows = source.rows.len(),
        merges = sheet.merges().len(),
        "converted table to workbook"
    );

    let mut book = Workbook::new();
    book.add_sheet(sheet);
    book
}

fn row_num(row: usize) -> Result<RowNum, ExportError> {
    if row >= ROW_LIMIT {
        return Err(ExportError::RowOutOfRange(row));
    }
    Ok(row as RowNum)
}

fn col_num(col: usize) -> Result<ColNum, ExportError> {
    if col >= COL_LIMIT {
        return Err(ExportError::ColumnOutOfRange(col));
    }
    Ok(col as ColNum)
}

fn format_for(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if style.border == BorderStyle::Thin {
        format = format.set_border(FormatBorder::Thin);
    }
    format.set_align(match style.vertical {
        VerticalAlign::Top => FormatAlign::Top,
        VerticalAlign::Middle => FormatAlign::VerticalCenter,
        VerticalAlign::Bottom => FormatAlign::Bottom,
    })
}

struct FormatCache(HashMap<CellStyle, Format>);

impl FormatCache {
    fn get(&mut self, style: &CellStyle) -> &Format {
        self.0.entry(*style).or_insert_with(|| format_for(style))
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), ExportError> {
    let mut formats = FormatCache(HashMap::new());

    for (col, width) in sheet.column_widths().iter().enumerate() {
        worksheet.set_column_width(col_num(col)?, *width)?;
    }

    for merge in sheet.merges() {
        let style = sheet
            .get(merge.first_row, merge.first_col)
            .map(|cell| cell.style)
            .unwrap_or_else(CellStyle::body);
        worksheet.merge_range(
            row_num(merge.first_row)?,
            col_num(merge.first_col)?,
            row_num(merge.last_row)?,
            col_num(merge.last_col)?,
            "",
            formats.get(&style),
        )?;
    }

    // merge_range left the anchors blank; typed values are written over them
    for ((row, col), cell) in sheet.cells() {
        let (row, col) = (row_num(row)?, col_num(col)?);
        let format = formats.get(&cell.style);
        match &cell.value {
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row, col, *n, format)?;
            }
            CellValue::Text(s) if s.is_empty() => {
                worksheet.write_blank(row, col, format)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string_with_format(row, col, s, format)?;
            }
        }
    }

    Ok(())
}

/// Build the `rust_xlsxwriter` workbook for `book`.
pub fn build_xlsx(book: &Workbook) -> Result<rust_xlsxwriter::Workbook, ExportError> {
    if book.sheets().is_empty() {
        return Err(ExportError::EmptyWorkbook);
    }

    let mut workbook = rust_xlsxwriter::Workbook::new();
    for sheet in book.sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name())?;
        write_sheet(worksheet, sheet)?;
    }
    Ok(workbook)
}

/// Serialize `book` to XLSX bytes.
pub fn to_xlsx_bytes(book: &Workbook) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_xlsx(book)?;
    Ok(workbook.save_to_buffer()?)
}

pub struct ExcelExporter;

impl Exporter for ExcelExporter {
    fn export(&self, book: &Workbook, path: &Path) -> Result<()> {
        let bytes = to_xlsx_bytes(book)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
