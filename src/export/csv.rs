use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use crate::models::Workbook;
use super::Exporter;

/// Writes the first sheet as a dense grid; cells covered by a merge are empty.
pub struct CsvExporter {
    delimiter: u8,
    with_bom: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            with_bom: true,   // UTF-8 BOM so spreadsheet apps detect the encoding
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_bom(mut self, with_bom: bool) -> Self {
        self.with_bom = with_bom;
        self
    }

    pub fn write_to<W: Write>(&self, book: &Workbook, mut out: W) -> Result<()> {
        if self.with_bom {
            out.write_all(&[0xEF, 0xBB, 0xBF])?;
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .from_writer(out);

        if let Some(sheet) = book.first_sheet() {
            for record in sheet.to_rows() {
                writer.write_record(&record)?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn export(&self, book: &Workbook, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(book, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::table_to_book;
    use crate::models::{SourceCell, SourceRow, SourceTable};

    #[test]
    fn merged_areas_are_blank_in_the_grid() {
        let source = SourceTable::new(vec![
            SourceRow::new(vec![SourceCell::new("Name").with_spans(1, 2), SourceCell::new("Qty")]),
            SourceRow::new(vec![
                SourceCell::new("a"),
                SourceCell::new("b"),
                SourceCell::new("1.50"),
            ]),
        ]);
        let book = table_to_book(&source, "S");

        let mut out = Vec::new();
        CsvExporter::new()
            .with_bom(false)
            .with_delimiter(b';')
            .write_to(&book, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Name;;Qty\na;b;1.5\n");
    }

    #[test]
    fn bom_is_written_by_default() {
        let book = table_to_book(&SourceTable::from_text_rows([vec!["x"]]), "S");
        let mut out = Vec::new();
        CsvExporter::new().write_to(&book, &mut out).unwrap();
        assert_eq!(&out[..3], &[0xEF, 0xBB, 0xBF]);
    }
}
