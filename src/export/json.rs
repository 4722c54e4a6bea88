use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use crate::models::{CellValue, Workbook};
use super::Exporter;

pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Serialize)]
struct SheetView<'a> {
    name: &'a str,
    /// `null` where nothing was written.
    rows: Vec<Vec<Option<&'a CellValue>>>,
    merges: Vec<String>,
    column_widths: &'a [f64],
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn render(&self, book: &Workbook) -> Result<String> {
        let sheets: Vec<SheetView> = book
            .sheets()
            .iter()
            .map(|sheet| {
                let (rows, cols) = sheet.dimensions();
                SheetView {
                    name: sheet.name(),
                    rows: (0..rows)
                        .map(|r| (0..cols).map(|c| sheet.value(r, c)).collect())
                        .collect(),
                    merges: sheet.merges().iter().map(|m| m.to_a1()).collect(),
                    column_widths: sheet.column_widths(),
                }
            })
            .collect();

        Ok(if self.pretty {
            serde_json::to_string_pretty(&sheets)?
        } else {
            serde_json::to_string(&sheets)?
        })
    }
}

impl Exporter for JsonExporter {
    fn export(&self, book: &Workbook, path: &Path) -> Result<()> {
        let json = self.render(book)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
