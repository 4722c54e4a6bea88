// tests/table_export.rs
use std::io::Cursor;

use calamine::{open_workbook, open_workbook_from_rs, Data, Range, Reader, Xlsx};
use pretty_assertions::assert_eq;

use sheetwright::export::{self, DirectorySaver, MemorySaver};
use sheetwright::scraper::{self, TableLocator};
use sheetwright::dom::Selector;

const REPORT: &str = r#"
<html><body>
  <table id="nav"><tr><td>ignore me</td></tr></table>
  <table class="report">
    <thead>
      <tr><th rowspan="2">Store</th><th colspan="2">Stock</th></tr>
      <tr><th>Qty</th><th>Price</th></tr>
    </thead>
    <tbody>
      <tr><td>North &amp; East</td><td>12</td><td>3.50</td></tr>
      <tr><td>South</td><td>007</td><td>n/a</td></tr>
      <tr><td>West</td><td></td><td>-0</td></tr>
    </tbody>
  </table>
</body></html>
"#;

fn read_back(bytes: Vec<u8>, sheet: &str) -> Range<Data> {
    let mut book: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    book.worksheet_range(sheet).unwrap()
}

fn value(range: &Range<Data>, row: u32, col: u32) -> Data {
    range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
}

#[test]
fn spans_numbers_and_text_survive_the_round_trip() {
    let locator = TableLocator::Selector(Selector::parse("table.report").unwrap());
    let source = scraper::extract_table(REPORT, &locator).unwrap();
    let book = export::table_to_book(&source, "Stock");

    let sheet = book.sheet("Stock").unwrap();
    let merges: Vec<String> = sheet.merges().iter().map(|m| m.to_a1()).collect();
    assert_eq!(merges, vec!["A1:A2", "B1:C1"]);

    let range = read_back(export::to_xlsx_bytes(&book).unwrap(), "Stock");
    assert_eq!(value(&range, 0, 0), Data::String("Store".into()));
    assert_eq!(value(&range, 0, 1), Data::String("Stock".into()));
    // second header row starts after the rowspan from the first
    assert_eq!(value(&range, 1, 1), Data::String("Qty".into()));
    assert_eq!(value(&range, 1, 2), Data::String("Price".into()));

    assert_eq!(value(&range, 2, 0), Data::String("North & East".into()));
    assert_eq!(value(&range, 2, 1), Data::Float(12.0));
    assert_eq!(value(&range, 2, 2), Data::Float(3.5));
    assert_eq!(value(&range, 3, 1), Data::Float(7.0));
    assert_eq!(value(&range, 3, 2), Data::String("n/a".into()));
    assert_eq!(value(&range, 4, 1), Data::Empty);
    assert_eq!(value(&range, 4, 2), Data::Float(0.0));
}

#[test]
fn first_table_is_the_default() {
    let source = scraper::extract_table(REPORT, &TableLocator::default()).unwrap();
    let book = export::table_to_book(&source, "Sheet1");
    let range = read_back(export::to_xlsx_bytes(&book).unwrap(), "Sheet1");
    assert_eq!(value(&range, 0, 0), Data::String("ignore me".into()));
}

#[test]
fn missing_table_is_an_error() {
    let locator = TableLocator::Selector(Selector::parse("#missing").unwrap());
    let err = scraper::extract_table(REPORT, &locator).unwrap_err();
    assert!(err.to_string().contains("#missing"));
}

#[test]
fn overlapping_spans_do_not_fail_the_export() {
    let html = r#"<table>
        <tr><td>a</td><td rowspan="2">b</td></tr>
        <tr><td colspan="2">c</td></tr>
    </table>"#;
    let source = scraper::extract_table(html, &TableLocator::default()).unwrap();
    let book = export::table_to_book(&source, "S");
    let merges: Vec<String> = book.sheet("S").unwrap().merges().iter().map(|m| m.to_a1()).collect();
    assert_eq!(merges, vec!["B1:B2"]);

    let range = read_back(export::to_xlsx_bytes(&book).unwrap(), "S");
    assert_eq!(value(&range, 0, 1), Data::String("b".into()));
    assert_eq!(value(&range, 1, 0), Data::String("c".into()));
}

#[tokio::test]
async fn download_writes_a_readable_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = scraper::extract_table(REPORT, &TableLocator::Index(1)).unwrap();
    let book = export::table_to_book(&source, "Stock");

    export::download(book, "stock.xlsx", &DirectorySaver::new(dir.path()))
        .await
        .unwrap();

    let mut saved: Xlsx<_> = open_workbook(dir.path().join("stock.xlsx")).unwrap();
    assert_eq!(saved.sheet_names(), vec!["Stock".to_string()]);
    let range = saved.worksheet_range("Stock").unwrap();
    assert_eq!(value(&range, 2, 1), Data::Float(12.0));
}

#[tokio::test]
async fn download_keeps_the_requested_filename() {
    let saver = MemorySaver::new();
    let source = scraper::extract_table(REPORT, &TableLocator::Index(1)).unwrap();
    export::download(export::table_to_book(&source, "Stock"), "Stock report.xlsx", &saver)
        .await
        .unwrap();

    let payloads = saver.payloads().await;
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].filename, "Stock report.xlsx");
    assert_eq!(payloads[0].mime, export::XLSX_MIME);
    let range = read_back(payloads[0].bytes.clone(), "Stock");
    assert_eq!(value(&range, 3, 0), Data::String("South".into()));
}
