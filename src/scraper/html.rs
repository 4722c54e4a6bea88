//! Reads source tables out of a parsed document.

use crate::dom::Element;
use crate::models::{SourceCell, SourceRow, SourceTable};

/// Every `table` element in document order, nested tables included.
pub fn tables(doc: &Element) -> Vec<&Element> {
    doc.descendants().filter(|el| el.tag == "table").collect()
}

/// Rows of `table` (directly or through `thead`/`tbody`/`tfoot`), without
/// descending into nested tables. Cells are the row's direct `th`/`td` children.
pub fn read_table(table: &Element) -> SourceTable {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);

    SourceTable::new(
        rows.into_iter()
            .map(|tr| {
                SourceRow::new(
                    tr.child_elements()
                        .filter(|cell| cell.tag == "td" || cell.tag == "th")
                        .map(read_cell)
                        .collect(),
                )
            })
            .collect(),
    )
}

fn collect_rows<'a>(el: &'a Element, rows: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "table" => {}
            _ => collect_rows(child, rows),
        }
    }
}

fn read_cell(cell: &Element) -> SourceCell {
    SourceCell::from_attrs(
        cell.text_content(),
        cell.attr("rowspan"),
        cell.attr("colspan"),
        cell.tag == "th",
    )
}
