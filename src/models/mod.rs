pub mod table;
pub mod workbook;

pub use table::{SourceCell, SourceRow, SourceTable};
pub use workbook::{
    BorderStyle, Cell, CellStyle, CellValue, MergeRegion, Sheet, VerticalAlign, Workbook,
};
