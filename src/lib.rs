//! Export HTML tables to spreadsheets, render pagination controls and wire the
//! forms, delete buttons and widgets of server-rendered pages.

pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod models;
pub mod pagination;
pub mod scraper;
pub mod wiring;

pub use config::AppConfig;
pub use error::{ExportError, SelectorError, WiringError};
pub use export::{download, table_to_book, to_xlsx_bytes};
pub use pagination::{pagination, PageEntry};
pub use wiring::{init, Bindings, Host, Outcome, Page};
