pub mod browser;
pub mod html;

use std::fmt;

use anyhow::Result;
use tracing::debug;

use crate::dom::{self, Selector};
use crate::error::ExportError;
use crate::models::SourceTable;

/// Which table of a page to read.
#[derive(Debug, Clone)]
pub enum TableLocator {
    /// Zero-based position among all tables in document order.
    Index(usize),
    /// First table matching the selector.
    Selector(Selector),
}

impl Default for TableLocator {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl fmt::Display for TableLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "table #{}", i),
            Self::Selector(s) => write!(f, "{}", s),
        }
    }
}

/// Parse `html` and read the located table.
pub fn extract_table(html: &str, locator: &TableLocator) -> Result<SourceTable> {
    let doc = dom::parse(html);
    let all = html::tables(&doc);
    debug!(tables = all.len(), %locator, "scanning document for tables");

    let table = match locator {
        TableLocator::Index(i) => all.get(*i).copied(),
        TableLocator::Selector(selector) => all.into_iter().find(|t| selector.matches(t)),
    };

    let table = table.ok_or_else(|| ExportError::TableNotFound(locator.to_string()))?;
    Ok(html::read_table(table))
}
