use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character '{found}' at position {position} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        position: usize,
    },
    #[error("unterminated attribute selector in '{0}'")]
    UnterminatedAttribute(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("row {0} exceeds the worksheet row limit")]
    RowOutOfRange(usize),
    #[error("column {0} exceeds the worksheet column limit")]
    ColumnOutOfRange(usize),
    #[error("no table matched '{0}'")]
    TableNotFound(String),
    #[error("workbook has no sheets")]
    EmptyWorkbook,
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("form has no target url (data-url)")]
    MissingUrl,
    #[error("unsupported http method '{0}'")]
    Method(String),
    #[error("delete trigger has no data-id")]
    MissingId,
    #[error("no {kind} matched '{key}'")]
    NotBound { kind: &'static str, key: String },
    #[error("server answered {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
