pub mod csv;
pub mod excel;
pub mod json;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::models::Workbook;

pub use excel::{table_to_book, to_xlsx_bytes};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub trait Exporter {
    fn export(&self, book: &Workbook, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// The exporter for this format, with the CSV options taken from `config`.
    pub fn exporter(&self, config: &AppConfig) -> Result<Box<dyn Exporter>> {
        Ok(match self {
            Self::Excel => Box::new(excel::ExcelExporter),
            Self::Csv => Box::new(
                csv::CsvExporter::new()
                    .with_delimiter(config.csv_delimiter_byte()?)
                    .with_bom(config.csv_bom),
            ),
            Self::Json => Box::new(json::JsonExporter::new()),
        })
    }
}

/// A serialized file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Destination of [`download`]: the client-side save step.
pub trait FileSaver {
    fn save(&self, payload: Payload) -> impl Future<Output = Result<()>> + Send;
}

/// Saves payloads into a directory, keeping only the file-name part of the
/// requested name.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "download.xlsx".into());
        self.dir.join(name)
    }
}

impl FileSaver for DirectorySaver {
    async fn save(&self, payload: Payload) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(&payload.filename);
        tokio::fs::write(&path, &payload.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            path = %path.display(),
            bytes = payload.bytes.len(),
            mime = payload.mime,
            "saved download"
        );
        Ok(())
    }
}

/// Keeps payloads in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySaver {
    saved: Arc<Mutex<Vec<Payload>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payloads(&self) -> Vec<Payload> {
        self.saved.lock().await.clone()
    }
}

impl FileSaver for MemorySaver {
    async fn save(&self, payload: Payload) -> Result<()> {
        self.saved.lock().await.push(payload);
        Ok(())
    }
}

/// Serialize `workbook` off the async executor and hand it to `saver` under
/// `filename`. Failures propagate; nothing is retried.
pub async fn download<S: FileSaver>(workbook: Workbook, filename: &str, saver: &S) -> Result<()> {
    let bytes = tokio::task::spawn_blocking(move || to_xlsx_bytes(&workbook))
        .await
        .context("Workbook serialization task failed")??;

    saver
        .save(Payload {
            filename: filename.to_string(),
            mime: XLSX_MIME,
            bytes,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTable;

    #[tokio::test]
    async fn download_hands_xlsx_payload_to_saver() {
        let book = table_to_book(&SourceTable::from_text_rows([vec!["a", "1"]]), "Sheet1");
        let saver = MemorySaver::new();
        download(book, "report.xlsx", &saver).await.unwrap();

        let saved = saver.payloads().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].filename, "report.xlsx");
        assert_eq!(saved[0].mime, XLSX_MIME);
        assert_eq!(&saved[0].bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn serialization_failure_propagates() {
        let saver = MemorySaver::new();
        let err = download(Workbook::new(), "x.xlsx", &saver).await.unwrap_err();
        assert!(err.to_string().contains("no sheets"));
        assert!(saver.payloads().await.is_empty());
    }

    #[tokio::test]
    async fn directory_saver_strips_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path());
        assert_eq!(saver.path_for("../../etc/report.xlsx"), dir.path().join("report.xlsx"));

        let book = table_to_book(&SourceTable::from_text_rows([vec!["a"]]), "S");
        download(book, "nested/out.xlsx", &saver).await.unwrap();
        assert!(dir.path().join("out.xlsx").exists());
    }

    #[test]
    fn every_format_writes_through_its_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let book = table_to_book(&SourceTable::from_text_rows([vec!["a", "1"]]), "S");
        let config = AppConfig {
            csv_delimiter: ';',
            csv_bom: false,
            ..AppConfig::default()
        };

        for format in [ExportFormat::Excel, ExportFormat::Csv, ExportFormat::Json] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            format.exporter(&config).unwrap().export(&book, &path).unwrap();
            assert!(path.exists(), "{:?} wrote nothing", format);
        }
        let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(csv.trim_end(), "a;1");
    }

    #[test]
    fn non_ascii_delimiter_is_rejected_when_building_the_exporter() {
        let config = AppConfig {
            csv_delimiter: 'é',
            ..AppConfig::default()
        };
        assert!(ExportFormat::Csv.exporter(&config).is_err());
        assert!(ExportFormat::Json.exporter(&config).is_ok());
    }
}
