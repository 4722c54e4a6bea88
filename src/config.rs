use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;
use crate::export::ExportFormat;
use crate::wiring::Bindings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Site the API paths (`/api/...`) are resolved against.
    pub base_url: String,
    pub webdriver_url: String,
    pub headless_mode: bool,
    pub sheet_name: String,
    pub export_excel: bool,
    pub export_csv: bool,
    pub export_json: bool,
    pub csv_delimiter: char,
    pub csv_bom: bool,
    pub last_export_path: Option<String>,
    pub bindings: Bindings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless_mode: true,
            sheet_name: "Sheet1".to_string(),
            export_excel: true,
            export_csv: false,
            export_json: false,
            csv_delimiter: ',',
            csv_bom: true,
            last_export_path: None,
            bindings: Bindings::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Missing files give the defaults; unknown keys are ignored.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "sheetwright", "sheetwright")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Formats switched on, in a fixed order.
    pub fn export_formats(&self) -> Vec<ExportFormat> {
        [
            (self.export_excel, ExportFormat::Excel),
            (self.export_csv, ExportFormat::Csv),
            (self.export_json, ExportFormat::Json),
        ]
        .into_iter()
        .filter_map(|(on, format)| on.then_some(format))
        .collect()
    }

    pub fn export_dir(&self) -> PathBuf {
        self.last_export_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The CSV delimiter as the single byte the writer needs.
    pub fn csv_delimiter_byte(&self) -> Result<u8> {
        if !self.csv_delimiter.is_ascii() {
            anyhow::bail!(
                "CSV delimiter '{}' must be a single ASCII character",
                self.csv_delimiter
            );
        }
        Ok(u8::try_from(u32::from(self.csv_delimiter))?)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if Url::parse(&self.base_url).is_err() {
            errors.push(format!("Base URL '{}' is not a valid URL", self.base_url));
        }

        if Url::parse(&self.webdriver_url).is_err() {
            errors.push(format!("WebDriver URL '{}' is not a valid URL", self.webdriver_url));
        }

        if self.sheet_name.trim().is_empty() {
            errors.push("Sheet name is required".to_string());
        } else if self.sheet_name.chars().count() > 31
            || self.sheet_name.contains(['[', ']', ':', '*', '?', '/', '\\'])
        {
            errors.push(format!("Sheet name '{}' is not allowed in a workbook", self.sheet_name));
        }

        if let Err(e) = self.csv_delimiter_byte() {
            errors.push(e.to_string());
        }

        if !self.export_excel && !self.export_csv && !self.export_json {
            errors.push("At least one export format must be selected".to_string());
        }

        if let Err(e) = self.bindings.validate() {
            errors.push(format!("Invalid binding selector: {}", e));
        }

        errors
    }
}
