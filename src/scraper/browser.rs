use anyhow::{Context, Result};
use thirtyfour::prelude::*;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::models::{SourceCell, SourceRow, SourceTable};

const CONNECT_ATTEMPTS: u32 = 3;

/// Reads tables from a live page through a WebDriver server, so tables built
/// by client-side scripts are exported as the user sees them.
pub struct BrowserDriver {
    driver: WebDriver,
}

impl BrowserDriver {
    pub async fn new(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();

        let mut chrome_args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
        ];
        if headless {
            chrome_args.push("--headless");
        }
        for arg in chrome_args {
            caps.add_arg(arg)?;
        }

        let mut last_error = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            debug!(attempt, webdriver_url, "connecting to WebDriver");
            match WebDriver::new(webdriver_url, caps.clone()).await {
                Ok(driver) => {
                    info!(webdriver_url, "connected to WebDriver");
                    return Ok(Self { driver });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "WebDriver connection failed");
                    last_error = Some(e);
                    if attempt < CONNECT_ATTEMPTS {
                        sleep(Duration::from_millis(1000)).await;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(e).with_context(|| {
                format!(
                    "Failed to connect to WebDriver at {} after {} attempts",
                    webdriver_url, CONNECT_ATTEMPTS
                )
            }),
            None => Err(anyhow::anyhow!("No WebDriver connection attempt was made")),
        }
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    pub async fn wait_for_element(&self, selector: By, timeout_secs: u64) -> Result<WebElement> {
        let timeout = Duration::from_secs(timeout_secs);
        let start = std::time::Instant::now();

        loop {
            if let Ok(element) = self.driver.find(selector.clone()).await {
                return Ok(element);
            }

            if start.elapsed() > timeout {
                return Err(anyhow::anyhow!("Timeout waiting for element"));
            }

            sleep(Duration::from_millis(500)).await;
        }
    }

    /// Read the first table matching `css` once it appears on the page.
    pub async fn read_table(&self, css: &str, timeout_secs: u64) -> Result<SourceTable> {
        let table = self
            .wait_for_element(By::Css(css.to_string()), timeout_secs)
            .await
            .with_context(|| format!("No table matched '{}'", css))?;

        let rows = table
            .find_all(By::XPath("./tr | ./thead/tr | ./tbody/tr | ./tfoot/tr"))
            .await?;

        let mut source = SourceTable::default();
        for row in rows {
            let mut cells = Vec::new();
            for cell in row.find_all(By::XPath("./th | ./td")).await? {
                let header = cell.tag_name().await?.eq_ignore_ascii_case("th");
                let text = cell.prop("textContent").await?.unwrap_or_default();
                let rowspan = cell.attr("rowspan").await?;
                let colspan = cell.attr("colspan").await?;
                cells.push(SourceCell::from_attrs(
                    text,
                    rowspan.as_deref(),
                    colspan.as_deref(),
                    header,
                ));
            }
            source.add_row(SourceRow::new(cells));
        }

        info!(
            rows = source.rows.len(),
            cells = source.cell_count(),
            "read table from live page"
        );
        Ok(source)
    }

    pub async fn quit(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }
}
