use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sheetwright::dom::{self, Selector};
use sheetwright::export::{self, DirectorySaver, ExportFormat};
use sheetwright::models::{SourceTable, Workbook};
use sheetwright::scraper::browser::BrowserDriver;
use sheetwright::scraper::{self, TableLocator};
use sheetwright::wiring::{self, ApiClient, ConsoleHost, Outcome, Page};
use sheetwright::{pagination, AppConfig};

#[derive(Parser)]
#[command(
    name = "sheetwright",
    version,
    about = "Export HTML tables and drive server-rendered pages"
)]
struct Cli {
    /// Use this config file instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a table from an HTML file (or `-` for stdin)
    Export {
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Export a table from a live page through a WebDriver server
    Scrape {
        url: String,
        /// CSS selector of the table
        #[arg(long, default_value = "table")]
        selector: String,
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the pagination entries for a page
    Paginate {
        #[arg(long)]
        page: u64,
        #[arg(long)]
        count: u64,
        /// Current query string, e.g. `?sort=name&page_no=2`
        #[arg(long, default_value = "")]
        query: String,
        /// Print entries as JSON instead of markup
        #[arg(long)]
        json: bool,
    },
    /// List the forms, delete buttons and widgets found on a page
    Inspect {
        input: PathBuf,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Fill and submit one of the page's AJAX forms
    Submit {
        input: PathBuf,
        /// Form id, name or data-url
        #[arg(long)]
        form: String,
        /// Field value as name=value (repeatable)
        #[arg(long = "set", value_parser = parse_pair)]
        values: Vec<(String, String)>,
        /// Check a checkbox or radio as name=value (repeatable)
        #[arg(long = "check", value_parser = parse_pair)]
        checks: Vec<(String, String)>,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Delete a record through one of the page's delete buttons
    Delete {
        input: PathBuf,
        #[arg(long)]
        id: String,
        /// Only consider buttons for this model url
        #[arg(long)]
        model: Option<String>,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Fetch records from the custom data endpoint as choices
    Choices {
        model: String,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Show, create or check the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Path,
    /// Write the defaults (or the current values) to the config file
    Init,
    Validate,
}

#[derive(Args)]
struct TableArgs {
    /// Zero-based index of the table in the document
    #[arg(long, conflicts_with = "selector")]
    table_index: Option<usize>,
    /// Selector of the table (`#id`, `.class`, `table[attr=value]`)
    #[arg(long)]
    selector: Option<String>,
}

impl TableArgs {
    fn locator(&self) -> Result<TableLocator> {
        Ok(match (&self.selector, self.table_index) {
            (Some(selector), _) => TableLocator::Selector(Selector::parse(selector)?),
            (None, Some(index)) => TableLocator::Index(index),
            (None, None) => TableLocator::default(),
        })
    }
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long)]
    sheet: Option<String>,
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// File name without extension
    #[arg(long)]
    filename: Option<String>,
    /// Formats to write; defaults to the ones enabled in the config
    #[arg(short, long, value_enum)]
    format: Vec<ExportFormat>,
}

#[derive(Args)]
struct SiteArgs {
    /// Site the page's API paths are resolved against
    #[arg(long)]
    base_url: Option<String>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Command::Export { input, table, output } => {
            let html = read_input(&input)?;
            let source = scraper::extract_table(&html, &table.locator()?)?;
            export_table(&config, &source, &output).await
        }
        Command::Scrape {
            url,
            selector,
            timeout,
            headed,
            output,
        } => {
            let headless = config.headless_mode && !headed;
            let driver = BrowserDriver::new(&config.webdriver_url, headless).await?;
            let result = async {
                driver.navigate(&url).await?;
                driver.read_table(&selector, timeout).await
            }
            .await;
            if let Err(e) = driver.quit().await {
                warn!("Browser cleanup failed: {}", e);
            }
            export_table(&config, &result?, &output).await
        }
        Command::Paginate {
            page,
            count,
            query,
            json,
        } => {
            let entries = pagination::pagination(page, count);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{}", pagination::render(&entries, &query));
            }
            Ok(())
        }
        Command::Inspect { input, site } => {
            let page = load_page(&config, &input, &site)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
        Command::Submit {
            input,
            form,
            values,
            checks,
            site,
        } => {
            let mut page = load_page(&config, &input, &site)?;
            let target = page
                .form_mut(&form)
                .ok_or_else(|| not_bound("form", &form))?;
            for (name, value) in &values {
                if !target.set_value(name, value.as_str()) {
                    warn!(field = %name, "form has no such field");
                }
            }
            for (name, value) in &checks {
                if !target.set_checked(name, value, true) {
                    warn!(field = %name, value = %value, "form has no such checkbox or radio");
                }
            }

            let host = ConsoleHost::new(true);
            let target = page
                .form(&form)
                .ok_or_else(|| not_bound("form", &form))?;
            let outcome = page.submit_form(target, &host).await;
            report(&outcome);
            Ok(())
        }
        Command::Delete {
            input,
            id,
            model,
            yes,
            site,
        } => {
            let page = load_page(&config, &input, &site)?;
            let trigger = page
                .delete_trigger(&id, model.as_deref())
                .ok_or_else(|| not_bound("delete button", &id))?;
            let outcome = page.delete_item(trigger, &ConsoleHost::new(yes)).await;
            report(&outcome);
            Ok(())
        }
        Command::Choices { model, params, site } => {
            let api = ApiClient::new(site.base_url.as_deref().unwrap_or(&config.base_url))?;
            match api.fetch_custom_model::<Vec<wiring::NamedRecord>>(&model, &params).await {
                Some(records) => {
                    let choices = wiring::map_to_choices(&records);
                    println!("{}", serde_json::to_string_pretty(&choices)?);
                }
                None => println!("⚠️  No data for {}", model),
            }
            Ok(())
        }
        Command::Config { action } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => AppConfig::config_path()?,
            };
            match action {
                ConfigAction::Show => println!("{}", serde_json::to_string_pretty(&config)?),
                ConfigAction::Path => println!("{}", path.display()),
                ConfigAction::Init => {
                    config.save_to(&path)?;
                    println!("✅ Wrote {}", path.display());
                }
                ConfigAction::Validate => {
                    let errors = config.validate();
                    if errors.is_empty() {
                        println!("✅ Configuration is valid");
                    } else {
                        for error in &errors {
                            println!("• {}", error);
                        }
                        anyhow::bail!("{} configuration problem(s)", errors.len());
                    }
                }
            }
            Ok(())
        }
    }
}

fn not_bound(kind: &'static str, key: &str) -> sheetwright::WiringError {
    sheetwright::WiringError::NotBound {
        kind,
        key: key.to_string(),
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read HTML from stdin")?;
        Ok(html)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn load_page(config: &AppConfig, input: &Path, site: &SiteArgs) -> Result<Page> {
    let root = dom::parse(&read_input(input)?);
    let api = ApiClient::new(site.base_url.as_deref().unwrap_or(&config.base_url))?;
    Ok(wiring::init(&root, &config.bindings, api)?)
}

async fn export_table(config: &AppConfig, source: &SourceTable, output: &OutputArgs) -> Result<()> {
    let sheet = output.sheet.as_deref().unwrap_or(&config.sheet_name);
    let book: Workbook = export::table_to_book(source, sheet);
    info!(rows = source.rows.len(), cells = source.cell_count(), "table converted");

    let dir = output.output.clone().unwrap_or_else(|| config.export_dir());
    let stem = output.filename.clone().unwrap_or_else(|| {
        format!("{}_{}", sheet, chrono::Local::now().format("%Y%m%d_%H%M%S"))
    });
    let formats = if output.format.is_empty() {
        config.export_formats()
    } else {
        output.format.clone()
    };

    for format in formats {
        let filename = format!("{}.{}", stem, format.extension());
        match format {
            ExportFormat::Excel => {
                export::download(book.clone(), &filename, &DirectorySaver::new(&dir)).await?;
            }
            ExportFormat::Csv | ExportFormat::Json => {
                let exporter = format.exporter(config)?;
                std::fs::create_dir_all(&dir)?;
                exporter.export(&book, &dir.join(&filename))?;
            }
        }
        println!("✅ {}", dir.join(&filename).display());
    }
    Ok(())
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Stayed => println!("✅ Submitted"),
        Outcome::Cancelled => println!("Cancelled"),
        Outcome::Navigated(_) | Outcome::Reloaded | Outcome::Alerted(_) => {}
    }
}
