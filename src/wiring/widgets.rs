use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dom::Element;

pub const DEFAULT_PLACEHOLDER: &str = "Select";
pub const DEFAULT_DATE_FORMAT: &str = "Y-m-d";

/// Options handed to the searchable select widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoicesConfig {
    pub search_enabled: bool,
    pub item_select_text: String,
    pub placeholder: bool,
    pub placeholder_value: String,
    pub should_sort: bool,
}

impl Default for ChoicesConfig {
    fn default() -> Self {
        Self {
            search_enabled: true,
            item_select_text: String::new(),
            placeholder: true,
            placeholder_value: DEFAULT_PLACEHOLDER.to_string(),
            should_sort: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceItem {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub selected: bool,
}

/// Record shape returned by the custom data endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedRecord {
    pub id: serde_json::Value,
    pub name: String,
}

pub fn map_to_choices(records: &[NamedRecord]) -> Vec<ChoiceItem> {
    records
        .iter()
        .map(|record| ChoiceItem {
            value: match &record.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            label: record.name.clone(),
            selected: false,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoicesWidget {
    pub id: Option<String>,
    pub name: Option<String>,
    pub config: ChoicesConfig,
    pub choices: Vec<ChoiceItem>,
}

impl ChoicesWidget {
    pub fn from_element(select: &Element) -> Self {
        let mut config = ChoicesConfig::default();
        if let Some(placeholder) = select.data("placeholder").filter(|p| !p.is_empty()) {
            config.placeholder_value = placeholder.to_string();
        }

        // Options with an empty value are placeholders, not choices.
        let choices = select
            .descendants()
            .filter(|el| el.tag == "option")
            .filter_map(|option| {
                let label = option.text_content().trim().to_string();
                let value = option
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| label.clone());
                (!value.is_empty()).then(|| ChoiceItem {
                    value,
                    label,
                    selected: option.has_attr("selected"),
                })
            })
            .collect();

        Self {
            id: select.id().map(str::to_string),
            name: select.attr("name").map(str::to_string),
            config,
            choices,
        }
    }

    pub fn answers_to(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
    }

    /// Case-insensitive match on labels, source order kept.
    pub fn search(&self, query: &str) -> Vec<&ChoiceItem> {
        let needle = query.trim().to_lowercase();
        if !self.config.search_enabled || needle.is_empty() {
            return self.choices.iter().collect();
        }
        self.choices
            .iter()
            .filter(|c| c.label.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn set_choices(&mut self, choices: Vec<ChoiceItem>) {
        self.choices = choices;
    }

    pub fn select(&mut self, value: &str) -> bool {
        let found = self.choices.iter().any(|c| c.value == value);
        if found {
            for choice in &mut self.choices {
                choice.selected = choice.value == value;
            }
        }
        found
    }

    pub fn selected(&self) -> Option<&ChoiceItem> {
        self.choices.iter().find(|c| c.selected)
    }
}

/// Date input limited to dates up to `max_date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatePicker {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date_format: String,
    pub max_date: NaiveDate,
}

impl DatePicker {
    pub fn from_element(input: &Element, date_format: &str, today: NaiveDate) -> Self {
        Self {
            id: input.id().map(str::to_string),
            name: input.attr("name").map(str::to_string),
            date_format: date_format.to_string(),
            max_date: today,
        }
    }

    pub fn answers_to(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
    }

    pub fn chrono_format(&self) -> String {
        picker_to_chrono(&self.date_format)
    }

    /// `None` when the input doesn't match the format or lies after `max_date`.
    pub fn parse(&self, input: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(input.trim(), &self.chrono_format())
            .ok()
            .filter(|date| *date <= self.max_date)
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.chrono_format()).to_string()
    }
}

/// Translate picker tokens (`Y-m-d`) to strftime (`%Y-%m-%d`). A backslash
/// escapes the next character.
fn picker_to_chrono(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        let token = match ch {
            'Y' => "%Y",
            'y' => "%y",
            'm' => "%m",
            'n' => "%-m",
            'd' => "%d",
            'j' => "%-d",
            'M' => "%b",
            'F' => "%B",
            'D' => "%a",
            'l' => "%A",
            'H' => "%H",
            'i' => "%M",
            'S' => "%S",
            '%' => "%%",
            '\\' => {
                if let Some(next) = chars.next() {
                    if next == '%' {
                        out.push_str("%%");
                    } else {
                        out.push(next);
                    }
                }
                continue;
            }
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(token);
    }
    out
}
