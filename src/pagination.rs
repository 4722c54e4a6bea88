//! Pagination controls for list pages.
//!
//! [`pagination`] decides which entries appear; [`render`] turns them into the
//! `<li class="page-item">` markup the list templates expect. Links keep every
//! query parameter of the current page and only rewrite `page_no`.

use std::borrow::Cow;

use serde::Serialize;
use url::form_urlencoded;

/// Items per page.
pub const PAGE_SIZE: u64 = 10;

/// Query parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page_no";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEntry {
    Previous { target: u64, disabled: bool },
    Next { target: u64, disabled: bool },
    Page { number: u64, active: bool },
    Ellipsis,
}

impl PageEntry {
    fn page(number: u64, current: u64) -> Self {
        Self::Page {
            number,
            active: number == current,
        }
    }

    pub fn label(&self) -> Cow<'static, str> {
        match self {
            Self::Previous { .. } => "Previous".into(),
            Self::Next { .. } => "Next".into(),
            Self::Page { number, .. } => number.to_string().into(),
            Self::Ellipsis => "...".into(),
        }
    }

    /// Page the link points at; `None` keeps the current query as is.
    pub fn target(&self) -> Option<u64> {
        match self {
            Self::Previous { target, .. } | Self::Next { target, .. } => Some(*target),
            Self::Page { number, .. } => Some(*number),
            Self::Ellipsis => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        match self {
            Self::Previous { disabled, .. } | Self::Next { disabled, .. } => *disabled,
            Self::Page { .. } => false,
            Self::Ellipsis => true,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Page { active: true, .. })
    }

    /// `href` of this entry's link, relative to the current page.
    pub fn href(&self, current_query: &str) -> String {
        format!("?{}", with_page(current_query, self.target()))
    }
}

pub fn page_count(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Entries for page `page_no` of a list holding `count` items. Empty when
/// there is nothing to page through.
pub fn pagination(page_no: u64, count: u64) -> Vec<PageEntry> {
    let pages = page_count(count);
    if pages == 0 {
        return Vec::new();
    }

    let mut entries = vec![
        PageEntry::Previous {
            target: page_no.saturating_sub(1),
            disabled: page_no == 1,
        },
        PageEntry::page(1, page_no),
    ];

    if pages > 1 && pages < 8 {
        entries.extend((2..=pages).map(|n| PageEntry::page(n, page_no)));
    } else if pages > 7 {
        if page_no <= 3 {
            entries.extend((2..=5).map(|n| PageEntry::page(n, page_no)));
            entries.push(PageEntry::Ellipsis);
            entries.push(PageEntry::page(pages, page_no));
        } else if page_no > pages - 3 {
            // The last five pages are inserted high to low at one fixed slot,
            // so they display in ascending order.
            entries.push(PageEntry::Ellipsis);
            let mut tail = Vec::with_capacity(5);
            for n in (pages - 4..=pages).rev() {
                tail.insert(0, PageEntry::page(n, page_no));
            }
            entries.extend(tail);
        } else {
            entries.extend([
                PageEntry::Ellipsis,
                PageEntry::page(page_no - 1, page_no),
                PageEntry::Page {
                    number: page_no,
                    active: true,
                },
                PageEntry::page(page_no + 1, page_no),
                PageEntry::Ellipsis,
                PageEntry::page(pages, page_no),
            ]);
        }
    }

    entries.push(PageEntry::Next {
        target: page_no + 1,
        disabled: page_no == pages,
    });
    entries
}

/// Render entries as list items. An empty slice renders as an empty string,
/// which clears the mount.
pub fn render(entries: &[PageEntry], current_query: &str) -> String {
    let mut html = String::new();
    for entry in entries {
        html.push_str("<li class=\"page-item");
        if entry.is_disabled() {
            html.push_str(" disabled");
        }
        if entry.is_active() {
            html.push_str(" active");
        }
        html.push_str("\"><a class=\"page-link\" href=\"");
        html.push_str(&escape_attr(&entry.href(current_query)));
        html.push_str("\">");
        html.push_str(&entry.label());
        html.push_str("</a></li>");
    }
    html
}

/// `current_query` (with or without a leading `?`) with `page_no` set to
/// `page`. The first existing occurrence is replaced in place and later ones
/// dropped; otherwise the parameter is appended. `None` re-serializes as is.
pub fn with_page(current_query: &str, page: Option<u64>) -> String {
    let query = current_query.strip_prefix('?').unwrap_or(current_query);
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if let Some(page) = page {
        let value = page.to_string();
        match pairs.iter().position(|(k, _)| k == PAGE_PARAM) {
            Some(first) => {
                pairs[first].1 = value;
                let mut idx = 0;
                pairs.retain(|(k, _)| {
                    let keep = idx <= first || k != PAGE_PARAM;
                    idx += 1;
                    keep
                });
            }
            None => pairs.push((PAGE_PARAM.to_string(), value)),
        }
    }

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Current page from a query string; missing or invalid values mean page 1.
pub fn page_from_query(current_query: &str) -> u64 {
    let query = current_query.strip_prefix('?').unwrap_or(current_query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == PAGE_PARAM)
        .and_then(|(_, v)| v.trim().parse::<u64>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// Running number of the `counter`-th (1-based) row on page `page_no`.
pub fn serial_no(counter: u64, page_no: u64) -> u64 {
    page_no.saturating_sub(1) * PAGE_SIZE + counter
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
