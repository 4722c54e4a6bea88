// tests/pagination.rs
use pretty_assertions::assert_eq;

use sheetwright::dom::{self, Selector};
use sheetwright::pagination::{self, page_count, page_from_query, PageEntry};

fn labels(page_no: u64, count: u64) -> Vec<String> {
    pagination::pagination(page_no, count)
        .iter()
        .map(|e| e.label().into_owned())
        .collect()
}

#[test]
fn every_page_of_a_long_list_has_a_bounded_number_of_entries() {
    let count = 1234;
    let pages = page_count(count);
    assert_eq!(pages, 124);

    for page_no in 1..=pages {
        let entries = pagination::pagination(page_no, count);
        assert!(entries.len() <= 9, "page {} has {} entries", page_no, entries.len());
        assert!(matches!(entries.first(), Some(PageEntry::Previous { .. })));
        assert!(matches!(entries.last(), Some(PageEntry::Next { .. })));
        assert_eq!(entries.iter().filter(|e| e.is_active()).count(), 1);
        assert!(entries.contains(&PageEntry::Page { number: 1, active: page_no == 1 }));
        assert!(entries.contains(&PageEntry::Page { number: pages, active: page_no == pages }));
    }
}

#[test]
fn boundaries_between_the_three_layouts() {
    assert_eq!(labels(3, 80), vec!["Previous", "1", "2", "3", "4", "5", "...", "8", "Next"]);
    assert_eq!(labels(4, 80), vec!["Previous", "1", "...", "3", "4", "5", "...", "8", "Next"]);
    assert_eq!(labels(5, 80), vec!["Previous", "1", "...", "4", "5", "6", "...", "8", "Next"]);
    assert_eq!(labels(6, 80), vec!["Previous", "1", "...", "4", "5", "6", "7", "8", "Next"]);
}

#[test]
fn seven_pages_are_listed_without_ellipsis() {
    assert_eq!(
        labels(4, 61),
        vec!["Previous", "1", "2", "3", "4", "5", "6", "7", "Next"]
    );
}

#[test]
fn rendered_links_parse_back_to_their_targets() {
    let query = "?status=open&page_no=5";
    let html = pagination::render(&pagination::pagination(5, 100), query);
    let doc = dom::parse(&format!("<ul class=\"pagination\">{}</ul>", html));

    let links = doc.select(&Selector::parse("a.page-link").unwrap());
    let targets: Vec<u64> = links
        .iter()
        .filter_map(|a| a.attr("href"))
        .map(page_from_query)
        .collect();
    // ellipsis links keep the current page
    assert_eq!(targets, vec![4, 1, 5, 4, 5, 6, 5, 10, 6]);
    assert!(links
        .iter()
        .filter_map(|a| a.attr("href"))
        .all(|href| href.contains("status=open")));

    let active = doc.select(&Selector::parse("li.active").unwrap());
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].text_content(), "5");
}

#[test]
fn last_page_disables_next() {
    let entries = pagination::pagination(10, 100);
    assert_eq!(
        entries.last(),
        Some(&PageEntry::Next { target: 11, disabled: true })
    );
    let html = pagination::render(&entries, "");
    assert!(html.ends_with(
        r#"<li class="page-item disabled"><a class="page-link" href="?page_no=11">Next</a></li>"#
    ));
}
