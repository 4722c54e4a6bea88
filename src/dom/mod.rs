//! Minimal document model for server-rendered pages.
//!
//! Pages are parsed once into an owned element tree. Elements expose the same
//! queries the page scripts rely on: attributes, `data-*` values, classes,
//! text content and selector matching.

pub mod parser;
pub mod selector;

pub use parser::parse;
pub use selector::Selector;

/// Tag name of the synthetic root returned by [`parse`].
pub const DOCUMENT: &str = "#document";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order; names are lowercase and unique.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Reads a `data-*` attribute by its dataset key, so `errorMessage`
    /// resolves `data-error-message`.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.attr(&dataset_attr_name(key))
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Pre-order iterator over every descendant element, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    pub fn select(&self, selector: &Selector) -> Vec<&Element> {
        self.descendants().filter(|el| selector.matches(el)).collect()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        self.descendants().find(|el| selector.matches(el))
    }

    /// First descendant (pre-order) matching `selector`, mutably.
    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if let Node::Element(el) = child {
                if selector.matches(el) {
                    return Some(el);
                }
                if let Some(found) = el.find_mut(selector) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = children;
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(el.child_elements());
        self.stack[start..].reverse();
        Some(el)
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => collect_text(inner, out),
        }
    }
}

/// `errorMessage` -> `data-error-message`
fn dataset_attr_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}
