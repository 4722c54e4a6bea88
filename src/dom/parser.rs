//! Tolerant HTML parser.
//! Good enough for server-rendered templates: it handles void elements, raw-text
//! elements, comments, unquoted attributes, entity references and the implied end
//! tags tables and lists depend on. It never fails; malformed markup degrades to
//! text or is dropped.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{Element, Node, DOCUMENT};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parse `html` into a tree rooted at a synthetic [`DOCUMENT`] element.
pub fn parse(html: &str) -> Element {
    let mut builder = TreeBuilder::new();
    let bytes = html.as_bytes();
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];

        if rest.starts_with("<!--") {
            pos = match rest[4..].find("-->") {
                Some(end) => pos + 4 + end + 3,
                None => html.len(),
            };
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map(|end| pos + end + 1).unwrap_or(html.len());
            continue;
        }

        if rest.starts_with("</") && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
            let name_end = rest[2..]
                .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .map(|i| i + 2)
                .unwrap_or(rest.len());
            builder.close(&rest[2..name_end].to_ascii_lowercase());
            pos = rest.find('>').map(|end| pos + end + 1).unwrap_or(html.len());
            continue;
        }

        if rest.starts_with('<') && bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
            if let Some(tag) = parse_start_tag(rest) {
                pos += tag.len;
                let void = VOID_ELEMENTS.contains(&tag.name.as_str());
                let raw = RAW_TEXT_ELEMENTS.contains(&tag.name.as_str());
                let self_closing = tag.self_closing;
                let name = tag.name.clone();
                builder.open(tag.into_element(), void || self_closing);

                if raw && !self_closing {
                    let (content, next) = raw_text(html, pos, &name);
                    if name == "textarea" || name == "title" {
                        builder.text(decode_entities(content));
                    } else {
                        builder.text(content.to_string());
                    }
                    builder.close(&name);
                    pos = next;
                }
                continue;
            }
        }

        if rest.starts_with('<') {
            builder.text("<".to_string());
            pos += 1;
            continue;
        }

        let end = rest.find('<').map(|i| pos + i).unwrap_or(html.len());
        builder.text(decode_entities(&html[pos..end]));
        pos = end;
    }

    builder.finish()
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    /// Bytes consumed, including the closing `>`.
    len: usize,
}

impl StartTag {
    fn into_element(self) -> Element {
        Element {
            tag: self.name,
            attrs: self.attrs,
            children: Vec::new(),
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// `s` starts with `<` followed by a letter. Returns `None` for an unterminated tag.
fn parse_start_tag(s: &str) -> Option<StartTag> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 1;
    while i < len && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    let name = s[1..i].to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i >= len {
            return None;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
            }
            _ => {
                self_closing = false;
                let start = i;
                while i < len && !is_space(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/') {
                    i += 1;
                }
                let attr_name = s[start..i].to_ascii_lowercase();
                while i < len && is_space(bytes[i]) {
                    i += 1;
                }

                let mut value = String::new();
                if i < len && bytes[i] == b'=' {
                    i += 1;
                    while i < len && is_space(bytes[i]) {
                        i += 1;
                    }
                    if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                        let quote = bytes[i];
                        i += 1;
                        let value_start = i;
                        while i < len && bytes[i] != quote {
                            i += 1;
                        }
                        if i >= len {
                            return None;
                        }
                        value = decode_entities(&s[value_start..i]);
                        i += 1;
                    } else {
                        let value_start = i;
                        while i < len && !is_space(bytes[i]) && bytes[i] != b'>' {
                            i += 1;
                        }
                        value = decode_entities(&s[value_start..i]);
                    }
                }

                if !attr_name.is_empty() && !attrs.iter().any(|(n, _)| *n == attr_name) {
                    attrs.push((attr_name, value));
                }
            }
        }
    }

    Some(StartTag {
        name,
        attrs,
        self_closing,
        len: i,
    })
}

/// Content of a raw-text element starting at `from`, and the position after its end tag.
fn raw_text<'a>(html: &'a str, from: usize, name: &str) -> (&'a str, usize) {
    let close = format!("</{}", name);
    let haystack = html[from..].to_ascii_lowercase();
    match haystack.find(&close) {
        Some(rel) => {
            let content_end = from + rel;
            let next = html[content_end..]
                .find('>')
                .map(|i| content_end + i + 1)
                .unwrap_or(html.len());
            (&html[from..content_end], next)
        }
        None => (&html[from..], html.len()),
    }
}

fn entity_regex() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
            .expect("entity pattern is valid")
    })
}

/// Decode character references. Unknown names are left untouched.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    entity_regex()
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let hex = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X"));
            let decoded = if let Some(hex) = hex {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(ch) => ch.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "euro" => '\u{20ac}',
        _ => return None,
    })
}

struct TreeBuilder {
    /// `stack[0]` is the document root.
    stack: Vec<Element>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Element::new(DOCUMENT)],
        }
    }

    fn open(&mut self, el: Element, void: bool) {
        self.imply_end(&el.tag);
        if void {
            self.append(Node::Element(el));
        } else {
            self.stack.push(el);
        }
    }

    fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            if let Some(Node::Text(prev)) = top.children.last_mut() {
                prev.push_str(&text);
                return;
            }
            top.children.push(Node::Text(text));
        }
    }

    fn close(&mut self, tag: &str) {
        if let Some(idx) = self.stack.iter().rposition(|el| el.tag == tag) {
            if idx > 0 {
                self.pop_to(idx);
            }
        }
    }

    /// Pop and attach every element at or above `idx`.
    fn pop_to(&mut self, idx: usize) {
        while self.stack.len() > idx.max(1) {
            if let Some(el) = self.stack.pop() {
                self.append(Node::Element(el));
            }
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children.push(node);
        }
    }

    // Opening some elements closes an open sibling of the same family, as long
    // as no scoping ancestor sits in between.
    fn imply_end(&mut self, tag: &str) {
        let (targets, boundaries): (&[&str], &[&str]) = match tag {
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            "tr" => (&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "thead" | "tbody" | "tfoot" => (&["thead", "tbody", "tfoot"], &["table"]),
            "li" => (&["li"], &["ul", "ol"]),
            "option" => (&["option"], &["select", "datalist", "optgroup"]),
            "optgroup" => (&["optgroup"], &["select"]),
            "p" => (&["p"], &["div", "td", "th", "li", "table", "form", "body"]),
            _ => return,
        };
        for idx in (1..self.stack.len()).rev() {
            let open = self.stack[idx].tag.as_str();
            if targets.contains(&open) {
                self.pop_to(idx);
                return;
            }
            if boundaries.contains(&open) {
                return;
            }
        }
    }

    fn finish(mut self) -> Element {
        self.pop_to(1);
        self.stack.pop().unwrap_or_else(|| Element::new(DOCUMENT))
    }
}
