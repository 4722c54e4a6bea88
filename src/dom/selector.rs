//! Compound CSS selectors: `tag`, `#id`, `.class`, `[attr]`, `[attr=value]`
//! and comma-separated lists of those. Combinators are not supported.

use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use crate::error::SelectorError;

use super::Element;

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        for part in split_top_level(selector) {
            let part = part.trim();
            if part.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(parse_compound(part, selector)?);
        }
        Ok(Self {
            source: selector.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, el: &Element) -> bool {
        self.alternatives.iter().any(|c| c.matches(el))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Compound {
    fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|m| match (&m.value, el.attr(&m.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

fn split_top_level(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in selector.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_compound(part: &str, full: &str) -> Result<Compound, SelectorError> {
    let unexpected = |found: char, position: usize| SelectorError::Unexpected {
        selector: full.to_string(),
        found,
        position,
    };

    let mut compound = Compound::default();
    let mut chars = part.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '.' => {
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return Err(unexpected(ch, pos));
                }
                compound.classes.push(class);
            }
            '#' => {
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return Err(unexpected(ch, pos));
                }
                compound.id = Some(id);
            }
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(SelectorError::UnterminatedAttribute(full.to_string()));
                }
                let attr = match inner.split_once('=') {
                    Some((name, value)) => AttrMatch {
                        name: name.trim().to_ascii_lowercase(),
                        value: Some(
                            value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                        ),
                    },
                    None => AttrMatch {
                        name: inner.trim().to_ascii_lowercase(),
                        value: None,
                    },
                };
                if attr.name.is_empty() {
                    return Err(unexpected(ch, pos));
                }
                compound.attrs.push(attr);
            }
            '*' if pos == 0 => {}
            c if pos == 0 && is_ident_char(c) => {
                let mut tag = String::from(c);
                tag.push_str(&take_ident(&mut chars));
                compound.tag = Some(tag.to_ascii_lowercase());
            }
            other => return Err(unexpected(other, pos)),
        }
    }

    Ok(compound)
}
