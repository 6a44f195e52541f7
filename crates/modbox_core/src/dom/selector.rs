//! Selector parsing for the in-memory document.
//!
//! Supported grammar: compound selectors built from `*`, a tag name, `#id`
//! and `.class`, joined by the descendant combinator (whitespace).

use std::error::Error;
use std::fmt::{Display, Formatter};

/// One compound selector, e.g. `div.card#main`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Compound {
    /// Matches one element given its tag, id and class attribute.
    pub fn matches(&self, tag: &str, id: Option<&str>, class_attr: Option<&str>) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if id != Some(expected.as_str()) {
                return false;
            }
        }
        let classes: Vec<&str> = class_attr
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default();
        self.classes
            .iter()
            .all(|expected| classes.contains(&expected.as_str()))
    }
}

/// Descendant chain of compounds, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub parts: Vec<Compound>,
}

/// Selector parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    UnsupportedSyntax(String),
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "selector must not be empty"),
            Self::UnsupportedSyntax(value) => write!(f, "selector is unsupported: {value}"),
        }
    }
}

impl Error for SelectorError {}

/// Parses a selector string.
pub fn parse_selector(value: &str) -> Result<Selector, SelectorError> {
    let parts = value
        .split_whitespace()
        .map(parse_compound)
        .collect::<Result<Vec<_>, _>>()?;
    if parts.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Selector { parts })
}

fn parse_compound(token: &str) -> Result<Compound, SelectorError> {
    let unsupported = || SelectorError::UnsupportedSyntax(token.to_string());
    let mut compound = Compound::default();
    let mut rest = token;

    if let Some(stripped) = rest.strip_prefix('*') {
        rest = stripped;
    } else {
        let end = rest.find(['#', '.']).unwrap_or(rest.len());
        if end > 0 {
            let tag = &rest[..end];
            if !is_name(tag) {
                return Err(unsupported());
            }
            compound.tag = Some(tag.to_ascii_lowercase());
            rest = &rest[end..];
        }
    }

    while let Some(marker) = rest.chars().next() {
        if marker != '#' && marker != '.' {
            return Err(unsupported());
        }
        let body = &rest[marker.len_utf8()..];
        let end = body.find(['#', '.']).unwrap_or(body.len());
        let name = &body[..end];
        if !is_name(name) {
            return Err(unsupported());
        }
        match marker {
            '#' if compound.id.is_none() => compound.id = Some(name.to_string()),
            '.' => compound.classes.push(name.to_string()),
            _ => return Err(unsupported()),
        }
        rest = &body[end..];
    }

    Ok(compound)
}

fn is_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::{parse_selector, Compound, SelectorError};

    #[test]
    fn parses_compound_with_tag_id_and_classes() {
        let selector = parse_selector("div.card.wide#main").expect("valid selector");
        assert_eq!(
            selector.parts,
            vec![Compound {
                tag: Some("div".to_string()),
                id: Some("main".to_string()),
                classes: vec!["card".to_string(), "wide".to_string()],
            }]
        );
    }

    #[test]
    fn parses_descendant_chain() {
        let selector = parse_selector("#app  ul li.item").expect("valid selector");
        assert_eq!(selector.parts.len(), 3);
        assert_eq!(selector.parts[0].id.as_deref(), Some("app"));
        assert_eq!(selector.parts[2].classes, vec!["item".to_string()]);
    }

    #[test]
    fn rejects_empty_and_unsupported_selectors() {
        assert_eq!(parse_selector("   "), Err(SelectorError::Empty));
        assert!(matches!(
            parse_selector("ul > li"),
            Err(SelectorError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            parse_selector("a[href]"),
            Err(SelectorError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            parse_selector("#a#b"),
            Err(SelectorError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            parse_selector("*é"),
            Err(SelectorError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            parse_selector("li.é"),
            Err(SelectorError::UnsupportedSyntax(_))
        ));
    }

    #[test]
    fn compound_matching_checks_every_part() {
        let compound = parse_selector("li.item.done").expect("valid").parts[0].clone();
        assert!(compound.matches("LI", None, Some("done  item")));
        assert!(!compound.matches("li", None, Some("item")));
        assert!(!compound.matches("div", None, Some("item done")));
    }
}
