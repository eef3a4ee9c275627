//! A small selector language over [`Control`] tag names and attributes.
//!
//! Supported: tag names, `*`, `[attr]`, `[attr=value]`, `[attr^=prefix]` and
//! comma separated alternatives. Values may be quoted with `'` or `"`.
//!
//! ```
//! use formbind::{Selector, VirtualControl};
//!
//! let selector = Selector::parse("input[type=checkbox][bind], select[bind]").unwrap();
//! let checkbox = VirtualControl::new("input")
//!     .with_attribute("type", "checkbox")
//!     .with_attribute("bind", "/agree");
//! assert!(selector.matches(&checkbox));
//! assert!(!selector.matches(&VirtualControl::new("input")));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::control::Control;
use crate::error::{FormError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Present(String),
    Equals(String, String),
    Prefix(String, String),
}

impl Condition {
    fn matches(&self, control: &dyn Control) -> bool {
        match self {
            Self::Present(name) => control.has_attribute(name),
            Self::Equals(name, value) => control.attribute(name).as_deref() == Some(value.as_str()),
            Self::Prefix(name, prefix) => control
                .attribute(name)
                .is_some_and(|actual| actual.starts_with(prefix.as_str())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(name) => write!(f, "[{}]", name),
            Self::Equals(name, value) => write!(f, "[{}=\"{}\"]", name, value),
            Self::Prefix(name, value) => write!(f, "[{}^=\"{}\"]", name, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    /// `None` matches any tag
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches(&self, control: &dyn Control) -> bool {
        if let Some(tag) = &self.tag {
            if !control.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.conditions.iter().all(|c| c.matches(control))
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}", tag)?,
            None if self.conditions.is_empty() => write!(f, "*")?,
            None => {}
        }
        for condition in &self.conditions {
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}

/// A predicate over a control, matching when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Matches every control.
    pub fn any() -> Self {
        Self {
            alternatives: vec![Compound::default()],
        }
    }

    /// Matches controls with the given tag name.
    pub fn tag(tag: &str) -> Self {
        Self {
            alternatives: vec![Compound {
                tag: Some(tag.to_ascii_lowercase()),
                conditions: Vec::new(),
            }],
        }
    }

    /// Require the attribute on the last alternative.
    pub fn has(self, attribute: &str) -> Self {
        self.with(Condition::Present(attribute.to_string()))
    }

    pub fn equals(self, attribute: &str, value: &str) -> Self {
        self.with(Condition::Equals(attribute.to_string(), value.to_string()))
    }

    pub fn prefix(self, attribute: &str, prefix: &str) -> Self {
        self.with(Condition::Prefix(attribute.to_string(), prefix.to_string()))
    }

    /// Add the alternatives of `other`.
    pub fn or(mut self, other: Selector) -> Self {
        self.alternatives.extend(other.alternatives);
        self
    }

    pub fn matches(&self, control: &dyn Control) -> bool {
        self.alternatives.iter().any(|c| c.matches(control))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut alternatives = Vec::new();
        for part in text.split(',') {
            alternatives.push(parse_compound(text, part.trim())?);
        }
        Ok(Self { alternatives })
    }

    fn with(mut self, condition: Condition) -> Self {
        if let Some(last) = self.alternatives.last_mut() {
            last.conditions.push(condition);
        }
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, compound) in self.alternatives.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", compound)?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_compound(selector: &str, text: &str) -> Result<Compound> {
    if text.is_empty() {
        return Err(FormError::selector(selector, "empty alternative"));
    }

    let tag_end = text.find('[').unwrap_or(text.len());
    let tag = &text[..tag_end];
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*') {
        return Err(FormError::selector(selector, format!("invalid tag '{}'", tag)));
    }
    let tag = match tag {
        "" | "*" => None,
        name if name.contains('*') => {
            return Err(FormError::selector(selector, format!("invalid tag '{}'", name)));
        }
        name => Some(name.to_ascii_lowercase()),
    };

    let mut conditions = Vec::new();
    let mut rest = &text[tag_end..];
    while !rest.is_empty() {
        let body_start = rest
            .strip_prefix('[')
            .ok_or_else(|| FormError::selector(selector, format!("unexpected '{}'", rest)))?;
        let close = body_start
            .find(']')
            .ok_or_else(|| FormError::selector(selector, "unterminated attribute"))?;
        conditions.push(parse_condition(selector, &body_start[..close])?);
        rest = &body_start[close + 1..];
    }

    Ok(Compound { tag, conditions })
}

fn parse_condition(selector: &str, body: &str) -> Result<Condition> {
    let (name, value, prefix) = if let Some((name, value)) = body.split_once("^=") {
        (name, Some(value), true)
    } else if let Some((name, value)) = body.split_once('=') {
        (name, Some(value), false)
    } else {
        (body, None, false)
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(FormError::selector(selector, "missing attribute name"));
    }
    if name.contains(char::is_whitespace) {
        return Err(FormError::selector(
            selector,
            format!("invalid attribute name '{}'", name),
        ));
    }

    let Some(value) = value else {
        return Ok(Condition::Present(name.to_string()));
    };
    let value = unquote(value.trim());
    Ok(if prefix {
        Condition::Prefix(name.to_string(), value.to_string())
    } else {
        Condition::Equals(name.to_string(), value.to_string())
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
