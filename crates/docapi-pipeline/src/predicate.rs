//! # Directive Conventions
//!
//! The textual markers that turn document entries into directives, and the
//! predicate deciding whether a string value is an expression.
//!
//! | Marker                              | Meaning                                  |
//! |-------------------------------------|------------------------------------------|
//! | key `x-$name`                       | host directive, result may be spliced    |
//! | key `js-name`                       | expression directive, stored as `name`   |
//! | value `js: expr`                    | explicit expression                      |
//! | value `<expr>`                      | bracketed expression                     |
//! | `components/schemas/*/x-$schema`    | schema definition site                   |

use once_cell::sync::Lazy;
use regex::Regex;

/// Key prefix of host-filtered directives.
pub const HOST_DIRECTIVE_PREFIX: &str = "x-$";

/// Key prefix of expression directives.
pub const EXPRESSION_KEY_PREFIX: &str = "js-";

/// Value prefix marking an explicit expression.
pub const EXPLICIT_PREFIX: &str = "js: ";

/// Key path of schema definition sites; `*` is the definition name.
pub const DEFINITION_PATTERN: [&str; 4] = ["components", "schemas", "*", "x-$schema"];

static IDENTIFIER_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+(\.\w+)?$").expect("identifier path pattern is valid")
});

/// How a string value is to be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionForm<'a> {
    /// `js: expr`
    Explicit(&'a str),
    /// `<expr>`
    Bracketed(&'a str),
    /// Looks like an expression (`{..}`, `[..]`, `model.Pet`,
    /// `schema(..)`). Accepted only if it evaluates to something.
    Candidate(&'a str),
    /// Plain text.
    Plain,
}

impl<'a> ExpressionForm<'a> {
    pub fn detect(text: &'a str) -> Self {
        if let Some(code) = text.strip_prefix(EXPLICIT_PREFIX) {
            return Self::Explicit(code.trim());
        }
        if text.len() >= 2 && text.starts_with('<') && text.ends_with('>') {
            return Self::Bracketed(text[1..text.len() - 1].trim());
        }
        if text.len() < 2 {
            return Self::Plain;
        }
        let wrapped = (text.starts_with('{') && text.ends_with('}'))
            || (text.starts_with('[') && text.ends_with(']'));
        let call = text.starts_with("schema(") && text.ends_with(')');
        if wrapped || call || IDENTIFIER_PATH.is_match(text) {
            return Self::Candidate(text);
        }
        Self::Plain
    }

    /// Expression text, if any.
    pub fn code(&self) -> Option<&'a str> {
        match *self {
            Self::Explicit(code) | Self::Bracketed(code) | Self::Candidate(code) => Some(code),
            Self::Plain => None,
        }
    }

    /// True when the author marked the value as an expression.
    pub fn is_marked(&self) -> bool {
        matches!(self, Self::Explicit(_) | Self::Bracketed(_))
    }
}

/// The directive name of a `js-` key.
pub fn expression_key(key: &str) -> Option<&str> {
    key.strip_prefix(EXPRESSION_KEY_PREFIX)
}

pub fn is_host_directive(key: &str) -> bool {
    key.starts_with(HOST_DIRECTIVE_PREFIX)
}
