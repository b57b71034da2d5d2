//! Lexical tokens produced by the scanner.
//!
//! [`Token`] is a closed union, exhaustively matched by consumers; payloads
//! are owned and immutable, produced once and consumed once.

use alloc::string::{String, ToString};

use core::fmt;

/// A possibly prefixed tag name, split on the first `:`.
///
/// Only the prefix is captured; no namespace resolution happens anywhere in
/// this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName {
    pub local: String,
    pub prefix: Option<String>,
}

impl TagName {
    #[must_use]
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            prefix: None,
        }
    }

    /// Splits `ns:name` into prefix and local part.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                local: local.to_string(),
                prefix: Some(prefix.to_string()),
            },
            None => Self {
                local: raw.to_string(),
                prefix: None,
            },
        }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An ordered attribute list.
///
/// Insertion order is preserved; it affects only serialization output, never
/// deserialization. Values are optional because XML attributes may appear
/// without `=value`. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes {
    entries: alloc::vec::Vec<(String, Option<String>)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.entries.push((name.into(), value));
    }

    /// The value of the first attribute with this name, if any. The outer
    /// `Option` is presence, the inner one is whether a value was written.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Option<&'a str>)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (&'a str, Option<&'a str>)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.push(name, value.map(ToString::to_string));
        }
        attrs
    }
}

/// One lexical unit of the input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: TagName,
        attributes: Attributes,
    },
    SelfClosingTag {
        name: TagName,
        attributes: Attributes,
    },
    EndTag {
        name: TagName,
    },
    CharacterData(String),
    /// Comment opener, carrying the comment body verbatim.
    StartComment(String),
    /// Comment close marker; always follows a [`Token::StartComment`].
    CloseComment,
    /// `<?xml ...?>` marker; the declaration payload is not retained.
    DocTypeDeclaration,
}

impl Token {
    /// Returns `true` for tokens the SAX adapter drops.
    #[must_use]
    pub fn is_markup_only(&self) -> bool {
        matches!(
            self,
            Self::StartComment(_) | Self::CloseComment | Self::DocTypeDeclaration
        )
    }
}
