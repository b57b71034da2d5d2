//! Document paths: where in the tag tree we are.
//!
//! A [`Path`] is a non-empty ordered list of section names, optionally
//! capped by an attribute name. Paths are immutable; `append`, `pop` and
//! `with_attribute` return new values, so the index and the binder's cursor
//! can share sections freely (they are `Arc<str>`, cloning is cheap).
//!
//! Invariants: sections never carry slashes and empty components are never
//! retained. Equality, ordering and hashing are structural over
//! `(sections, attribute)`.

use alloc::{string::String, sync::Arc, vec::Vec};

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    sections: Vec<Arc<str>>,
    attribute: Option<Arc<str>>,
}

impl Path {
    /// A path with a single root section.
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self {
            sections: Vec::new(),
            attribute: None,
        }
        .append(name)
    }

    /// Builds a path from section names; slashes and empty components are
    /// dropped.
    #[must_use]
    pub fn from_sections<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut path = Self {
            sections: Vec::new(),
            attribute: None,
        };
        for name in names {
            path = path.append(name);
        }
        path
    }

    /// Returns a new path with `name` appended. A name containing slashes
    /// appends one section per non-empty component.
    #[must_use]
    pub fn append(&self, name: &str) -> Self {
        let mut sections = self.sections.clone();
        sections.extend(
            name.split('/')
                .filter(|component| !component.is_empty())
                .map(Arc::from),
        );
        Self {
            sections,
            attribute: None,
        }
    }

    /// Returns the path with the last section removed, or `None` when this
    /// path holds only the root section.
    #[must_use]
    pub fn pop(&self) -> Option<Self> {
        if self.sections.len() <= 1 {
            return None;
        }
        Some(Self {
            sections: self.sections[..self.sections.len() - 1].to_vec(),
            attribute: None,
        })
    }

    /// Returns the same path capped by an attribute name.
    #[must_use]
    pub fn with_attribute(&self, name: &str) -> Self {
        Self {
            sections: self.sections.clone(),
            attribute: Some(Arc::from(name)),
        }
    }

    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn sections(&self) -> impl Iterator<Item = Section<'_>> {
        let last = self.sections.len().saturating_sub(1);
        self.sections
            .iter()
            .enumerate()
            .map(move |(idx, name)| Section {
                name,
                is_leaf: idx == last,
            })
    }

    #[must_use]
    pub fn last_section(&self) -> Section<'_> {
        Section {
            name: self
                .sections
                .last()
                .expect("a Path always holds at least one section"),
            is_leaf: true,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "/{section}")?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "@{attribute}")?;
        }
        Ok(())
    }
}

/// One position within a [`Path`]; `is_leaf` is true only for the last
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub is_leaf: bool,
}

/// A declared path expression on a schema field, before resolution against a
/// compile-time prefix. Absolute expressions start fresh from the document
/// root; relative ones extend the current prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    Absolute(Vec<String>),
    Relative(Vec<String>),
}

impl PathExpr {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|component| !component.is_empty())
            .map(String::from)
            .collect();
        if raw.starts_with('/') {
            Self::Absolute(segments)
        } else {
            Self::Relative(segments)
        }
    }

    #[must_use]
    pub fn raw(&self) -> String {
        let (lead, segments) = match self {
            Self::Absolute(segments) => ("/", segments),
            Self::Relative(segments) => ("", segments),
        };
        let mut out = String::from(lead);
        out.push_str(&segments.join("/"));
        out
    }
}
