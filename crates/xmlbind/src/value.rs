//! The dynamic, schema-less value tree.
//!
//! Used by the map-as-subtree delegate: a subtree bound without a schema
//! becomes an ordered name→value mapping, recursively. Tag order is
//! document order and duplicate names are kept, so the node form is an
//! ordered multimap rather than a keyed map.

use alloc::{string::String, vec::Vec};

/// Ordered children of a dynamic node.
pub type Children = Vec<(String, Value)>;

/// A dynamically bound XML subtree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Character data of a tag with no child tags.
    Text(String),
    /// Child tags, in document order.
    Node(Children),
}

impl Default for Value {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl Value {
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// The text payload, if this is a leaf.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node(_) => None,
        }
    }

    /// The children, if this is a node.
    #[must_use]
    pub fn children(&self) -> Option<&Children> {
        match self {
            Self::Text(_) => None,
            Self::Node(children) => Some(children),
        }
    }

    /// First child with the given tag name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.children()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All children with the given tag name, in document order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> {
        self.children()
            .into_iter()
            .flatten()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};

    use super::*;

    #[test]
    fn lookup_preserves_document_order() {
        let value = Value::Node(vec![
            ("a".into(), Value::Text("1".into())),
            ("b".into(), Value::Text("2".into())),
            ("a".into(), Value::Text("3".into())),
        ]);
        assert_eq!(value.get("a"), Some(&Value::Text("1".into())));
        let all: Vec<_> = value.get_all("a").collect();
        assert_eq!(
            all,
            [&Value::Text("1".into()), &Value::Text("3".into())]
        );
        assert_eq!(value.get("missing"), None);
    }
}
