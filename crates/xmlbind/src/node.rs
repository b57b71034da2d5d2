//! The write path: an owned element tree and its printer.
//!
//! The writer is not streaming: a [`Node`] tree is fully assembled first,
//! then printed in one recursive pass. Two-space indentation, self-closing
//! tags for childless nodes, attributes in declaration order.

use alloc::{string::String, vec::Vec};

use core::fmt::{self, Write as _};

use crate::{token::Attributes, value::Value};

/// An owned XML element: name, ordered attributes, children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    attributes: Attributes,
    children: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Element(Node),
    Text(String),
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute; declaration order is preserved in the output.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(name, Some(value.into()));
        self
    }

    /// Adds a value-less attribute.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name, None);
        self
    }

    #[must_use]
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(Content::Element(node));
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Content::Text(text.into()));
        self
    }

    /// Renders the tree with 2-space indentation and a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0)
            .expect("writing into a String cannot fail");
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in self.attributes.iter() {
            match value {
                Some(value) => write!(out, " {name}=\"{}\"", escape(value))?,
                None => write!(out, " {name}")?,
            }
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return Ok(());
        }

        // A lone text child renders inline; anything else goes block-style.
        if let [Content::Text(text)] = self.children.as_slice() {
            writeln!(out, ">{}</{}>", escape(text), self.name)?;
            return Ok(());
        }

        out.push_str(">\n");
        for child in &self.children {
            match child {
                Content::Element(node) => node.write_into(out, depth + 1)?,
                Content::Text(text) => {
                    for _ in 0..=depth {
                        out.push_str("  ");
                    }
                    writeln!(out, "{}", escape(text))?;
                }
            }
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        writeln!(out, "</{}>", self.name)?;
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Conversion of a bound value back into an element tree.
pub trait ToXml {
    fn to_xml(&self) -> Node;
}

/// Renders `value` as an XML string.
#[must_use]
pub fn write<T: ToXml>(value: &T) -> String {
    value.to_xml().render()
}

impl Value {
    /// Wraps a dynamic subtree into an element tree rooted at `name`.
    #[must_use]
    pub fn to_node(&self, name: &str) -> Node {
        let mut node = Node::new(name);
        match self {
            Value::Text(text) => {
                if !text.is_empty() {
                    node = node.text(text.clone());
                }
            }
            Value::Node(children) => {
                for (child_name, child) in children {
                    node = node.child(child.to_node(child_name));
                }
            }
        }
        node
    }
}

impl ToXml for Node {
    fn to_xml(&self) -> Node {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn childless_nodes_self_close() {
        assert_eq!(Node::new("a").render(), "<a/>\n");
        assert_eq!(
            Node::new("a").attr("x", "1").flag("on").render(),
            "<a x=\"1\" on/>\n"
        );
    }

    #[test]
    fn text_only_renders_inline() {
        let node = Node::new("Name").attr("age", "18").text("John");
        assert_eq!(node.render(), "<Name age=\"18\">John</Name>\n");
    }

    #[test]
    fn nested_elements_indent_two_spaces() {
        let node = Node::new("Person")
            .child(Node::new("Name").text("John"))
            .child(Node::new("City"));
        assert_eq!(
            node.render(),
            "<Person>\n  <Name>John</Name>\n  <City/>\n</Person>\n"
        );
    }

    #[test]
    fn attributes_render_in_declaration_order() {
        let node = Node::new("a").attr("z", "1").attr("a", "2");
        assert_eq!(node.render(), "<a z=\"1\" a=\"2\"/>\n");
    }

    #[test]
    fn text_is_escaped() {
        let node = Node::new("a").text("1 < 2 & \"3\"");
        assert_eq!(node.render(), "<a>1 &lt; 2 &amp; &quot;3&quot;</a>\n");
    }

    #[test]
    fn dynamic_value_round_trips_into_a_tree() {
        let value = Value::Node(vec![
            ("Name".into(), Value::Text("John".into())),
            (
                "Address".into(),
                Value::Node(vec![("City".into(), Value::Text("Oslo".into()))]),
            ),
        ]);
        let rendered = value.to_node("Person").render();
        assert_eq!(
            rendered,
            "<Person>\n  <Name>John</Name>\n  <Address>\n    <City>Oslo</City>\n  </Address>\n</Person>\n"
        );
    }
}
