//! Error types for the scanner and the binder.
//!
//! Lexical and structural problems are fatal and single-shot: the scanner
//! reports a [`ParseError`] carrying the position of the offending input and
//! stops. Binding problems split into configuration errors, raised while the
//! index is compiled (before any input is read), and data-dependent errors
//! raised while events stream through the binder.

use alloc::string::String;

use thiserror::Error;

/// A fatal lexical or structural error, positioned in the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source} at {line}:{column}")]
pub struct ParseError {
    pub(crate) source: SyntaxError,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// The underlying syntax error, without position.
    #[must_use]
    pub fn syntax(&self) -> &SyntaxError {
        &self.source
    }
}

/// What exactly went wrong with the input text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expected '<' at start of tag, found {0:?}")]
    MissingTagOpen(String),
    #[error("expected '</' at start of closing tag, found {0:?}")]
    MissingEndTagOpen(String),
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEndOfInput(&'static str),
    #[error("unterminated value for attribute {0:?}")]
    UnterminatedAttributeValue(String),
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated CDATA section")]
    UnterminatedCdata,
    #[error("unterminated document declaration")]
    UnterminatedDeclaration,
    #[error("malformed document declaration, expected '<?xml' but found {0:?}")]
    MalformedDeclaration(String),
    #[error("error reading source: {0}")]
    Source(String),
}

/// Failure to pull the next line from the underlying character source.
///
/// Always fatal: the scanner does not resynchronize after a read failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SourceError(pub String);

/// A configuration error detected while compiling a schema into an index.
///
/// These are raised before any parsing begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("collection field `{field}` needs an item tag name for its {element_type} elements")]
    MissingItemTag {
        field: &'static str,
        element_type: &'static str,
    },
    #[error("field `{field}` declares relative path {path:?} with no absolute ancestor")]
    RelativePathWithoutAnchor {
        field: &'static str,
        path: String,
    },
    #[error("map keys must be String, got {key_type}")]
    NonStringMapKey { key_type: &'static str },
}

/// An error raised while binding a document to a target value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown value {value:?} for enum {enum_type}")]
    UnknownEnumValue {
        value: String,
        enum_type: &'static str,
    },
    #[error("cannot convert {text:?} into {target}")]
    InvalidScalar {
        text: String,
        target: &'static str,
    },
    #[error("document contained no root element")]
    NoRootElement,
}
