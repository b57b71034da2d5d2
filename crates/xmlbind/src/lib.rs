//! A streaming XML tokenizer and path-indexed data binder.
//!
//! Two layers, one forward pass, no document tree:
//!
//! - A character-level scanner turns XML text into a lazy [`Token`] stream,
//!   and a thin SAX adapter turns tokens into four callbacks
//!   ([`SaxHandler`]).
//! - A path-indexed binder compiles a registered [`Schema`] into an
//!   [`Index`] (path → writers) and applies it against live events,
//!   materializing the target object graph incrementally — nested types,
//!   collections, maps, enums, attributes, and immutable records included.
//!
//! ```rust
//! use xmlbind::{Binder, BinderOptions, Field, FromXml, Schema, StrSource};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl FromXml for Person {
//!     fn schema() -> Schema {
//!         Schema::build::<Person>("Person")
//!             .field(Field::text("name", |p: &mut Person, v: String| p.name = v).at("Name"))
//!             .field(Field::text("age", |p: &mut Person, v: u32| p.age = v).at("Name").attr("age"))
//!             .finish()
//!     }
//! }
//!
//! let binder = Binder::new(BinderOptions::default());
//! let person: Person = binder
//!     .read(StrSource::new(r#"<Person><Name age="18">John</Name></Person>"#))
//!     .unwrap();
//! assert_eq!(person, Person { name: "John".into(), age: 18 });
//! ```

#![no_std]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

mod binder;
mod convert;
mod error;
mod index;
mod node;
mod path;
mod reader;
mod sax;
mod scanner;
mod schema;
mod token;
mod value;

#[cfg(test)]
mod tests;

pub use binder::{Binder, BinderOptions, MapShape};
pub use convert::{FromXmlText, XmlEnum};
pub use error::{BindError, ConfigError, ParseError, SourceError, SyntaxError};
pub use index::Index;
pub use node::{Node, ToXml, write};
pub use path::{Path, PathExpr, Section};
pub use reader::{LineSource, Reader, StrSource};
#[cfg(feature = "std")]
pub use reader::IoSource;
pub use sax::{SaxHandler, parse};
pub use scanner::{Tokenizer, tokenize};
pub use schema::{Arg, Args, Field, FromXml, RecordBuilder, Schema, SchemaBuilder};
pub use token::{Attributes, TagName, Token};
pub use value::{Children, Value};

/// Builds a [`Path`] from section names, with an optional attribute after a
/// semicolon.
///
/// ```rust
/// use xmlbind::{Path, path};
///
/// assert_eq!(path!["Person", "Name"], Path::root("Person").append("Name"));
/// assert_eq!(
///     path!["Person", "Name"; "age"],
///     Path::root("Person").append("Name").with_attribute("age")
/// );
/// ```
#[macro_export]
macro_rules! path {
    ($($section:expr),+ $(,)?) => {
        $crate::Path::from_sections([$($section),+])
    };
    ($($section:expr),+ ; $attribute:expr) => {
        $crate::Path::from_sections([$($section),+]).with_attribute($attribute)
    };
}

/// Implements [`XmlEnum`] for a unit enum by listing its wire names.
///
/// ```rust
/// use xmlbind::{XmlEnum, xml_enum};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Sex {
///     Male,
///     Female,
/// }
///
/// xml_enum!(Sex { Male = "MALE", Female = "FEMALE" });
///
/// assert_eq!(Sex::from_name("MALE"), Some(Sex::Male));
/// assert_eq!(Sex::from_name("other"), None);
/// assert_eq!(Sex::Female.name(), "FEMALE");
/// ```
#[macro_export]
macro_rules! xml_enum {
    ($ty:ident { $($variant:ident = $name:literal),+ $(,)? }) => {
        impl $crate::XmlEnum for $ty {
            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}
