//! Scalar coercion from raw XML text.
//!
//! The contract is deliberately small: a conversion either produces the
//! target type or it does not, and the binder turns a miss into a
//! `BindError::InvalidScalar` naming the text and the target type. Numeric
//! and boolean conversions trim surrounding whitespace first; `String` is
//! verbatim.

use alloc::string::{String, ToString};

/// Conversion from the character data or attribute text of a tag.
pub trait FromXmlText: Sized {
    fn from_xml_text(text: &str) -> Option<Self>;
}

impl FromXmlText for String {
    fn from_xml_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FromXmlText for bool {
    fn from_xml_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FromXmlText for char {
    fn from_xml_text(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }
}

macro_rules! impl_from_xml_text_via_parse {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromXmlText for $ty {
                fn from_xml_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )+
    };
}

impl_from_xml_text_via_parse!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: FromXmlText> FromXmlText for Option<T> {
    fn from_xml_text(text: &str) -> Option<Self> {
        T::from_xml_text(text).map(Some)
    }
}

/// Name lookup over an enum's constants.
///
/// Implemented by hand or through [`xml_enum!`](crate::xml_enum); an
/// unmapped name resolves against the binder's unknown-enum policy.
pub trait XmlEnum: Sized + 'static {
    fn from_name(name: &str) -> Option<Self>;

    /// The constant's wire name, used by the write path.
    fn name(&self) -> &'static str;
}
