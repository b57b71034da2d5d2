//! SAX-style event adapter over the token stream.
//!
//! Pure translation, no buffering: one callback per token, except that a
//! self-closing tag expands into `start_tag` immediately followed by
//! `end_tag`. Comment and declaration tokens are dropped.

use crate::{
    error::ParseError,
    reader::LineSource,
    scanner::Tokenizer,
    token::{Attributes, TagName, Token},
};

/// The four parse callbacks.
///
/// All methods default to no-ops so handlers only implement what they need.
pub trait SaxHandler {
    fn start_document(&mut self) {}
    fn start_tag(&mut self, name: &TagName, attributes: &Attributes) {
        let _ = (name, attributes);
    }
    fn end_tag(&mut self, name: &TagName) {
        let _ = name;
    }
    fn characters(&mut self, text: &str) {
        let _ = text;
    }
}

/// Streams `source` through `handler`. `start_document` fires once, before
/// the first token is pulled.
pub fn parse<S: LineSource, H: SaxHandler>(source: S, handler: &mut H) -> Result<(), ParseError> {
    handler.start_document();
    for token in Tokenizer::new(source) {
        match token? {
            Token::StartTag { name, attributes } => handler.start_tag(&name, &attributes),
            Token::SelfClosingTag { name, attributes } => {
                handler.start_tag(&name, &attributes);
                handler.end_tag(&name);
            }
            Token::EndTag { name } => handler.end_tag(&name),
            Token::CharacterData(text) => handler.characters(&text),
            Token::StartComment(_) | Token::CloseComment | Token::DocTypeDeclaration => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::String, vec::Vec};

    use super::*;
    use crate::reader::StrSource;

    /// Records callbacks as compact strings, for call-sequence assertions.
    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
    }

    impl SaxHandler for Trace {
        fn start_document(&mut self) {
            self.calls.push("doc".into());
        }
        fn start_tag(&mut self, name: &TagName, attributes: &Attributes) {
            self.calls.push(format!("+{name}[{}]", attributes.len()));
        }
        fn end_tag(&mut self, name: &TagName) {
            self.calls.push(format!("-{name}"));
        }
        fn characters(&mut self, text: &str) {
            self.calls.push(format!("\"{text}\""));
        }
    }

    fn trace(text: &str) -> Vec<String> {
        let mut handler = Trace::default();
        parse(StrSource::new(text), &mut handler).unwrap();
        handler.calls
    }

    #[test]
    fn self_closing_equivalence() {
        assert_eq!(trace("<a/>"), trace("<a></a>"));
        assert_eq!(trace("<a/>"), ["doc", "+a[0]", "-a"]);
    }

    #[test]
    fn comments_and_declarations_are_dropped() {
        let calls = trace("<?xml version=\"1.0\"?><a><!-- hidden -->x</a>");
        assert_eq!(calls, ["doc", "+a[0]", "\"x\"", "-a"]);
    }

    #[test]
    fn one_callback_per_token() {
        let calls = trace("<a b=\"1\"><c/>text</a>");
        assert_eq!(calls, ["doc", "+a[1]", "+c[0]", "-c", "\"text\"", "-a"]);
    }
}
