use alloc::{format, string::String, vec::Vec};

use quickcheck::QuickCheck;
use quickcheck_macros::quickcheck;

use crate::{Attributes, Path, SaxHandler, StrSource, TagName, parse};

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

/// Deterministic document generator: every byte stream produces a
/// well-formed document.
struct Gen {
    bytes: Vec<u8>,
    pos: usize,
}

impl Gen {
    fn next(&mut self) -> u8 {
        let byte = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    fn element(&mut self, depth: usize, out: &mut String) {
        let name = NAMES[(self.next() as usize) % NAMES.len()];
        if depth >= 3 || self.next() % 4 == 0 {
            out.push_str(&format!("<{name}/>"));
            return;
        }
        out.push_str(&format!("<{name}>"));
        let children = self.next() % 3;
        if children == 0 {
            out.push_str("text");
        }
        for _ in 0..children {
            self.element(depth + 1, out);
        }
        out.push_str(&format!("</{name}>"));
    }
}

fn document(bytes: Vec<u8>) -> String {
    let mut source = Gen { bytes, pos: 0 };
    let mut out = String::new();
    source.element(0, &mut out);
    out
}

/// Checks that the cursor path mirrors the stack of open tags at every
/// event, and that starts and ends balance.
#[derive(Default)]
struct Discipline {
    open: Vec<String>,
    cursor: Option<Path>,
    starts: usize,
    ends: usize,
    ok: bool,
}

impl Discipline {
    fn new() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    fn check_cursor(&mut self) {
        let cursor_names: Vec<String> = self
            .cursor
            .iter()
            .flat_map(|path| path.sections().map(|s| String::from(s.name)))
            .collect();
        self.ok &= cursor_names == self.open;
    }
}

impl SaxHandler for Discipline {
    fn start_tag(&mut self, name: &TagName, _attributes: &Attributes) {
        self.starts += 1;
        self.open.push(name.local.clone());
        self.cursor = Some(match self.cursor.take() {
            None => Path::root(&name.local),
            Some(path) => path.append(&name.local),
        });
        self.check_cursor();
    }

    fn end_tag(&mut self, name: &TagName) {
        self.check_cursor();
        self.ends += 1;
        self.ok &= self.open.pop().as_deref() == Some(name.local.as_str());
        self.cursor = self.cursor.take().and_then(|path| path.pop());
    }
}

#[quickcheck]
fn path_discipline_holds_for_generated_documents(bytes: Vec<u8>) -> bool {
    let doc = document(bytes);
    let mut handler = Discipline::new();
    parse(StrSource::new(&doc), &mut handler).unwrap();
    handler.ok && handler.starts == handler.ends && handler.cursor.is_none()
}

#[test]
fn splitting_a_document_across_lines_preserves_the_tag_sequence() {
    /// Tag events only; character data is allowed to absorb the inserted
    /// line boundaries.
    #[derive(Default)]
    struct Tags {
        events: Vec<(bool, String)>,
    }
    impl SaxHandler for Tags {
        fn start_tag(&mut self, name: &TagName, _attributes: &Attributes) {
            self.events.push((true, name.local.clone()));
        }
        fn end_tag(&mut self, name: &TagName) {
            self.events.push((false, name.local.clone()));
        }
    }

    fn prop(bytes: Vec<u8>) -> bool {
        let doc = document(bytes);
        let split = doc.replace('>', ">\n");

        let mut one_line = Tags::default();
        parse(StrSource::new(&doc), &mut one_line).unwrap();
        let mut many_lines = Tags::default();
        parse(StrSource::new(&split), &mut many_lines).unwrap();

        one_line.events == many_lines.events
    }
    QuickCheck::new().quickcheck(prop as fn(Vec<u8>) -> bool);
}
