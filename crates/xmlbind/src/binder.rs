//! The streaming binder.
//!
//! Drives SAX-shaped events against a compiled [`Index`], maintaining a path
//! cursor and a stack of in-flight instances, and produces the bound value
//! when the root tag closes. Nothing is buffered beyond one pending run of
//! character data and the instances currently open.
//!
//! State machine
//! - *before root*: the index resolution is deferred until the first start
//!   tag, because the root tag name comes from the document.
//! - *inside document*: path cursor + instance stack, writers applied as
//!   their paths open and close. Attributes are applied at open time (they
//!   exist only then); character data and child attachment happen at close
//!   time, which is what lets record types defer construction.
//! - *inside delegated subtree*: a map-valued field suspends the outer
//!   cursor and routes events to a dynamic capture or a nested binder until
//!   the field's own tag closes.
//! - *done*: the root closed; the result is available.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    rc::Rc,
    string::String,
    vec::Vec,
};

use core::any::{TypeId, type_name};
use core::cell::RefCell;

use crate::{
    error::{BindError, ConfigError},
    index::{Index, ValueInit, Writer},
    path::Path,
    reader::LineSource,
    scanner::Tokenizer,
    schema::{FromXml, Instance, MapAttach, MapInsert, Schema},
    token::{Attributes, TagName, Token},
    value::{Children, Value},
};

/// Per-binder configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinderOptions {
    /// Whether an enum token with no matching constant is a binding error.
    ///
    /// When `false`, the unmapped value is simply absent: the target field
    /// keeps its default.
    ///
    /// # Default
    ///
    /// `false`
    pub fail_on_unknown_enum_value: bool,
}

/// Shape descriptor for the map-reading entry point.
///
/// Only `String` keys are supported; any other key type is a configuration
/// error raised before parsing starts.
#[derive(Debug, Clone, Copy)]
pub struct MapShape {
    key_type: &'static str,
    string_key: bool,
}

impl MapShape {
    #[must_use]
    pub fn with_key<K: 'static>() -> Self {
        Self {
            key_type: type_name::<K>(),
            string_key: TypeId::of::<K>() == TypeId::of::<String>(),
        }
    }

    #[must_use]
    pub fn string_keyed() -> Self {
        Self::with_key::<String>()
    }

    fn ensure_string_key(&self) -> Result<(), ConfigError> {
        if self.string_key {
            Ok(())
        } else {
            Err(ConfigError::NonStringMapKey {
                key_type: self.key_type,
            })
        }
    }
}

type IndexCache = Rc<RefCell<BTreeMap<(TypeId, String), Rc<Index>>>>;

/// Reads XML documents into bound values.
///
/// Compiled indexes are memoized per `(target type, root tag)` pair and
/// shared across parses; they are read-only after compilation.
#[derive(Default)]
pub struct Binder {
    options: BinderOptions,
    indexes: IndexCache,
}

impl Binder {
    #[must_use]
    pub fn new(options: BinderOptions) -> Self {
        Self {
            options,
            indexes: IndexCache::default(),
        }
    }

    /// Binds a document to `T`. The whole document streams through exactly
    /// once; either a fully formed value comes back or an error does.
    pub fn read<T: FromXml, S: LineSource>(&self, source: S) -> Result<T, BindError> {
        let mut core = BinderCore::new(
            Rc::new(T::schema()),
            self.options,
            Rc::clone(&self.indexes),
        );
        drive(Tokenizer::new(source), &mut core)?;
        let instance = core.result.take().ok_or(BindError::NoRootElement)?;
        Ok(*instance
            .downcast::<T>()
            .expect("root instance has the schema's target type"))
    }

    /// Binds the root's children as an ordered `String → Value` mapping,
    /// with no schema. `shape` is validated before any input is read.
    pub fn read_map<S: LineSource>(
        &self,
        source: S,
        shape: &MapShape,
    ) -> Result<Children, BindError> {
        shape.ensure_string_key()?;
        let mut capture = DynamicCapture::default();
        let mut seen_root = false;
        for token in Tokenizer::new(source) {
            match token? {
                Token::StartTag { name, .. } => {
                    if seen_root {
                        capture.open(&name.local);
                    } else {
                        seen_root = true;
                    }
                }
                Token::SelfClosingTag { name, .. } => {
                    if seen_root {
                        capture.open(&name.local);
                        capture.close();
                    } else {
                        seen_root = true;
                        break;
                    }
                }
                Token::EndTag { .. } => {
                    if !capture.close() {
                        break;
                    }
                }
                Token::CharacterData(text) => capture.text(text),
                Token::StartComment(_) | Token::CloseComment | Token::DocTypeDeclaration => {}
            }
        }
        if seen_root {
            Ok(capture.root_children)
        } else {
            Err(BindError::NoRootElement)
        }
    }

    /// Binds the root's children as `String → V` entries: every key tag runs
    /// a full nested binder against `V`'s schema.
    pub fn read_map_of<V: FromXml, S: LineSource>(
        &self,
        source: S,
    ) -> Result<Vec<(String, V)>, BindError> {
        let schema = Rc::new(V::schema());
        let mut entries: Vec<(String, V)> = Vec::new();
        let mut current: Option<(String, BinderCore)> = None;
        let mut seen_root = false;
        for token in Tokenizer::new(source) {
            match token? {
                Token::StartTag { name, attributes } => {
                    if !seen_root {
                        seen_root = true;
                    } else if let Some((_, sub)) = current.as_mut() {
                        sub.start_tag(&name, &attributes)?;
                    } else {
                        let mut sub = BinderCore::new(
                            Rc::clone(&schema),
                            self.options,
                            Rc::clone(&self.indexes),
                        );
                        sub.start_tag(&name, &attributes)?;
                        current = Some((name.local.clone(), sub));
                    }
                }
                Token::SelfClosingTag { name, attributes } => {
                    if !seen_root {
                        seen_root = true;
                        break;
                    }
                    match current.as_mut() {
                        Some((_, sub)) => {
                            sub.start_tag(&name, &attributes)?;
                            sub.end_tag(&name)?;
                        }
                        None => {
                            let mut sub = BinderCore::new(
                                Rc::clone(&schema),
                                self.options,
                                Rc::clone(&self.indexes),
                            );
                            sub.start_tag(&name, &attributes)?;
                            sub.end_tag(&name)?;
                            current = Some((name.local.clone(), sub));
                        }
                    }
                    if let Some((key, sub)) = current.take_if(|(_, sub)| sub.result.is_some()) {
                        entries.push((key, take_bound::<V>(sub)));
                    }
                }
                Token::EndTag { name } => {
                    if current.is_none() {
                        break;
                    }
                    if let Some((_, sub)) = current.as_mut() {
                        sub.end_tag(&name)?;
                    }
                    if let Some((key, sub)) = current.take_if(|(_, sub)| sub.result.is_some()) {
                        entries.push((key, take_bound::<V>(sub)));
                    }
                }
                Token::CharacterData(text) => {
                    if let Some((_, sub)) = current.as_mut() {
                        sub.characters(text)?;
                    }
                }
                Token::StartComment(_) | Token::CloseComment | Token::DocTypeDeclaration => {}
            }
        }
        if seen_root {
            Ok(entries)
        } else {
            Err(BindError::NoRootElement)
        }
    }
}

fn take_bound<V: FromXml>(mut sub: BinderCore) -> V {
    let instance = sub
        .result
        .take()
        .expect("checked that the sub-binder finished");
    *instance
        .downcast::<V>()
        .expect("sub-binder instance has the schema's target type")
}

fn drive<S: LineSource>(tokens: Tokenizer<S>, core: &mut BinderCore) -> Result<(), BindError> {
    for token in tokens {
        match token? {
            Token::StartTag { name, attributes } => core.start_tag(&name, &attributes)?,
            Token::SelfClosingTag { name, attributes } => {
                core.start_tag(&name, &attributes)?;
                core.end_tag(&name)?;
            }
            Token::EndTag { name } => core.end_tag(&name)?,
            Token::CharacterData(text) => core.characters(text)?,
            Token::StartComment(_) | Token::CloseComment | Token::DocTypeDeclaration => {}
        }
    }
    Ok(())
}

struct StackEntry {
    owner: TypeId,
    value: Instance,
}

/// Schema-less subtree recorder for dynamic map regions.
#[derive(Default)]
struct DynamicCapture {
    frames: Vec<DynFrame>,
    root_children: Children,
}

struct DynFrame {
    name: String,
    children: Children,
    text: Option<String>,
}

impl DynamicCapture {
    fn open(&mut self, name: &str) {
        self.frames.push(DynFrame {
            name: name.into(),
            children: Vec::new(),
            text: None,
        });
    }

    fn text(&mut self, text: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.text = Some(text);
        }
    }

    /// Folds the top frame into its parent. Returns `false` when the closing
    /// tag belongs to the captured region's own root.
    fn close(&mut self) -> bool {
        let Some(frame) = self.frames.pop() else {
            return false;
        };
        let value = if frame.children.is_empty() {
            Value::Text(frame.text.unwrap_or_default())
        } else {
            Value::Node(frame.children)
        };
        match self.frames.last_mut() {
            Some(parent) => parent.children.push((frame.name, value)),
            None => self.root_children.push((frame.name, value)),
        }
        true
    }
}

enum DelegateState {
    Dynamic {
        parent: TypeId,
        attach: MapAttach,
        capture: DynamicCapture,
    },
    Typed {
        parent: TypeId,
        insert: MapInsert,
        value_schema: Rc<Schema>,
        current: Option<(String, Box<BinderCore>)>,
    },
}

struct BinderCore {
    options: BinderOptions,
    schema: Rc<Schema>,
    cache: IndexCache,
    index: Option<Rc<Index>>,
    path: Option<Path>,
    stack: Vec<StackEntry>,
    pending_text: Option<String>,
    delegate: Option<DelegateState>,
    result: Option<Instance>,
}

impl BinderCore {
    fn new(schema: Rc<Schema>, options: BinderOptions, cache: IndexCache) -> Self {
        Self {
            options,
            schema,
            cache,
            index: None,
            path: None,
            stack: Vec::new(),
            pending_text: None,
            delegate: None,
            result: None,
        }
    }

    fn resolve_index(&mut self, root_tag: &str) -> Result<Rc<Index>, BindError> {
        let key = (self.schema.type_id(), String::from(root_tag));
        if let Some(index) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(index));
        }
        let index = Rc::new(Index::compile(&self.schema, root_tag)?);
        self.cache.borrow_mut().insert(key, Rc::clone(&index));
        Ok(index)
    }

    fn start_tag(&mut self, name: &TagName, attributes: &Attributes) -> Result<(), BindError> {
        if self.result.is_some() {
            return Ok(());
        }
        if self.delegate.is_some() {
            return self.delegate_start(name, attributes);
        }

        let path = match self.path.take() {
            None => {
                let index = self.resolve_index(&name.local)?;
                self.index = Some(index);
                Path::root(&name.local)
            }
            Some(path) => path.append(&name.local),
        };
        let index = Rc::clone(self.index.as_ref().expect("index resolved at the root tag"));

        // A map-valued field suspends the cursor for its whole subtree.
        for writer in index.writers_at(&path) {
            match writer {
                Writer::DynamicMap { parent, attach } => {
                    self.delegate = Some(DelegateState::Dynamic {
                        parent: *parent,
                        attach: Rc::clone(attach),
                        capture: DynamicCapture::default(),
                    });
                    self.path = Some(path);
                    return Ok(());
                }
                Writer::TypedMap {
                    parent,
                    value,
                    insert,
                } => {
                    self.delegate = Some(DelegateState::Typed {
                        parent: *parent,
                        insert: Rc::clone(insert),
                        value_schema: Rc::clone(value),
                        current: None,
                    });
                    self.path = Some(path);
                    return Ok(());
                }
                Writer::Object(_) | Writer::Value(_) => {}
            }
        }

        // Object-initializers fire in registration order; a second writer
        // for the same owner within one occurrence reuses the first
        // instance instead of constructing again.
        let mut opened: Vec<TypeId> = Vec::new();
        for writer in index.writers_at(&path) {
            if let Writer::Object(init) = writer {
                if opened.contains(&init.owner) {
                    continue;
                }
                opened.push(init.owner);
                self.stack.push(StackEntry {
                    owner: init.owner,
                    value: (init.ctor)(),
                });
            }
        }

        // Attributes exist only at open time.
        for (attr_name, attr_value) in attributes.iter() {
            let Some(value) = attr_value else { continue };
            let attr_path = path.with_attribute(attr_name);
            for writer in index.writers_at(&attr_path) {
                if let Writer::Value(init) = writer {
                    self.apply_value(init, value)?;
                }
            }
        }

        self.path = Some(path);
        Ok(())
    }

    fn characters(&mut self, text: String) -> Result<(), BindError> {
        if self.result.is_some() {
            return Ok(());
        }
        match self.delegate.as_mut() {
            Some(DelegateState::Dynamic { capture, .. }) => {
                capture.text(text);
                Ok(())
            }
            Some(DelegateState::Typed { current, .. }) => {
                if let Some((_, sub)) = current.as_mut() {
                    sub.characters(text)?;
                }
                Ok(())
            }
            None => {
                // Last write wins between tag boundaries.
                self.pending_text = Some(text);
                Ok(())
            }
        }
    }

    fn end_tag(&mut self, name: &TagName) -> Result<(), BindError> {
        if self.result.is_some() {
            return Ok(());
        }
        if self.delegate.is_some() {
            return self.delegate_end(name);
        }

        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let index = Rc::clone(self.index.as_ref().expect("index resolved at the root tag"));
        let writers = index.writers_at(&path);

        // Pending character data feeds every value writer at this path.
        if let Some(text) = self.pending_text.take() {
            for writer in writers {
                if let Writer::Value(init) = writer {
                    self.apply_value(init, &text)?;
                }
            }
        }

        // Completed instances pop in reverse registration order, each
        // attaching to its parent exactly once, at close time.
        for writer in writers.iter().rev() {
            let Writer::Object(init) = writer else {
                continue;
            };
            if self.stack.last().is_none_or(|entry| entry.owner != init.owner) {
                continue;
            }
            let entry = self
                .stack
                .pop()
                .expect("stack entry checked just above");
            let value = match &init.finish {
                Some(finish) => finish(entry.value),
                None => entry.value,
            };
            match &init.attach {
                None => {
                    self.result = Some(value);
                }
                Some((parent_owner, attach)) => {
                    if let Some(parent) = self
                        .stack
                        .iter_mut()
                        .rev()
                        .find(|entry| entry.owner == *parent_owner)
                    {
                        attach(parent.value.as_mut(), value)?;
                    }
                }
            }
        }

        self.pending_text = None;
        self.path = path.pop();
        Ok(())
    }

    fn apply_value(&mut self, init: &ValueInit, text: &str) -> Result<(), BindError> {
        let Some(entry) = self
            .stack
            .iter_mut()
            .rev()
            .find(|entry| entry.owner == init.owner)
        else {
            return Ok(());
        };
        (init.apply)(entry.value.as_mut(), text, &self.options)
    }

    fn delegate_start(&mut self, name: &TagName, attributes: &Attributes) -> Result<(), BindError> {
        match self.delegate.as_mut().expect("delegate mode") {
            DelegateState::Dynamic { capture, .. } => {
                capture.open(&name.local);
                Ok(())
            }
            DelegateState::Typed {
                current,
                value_schema,
                ..
            } => match current.as_mut() {
                Some((_, sub)) => sub.start_tag(name, attributes),
                None => {
                    let mut sub = Box::new(BinderCore::new(
                        Rc::clone(value_schema),
                        self.options,
                        Rc::clone(&self.cache),
                    ));
                    sub.start_tag(name, attributes)?;
                    *current = Some((name.local.clone(), sub));
                    Ok(())
                }
            },
        }
    }

    fn delegate_end(&mut self, name: &TagName) -> Result<(), BindError> {
        let delegate = self.delegate.take().expect("delegate mode");
        match delegate {
            DelegateState::Dynamic {
                parent,
                attach,
                mut capture,
            } => {
                if capture.close() {
                    self.delegate = Some(DelegateState::Dynamic {
                        parent,
                        attach,
                        capture,
                    });
                    return Ok(());
                }
                // The field's own tag closed: hand the subtree to its owner.
                if let Some(entry) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|entry| entry.owner == parent)
                {
                    attach(entry.value.as_mut(), capture.root_children)?;
                }
                self.pending_text = None;
                self.path = self.path.as_ref().and_then(Path::pop);
                Ok(())
            }
            DelegateState::Typed {
                parent,
                insert,
                value_schema,
                current,
            } => match current {
                Some((key, mut sub)) => {
                    sub.end_tag(name)?;
                    let finished = sub.result.take();
                    match finished {
                        Some(instance) => {
                            if let Some(entry) = self
                                .stack
                                .iter_mut()
                                .rev()
                                .find(|entry| entry.owner == parent)
                            {
                                insert(entry.value.as_mut(), key, instance)?;
                            }
                            self.delegate = Some(DelegateState::Typed {
                                parent,
                                insert,
                                value_schema,
                                current: None,
                            });
                        }
                        None => {
                            self.delegate = Some(DelegateState::Typed {
                                parent,
                                insert,
                                value_schema,
                                current: Some((key, sub)),
                            });
                        }
                    }
                    Ok(())
                }
                None => {
                    self.pending_text = None;
                    self.path = self.path.as_ref().and_then(Path::pop);
                    Ok(())
                }
            },
        }
    }
}
