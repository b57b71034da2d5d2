//! Schema registration: the explicit type-descriptor capability.
//!
//! Why this exists
//! - The binder never introspects anything at runtime. A target type
//!   declares its shape once, through [`FromXml::schema`], and the index
//!   compiler consumes that declaration. Field capabilities are erased into
//!   closures over `dyn Any` at registration time, so the compiled index is
//!   a plain data structure.
//!
//! Two registration surfaces
//! - [`Schema::build`] for mutable targets (`Default` + field setters).
//! - [`Schema::record`] for immutable record targets: arguments are
//!   registered in declaration order, each assigned a slot; bound values
//!   accumulate in a [`RecordBuf`] side-buffer and the real value is
//!   constructed only when the owning tag closes.

use alloc::{boxed::Box, rc::Rc, string::String, vec::Vec};

use core::any::{Any, TypeId, type_name};
use core::marker::PhantomData;

use crate::{
    binder::BinderOptions,
    convert::{FromXmlText, XmlEnum},
    error::BindError,
    value::Children,
};

/// A live, type-erased target instance.
pub(crate) type Instance = Box<dyn Any>;
pub(crate) type Ctor = Rc<dyn Fn() -> Instance>;
/// Turns a filled [`RecordBuf`] into the real record value.
pub(crate) type Finish = Rc<dyn Fn(Instance) -> Instance>;
pub(crate) type ValueApply =
    Rc<dyn Fn(&mut dyn Any, &str, &BinderOptions) -> Result<(), BindError>>;
pub(crate) type Attach = Rc<dyn Fn(&mut dyn Any, Instance) -> Result<(), BindError>>;
pub(crate) type MapAttach = Rc<dyn Fn(&mut dyn Any, Children) -> Result<(), BindError>>;
pub(crate) type MapInsert =
    Rc<dyn Fn(&mut dyn Any, String, Instance) -> Result<(), BindError>>;
/// Deferred schema lookup, so nested registrations don't eagerly expand the
/// whole type graph.
pub(crate) type SchemaThunk = Rc<dyn Fn() -> Schema>;

/// A type that can be bound from XML.
pub trait FromXml: 'static {
    fn schema() -> Schema;
}

/// The registered description of one target type.
pub struct Schema {
    type_name: &'static str,
    type_id: TypeId,
    root_tag: &'static str,
    construct: Ctor,
    finish: Option<Finish>,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Starts a schema for a mutable target populated through setters.
    pub fn build<T: Default + 'static>(root_tag: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            root_tag,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Starts a schema for an immutable record target, populated only
    /// through its constructor at closing time.
    pub fn record<T: 'static>(root_tag: &'static str) -> RecordBuilder<T> {
        RecordBuilder {
            root_tag,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The tag this type binds to when it is the document root.
    #[must_use]
    pub fn root_tag(&self) -> &'static str {
        self.root_tag
    }

    pub(crate) fn construct(&self) -> Ctor {
        Rc::clone(&self.construct)
    }

    pub(crate) fn finish(&self) -> Option<Finish> {
        self.finish.clone()
    }

    pub(crate) fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

impl core::fmt::Debug for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Schema")
            .field("type", &self.type_name)
            .field("root_tag", &self.root_tag)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// One registered field, fully erased.
pub(crate) struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) path: Option<String>,
    pub(crate) attribute: Option<String>,
    pub(crate) items: Option<String>,
    pub(crate) kind: FieldKind,
}

pub(crate) enum FieldKind {
    /// Scalar, enum, or custom-converted text/attribute value.
    Value { apply: ValueApply },
    /// Nested complex type; attached to its parent when its tag closes.
    Nested { schema: SchemaThunk, attach: Attach },
    /// Repeated structure: one fresh element per item-tag occurrence.
    Collection {
        element: SchemaThunk,
        element_type: &'static str,
        attach_item: Attach,
    },
    /// `Map<String, Value>`: the subtree is recorded without a schema.
    DynamicMap { attach: MapAttach },
    /// `Map<String, V>` with a declared `V`: one nested binder per key.
    TypedMap { value: SchemaThunk, insert: MapInsert },
}

fn expect_target<T: 'static>(target: &mut dyn Any) -> &mut T {
    target
        .downcast_mut::<T>()
        .expect("writer applied to an instance of the wrong type")
}

/// Builder for mutable targets.
pub struct SchemaBuilder<T> {
    root_tag: &'static str,
    fields: Vec<FieldSpec>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Default + 'static> SchemaBuilder<T> {
    #[must_use]
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field.spec);
        self
    }

    #[must_use]
    pub fn finish(self) -> Schema {
        Schema {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            root_tag: self.root_tag,
            construct: Rc::new(|| Box::new(T::default()) as Instance),
            finish: None,
            fields: self.fields,
        }
    }
}

/// One field of a mutable target. Metadata (`at`, `attr`, `items`) chains
/// onto the constructor.
pub struct Field<T> {
    spec: FieldSpec,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: 'static> Field<T> {
    fn from_kind(name: &'static str, kind: FieldKind) -> Self {
        Self {
            spec: FieldSpec {
                name,
                path: None,
                attribute: None,
                items: None,
                kind,
            },
            _marker: PhantomData,
        }
    }

    /// A scalar field converted through [`FromXmlText`].
    pub fn text<V>(name: &'static str, set: impl Fn(&mut T, V) + 'static) -> Self
    where
        V: FromXmlText + 'static,
    {
        let apply: ValueApply = Rc::new(move |target, text, _options| {
            let Some(value) = V::from_xml_text(text) else {
                return Err(BindError::InvalidScalar {
                    text: text.into(),
                    target: type_name::<V>(),
                });
            };
            set(expect_target::<T>(target), value);
            Ok(())
        });
        Self::from_kind(name, FieldKind::Value { apply })
    }

    /// An enum field resolved by constant name. Unknown names follow the
    /// binder's unknown-enum policy.
    pub fn enumerated<E>(name: &'static str, set: impl Fn(&mut T, E) + 'static) -> Self
    where
        E: XmlEnum,
    {
        let apply: ValueApply = Rc::new(move |target, text, options| {
            match E::from_name(text.trim()) {
                Some(value) => {
                    set(expect_target::<T>(target), value);
                    Ok(())
                }
                None if options.fail_on_unknown_enum_value => Err(BindError::UnknownEnumValue {
                    value: text.trim().into(),
                    enum_type: type_name::<E>(),
                }),
                None => Ok(()),
            }
        });
        Self::from_kind(name, FieldKind::Value { apply })
    }

    /// A field with its own conversion, injected at registration time.
    pub fn custom(
        name: &'static str,
        apply: impl Fn(&mut T, &str) -> Result<(), BindError> + 'static,
    ) -> Self {
        let apply: ValueApply =
            Rc::new(move |target, text, _options| apply(expect_target::<T>(target), text));
        Self::from_kind(name, FieldKind::Value { apply })
    }

    /// A nested complex-type field.
    pub fn nested<C>(name: &'static str, set: impl Fn(&mut T, C) + 'static) -> Self
    where
        C: FromXml,
    {
        let attach: Attach = Rc::new(move |parent, child| {
            let child = child
                .downcast::<C>()
                .expect("nested writer produced an instance of the wrong type");
            set(expect_target::<T>(parent), *child);
            Ok(())
        });
        Self::from_kind(
            name,
            FieldKind::Nested {
                schema: Rc::new(C::schema),
                attach,
            },
        )
    }

    /// A repeated structure. `push` receives one fresh element per item-tag
    /// occurrence, so it backs lists and sets alike. Requires
    /// [`items`](Self::items).
    pub fn list<C>(name: &'static str, push: impl Fn(&mut T, C) + 'static) -> Self
    where
        C: FromXml,
    {
        let attach_item: Attach = Rc::new(move |parent, child| {
            let child = child
                .downcast::<C>()
                .expect("element writer produced an instance of the wrong type");
            push(expect_target::<T>(parent), *child);
            Ok(())
        });
        Self::from_kind(
            name,
            FieldKind::Collection {
                element: Rc::new(C::schema),
                element_type: type_name::<C>(),
                attach_item,
            },
        )
    }

    /// A `Map<String, Value>` field: the subtree under this field's tag is
    /// recorded dynamically, with no schema.
    pub fn dynamic_map(name: &'static str, set: impl Fn(&mut T, Children) + 'static) -> Self {
        let attach: MapAttach = Rc::new(move |parent, children| {
            set(expect_target::<T>(parent), children);
            Ok(())
        });
        Self::from_kind(name, FieldKind::DynamicMap { attach })
    }

    /// A `Map<String, V>` field with a declared value type: every key tag
    /// runs a full nested binder against `V`'s schema.
    pub fn map_of<V>(name: &'static str, insert: impl Fn(&mut T, String, V) + 'static) -> Self
    where
        V: FromXml,
    {
        let insert: MapInsert = Rc::new(move |parent, key, value| {
            let value = value
                .downcast::<V>()
                .expect("map writer produced an instance of the wrong type");
            insert(expect_target::<T>(parent), key, *value);
            Ok(())
        });
        Self::from_kind(
            name,
            FieldKind::TypedMap {
                value: Rc::new(V::schema),
                insert,
            },
        )
    }

    /// Binds the field to a path: absolute (`/Person/Name`) restarts from
    /// the document root, relative (`Name`) extends the owner's prefix.
    #[must_use]
    pub fn at(mut self, path: &str) -> Self {
        self.spec.path = Some(path.into());
        self
    }

    /// Binds the field to an attribute of its path's tag.
    #[must_use]
    pub fn attr(mut self, name: &str) -> Self {
        self.spec.attribute = Some(name.into());
        self
    }

    /// The item tag name for repeated structures.
    #[must_use]
    pub fn items(mut self, tag: &str) -> Self {
        self.spec.items = Some(tag.into());
        self
    }
}

/// Builder for immutable record targets.
pub struct RecordBuilder<T> {
    root_tag: &'static str,
    fields: Vec<FieldSpec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> RecordBuilder<T> {
    /// Registers the next constructor argument; its slot is the registration
    /// order.
    #[must_use]
    pub fn arg(mut self, arg: Arg) -> Self {
        let slot = self.fields.len();
        self.fields.push(arg.into_spec(slot));
        self
    }

    /// Seals the record with its constructor. `build` runs once, when the
    /// record's tag closes; unbound slots come back as zero values through
    /// [`Args::take`].
    pub fn construct(self, build: impl Fn(&mut Args) -> T + 'static) -> Schema {
        let arg_count = self.fields.len();
        Schema {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            root_tag: self.root_tag,
            construct: Rc::new(move || Box::new(RecordBuf::new(arg_count)) as Instance),
            finish: Some(Rc::new(move |instance| {
                let buf = instance
                    .downcast::<RecordBuf>()
                    .expect("record finisher applied to a non-record instance");
                let mut args = Args(*buf);
                Box::new(build(&mut args)) as Instance
            })),
            fields: self.fields,
        }
    }
}

/// One constructor argument of a record schema. Mirrors [`Field`], minus
/// setters: values land in the record's slot buffer instead.
pub struct Arg {
    name: &'static str,
    path: Option<String>,
    attribute: Option<String>,
    items: Option<String>,
    make: Box<dyn FnOnce(usize) -> FieldKind>,
}

impl Arg {
    fn new(name: &'static str, make: Box<dyn FnOnce(usize) -> FieldKind>) -> Self {
        Self {
            name,
            path: None,
            attribute: None,
            items: None,
            make,
        }
    }

    fn into_spec(self, slot: usize) -> FieldSpec {
        FieldSpec {
            name: self.name,
            path: self.path,
            attribute: self.attribute,
            items: self.items,
            kind: (self.make)(slot),
        }
    }

    pub fn text<V>(name: &'static str) -> Self
    where
        V: FromXmlText + 'static,
    {
        Self::new(
            name,
            Box::new(|slot| {
                let apply: ValueApply = Rc::new(move |target, text, _options| {
                    let Some(value) = V::from_xml_text(text) else {
                        return Err(BindError::InvalidScalar {
                            text: text.into(),
                            target: type_name::<V>(),
                        });
                    };
                    expect_target::<RecordBuf>(target).set(slot, Box::new(value));
                    Ok(())
                });
                FieldKind::Value { apply }
            }),
        )
    }

    pub fn enumerated<E>(name: &'static str) -> Self
    where
        E: XmlEnum,
    {
        Self::new(
            name,
            Box::new(|slot| {
                let apply: ValueApply = Rc::new(move |target, text, options| {
                    match E::from_name(text.trim()) {
                        Some(value) => {
                            expect_target::<RecordBuf>(target).set(slot, Box::new(value));
                            Ok(())
                        }
                        None if options.fail_on_unknown_enum_value => {
                            Err(BindError::UnknownEnumValue {
                                value: text.trim().into(),
                                enum_type: type_name::<E>(),
                            })
                        }
                        None => Ok(()),
                    }
                });
                FieldKind::Value { apply }
            }),
        )
    }

    pub fn nested<C>(name: &'static str) -> Self
    where
        C: FromXml,
    {
        Self::new(
            name,
            Box::new(|slot| {
                let attach: Attach = Rc::new(move |parent, child| {
                    expect_target::<RecordBuf>(parent).set(slot, child);
                    Ok(())
                });
                FieldKind::Nested {
                    schema: Rc::new(C::schema),
                    attach,
                }
            }),
        )
    }

    pub fn list<C>(name: &'static str) -> Self
    where
        C: FromXml,
    {
        Self::new(
            name,
            Box::new(|slot| {
                let attach_item: Attach = Rc::new(move |parent, child| {
                    let child = child
                        .downcast::<C>()
                        .expect("element writer produced an instance of the wrong type");
                    let buf = expect_target::<RecordBuf>(parent);
                    if buf.get_mut::<Vec<C>>(slot).is_none() {
                        buf.set(slot, Box::new(Vec::<C>::new()));
                    }
                    buf.get_mut::<Vec<C>>(slot)
                        .expect("slot initialized just above")
                        .push(*child);
                    Ok(())
                });
                FieldKind::Collection {
                    element: Rc::new(C::schema),
                    element_type: type_name::<C>(),
                    attach_item,
                }
            }),
        )
    }

    #[must_use]
    pub fn at(mut self, path: &str) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str) -> Self {
        self.attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn items(mut self, tag: &str) -> Self {
        self.items = Some(tag.into());
        self
    }
}

/// Slot buffer standing in for a record instance while its tag is open.
pub struct RecordBuf {
    slots: Vec<Option<Box<dyn Any>>>,
}

impl RecordBuf {
    fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(|_| None).collect(),
        }
    }

    fn set(&mut self, slot: usize, value: Box<dyn Any>) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(value);
        }
    }

    fn get_mut<V: 'static>(&mut self, slot: usize) -> Option<&mut V> {
        self.slots.get_mut(slot)?.as_mut()?.downcast_mut()
    }
}

/// The filled argument buffer handed to a record constructor.
pub struct Args(RecordBuf);

impl Args {
    /// Takes the value bound at `slot`, or the type's zero value when the
    /// document never bound it.
    pub fn take<V: Default + 'static>(&mut self, slot: usize) -> V {
        self.0
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .and_then(|value| value.downcast::<V>().ok())
            .map_or_else(V::default, |value| *value)
    }
}
