//! The path index compiler.
//!
//! Compiles a [`Schema`] plus a root tag into an [`Index`]: a map from
//! [`Path`] to the ordered writers that fire when the streaming binder
//! reaches that path. Built once per `(type, root tag)` pair and never
//! mutated afterwards, so a binder can cache and share it across parses.
//!
//! The descent threads an explicit compile context (the set of
//! `(type, path)` pairs already expanded) instead of any shared cache, so
//! repeated compiles are deterministic and types sharing sub-trees merge
//! naturally into one table.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    string::String,
    vec::Vec,
};

use core::any::TypeId;

use crate::{
    error::ConfigError,
    path::{Path, PathExpr},
    schema::{Attach, Ctor, FieldKind, FieldSpec, Finish, MapAttach, MapInsert, Schema, ValueApply},
};

/// Produces (or stands in for) an instance when its path opens.
pub(crate) struct ObjectInit {
    pub(crate) ctor: Ctor,
    /// Present for record types: turns the slot buffer into the real value.
    pub(crate) finish: Option<Finish>,
    pub(crate) owner: TypeId,
    /// How the completed instance reaches its parent at closing time.
    /// `None` for the root.
    pub(crate) attach: Option<(TypeId, Attach)>,
}

/// Applies character data or an attribute value to a live instance.
pub(crate) struct ValueInit {
    pub(crate) owner: TypeId,
    pub(crate) apply: ValueApply,
}

pub(crate) enum Writer {
    Object(ObjectInit),
    Value(ValueInit),
    /// Schema-less subtree capture for `Map<String, Value>` fields.
    DynamicMap {
        parent: TypeId,
        attach: MapAttach,
    },
    /// Per-key nested binder for `Map<String, V>` fields.
    TypedMap {
        parent: TypeId,
        value: Rc<Schema>,
        insert: MapInsert,
    },
}

/// The compiled Path → writers table for one target type.
pub struct Index {
    writers: BTreeMap<Path, Vec<Writer>>,
}

impl Index {
    pub(crate) fn compile(schema: &Schema, root_tag: &str) -> Result<Self, ConfigError> {
        let root = Path::root(root_tag);
        let mut index = Self {
            writers: BTreeMap::new(),
        };
        index.add(
            root.clone(),
            Writer::Object(ObjectInit {
                ctor: schema.construct(),
                finish: schema.finish(),
                owner: schema.type_id(),
                attach: None,
            }),
        );
        let mut ctx = CompileCtx {
            expanded: BTreeSet::new(),
        };
        index.compile_fields(schema, Some(&root), &mut ctx)?;
        Ok(index)
    }

    pub(crate) fn writers_at(&self, path: &Path) -> &[Writer] {
        self.writers.get(path).map_or(&[], Vec::as_slice)
    }

    /// Paths with their writer counts, in path order. Structural equality of
    /// this listing is what "the same schema compiles to the same index"
    /// means.
    pub fn writer_counts(&self) -> Vec<(Path, usize)> {
        self.writers
            .iter()
            .map(|(path, writers)| (path.clone(), writers.len()))
            .collect()
    }

    fn add(&mut self, path: Path, writer: Writer) {
        self.writers.entry(path).or_default().push(writer);
    }

    fn compile_fields(
        &mut self,
        schema: &Schema,
        prefix: Option<&Path>,
        ctx: &mut CompileCtx,
    ) -> Result<(), ConfigError> {
        let owner = schema.type_id();
        for field in schema.fields() {
            match &field.kind {
                FieldKind::Value { apply } => {
                    let path = resolve(prefix, field)?;
                    let path = match &field.attribute {
                        Some(attribute) => path.with_attribute(attribute),
                        None => path,
                    };
                    self.add(
                        path,
                        Writer::Value(ValueInit {
                            owner,
                            apply: Rc::clone(apply),
                        }),
                    );
                }
                FieldKind::Nested { schema: thunk, attach } => {
                    let child = thunk();
                    let path = resolve(prefix, field)?;
                    self.add(
                        path.clone(),
                        Writer::Object(ObjectInit {
                            ctor: child.construct(),
                            finish: child.finish(),
                            owner: child.type_id(),
                            attach: Some((owner, Rc::clone(attach))),
                        }),
                    );
                    self.descend(&child, &path, ctx)?;
                }
                FieldKind::Collection {
                    element,
                    element_type,
                    attach_item,
                } => {
                    let container = resolve(prefix, field)?;
                    let Some(tag) = &field.items else {
                        return Err(ConfigError::MissingItemTag {
                            field: field.name,
                            element_type: *element_type,
                        });
                    };
                    let element = element();
                    let item_path = container.append(tag);
                    self.add(
                        item_path.clone(),
                        Writer::Object(ObjectInit {
                            ctor: element.construct(),
                            finish: element.finish(),
                            owner: element.type_id(),
                            attach: Some((owner, Rc::clone(attach_item))),
                        }),
                    );
                    self.descend(&element, &item_path, ctx)?;
                }
                FieldKind::DynamicMap { attach } => {
                    let path = resolve(prefix, field)?;
                    self.add(
                        path,
                        Writer::DynamicMap {
                            parent: owner,
                            attach: Rc::clone(attach),
                        },
                    );
                }
                FieldKind::TypedMap { value, insert } => {
                    let path = resolve(prefix, field)?;
                    self.add(
                        path,
                        Writer::TypedMap {
                            parent: owner,
                            value: Rc::new(value()),
                            insert: Rc::clone(insert),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn descend(
        &mut self,
        child: &Schema,
        path: &Path,
        ctx: &mut CompileCtx,
    ) -> Result<(), ConfigError> {
        if !ctx.expanded.insert((child.type_id(), path.clone())) {
            // Already expanded at this path; the writers are in the table.
            return Ok(());
        }
        self.compile_fields(child, Some(path), ctx)
    }
}

impl core::fmt::Debug for Index {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.writers.iter().map(|(p, w)| (p, w.len())))
            .finish()
    }
}

struct CompileCtx {
    expanded: BTreeSet<(TypeId, Path)>,
}

/// Resolves a field's declared path against the compile prefix. Absolute
/// expressions restart from the document root; relative ones extend the
/// prefix, and are rejected when there is no prefix to extend. Every path
/// the descent registers goes through here, so the anchor rule cannot be
/// bypassed.
fn resolve(prefix: Option<&Path>, field: &FieldSpec) -> Result<Path, ConfigError> {
    let relative = |segments: &[alloc::string::String]| -> Result<Path, ConfigError> {
        let Some(prefix) = prefix else {
            return Err(ConfigError::RelativePathWithoutAnchor {
                field: field.name,
                path: field.path.clone().unwrap_or_default(),
            });
        };
        let mut path = prefix.clone();
        for segment in segments {
            path = path.append(segment);
        }
        Ok(path)
    };

    match &field.path {
        None => relative(&[]),
        Some(raw) => match PathExpr::parse(raw) {
            PathExpr::Absolute(segments) if segments.is_empty() => relative(&[]),
            PathExpr::Absolute(segments) => {
                Ok(Path::from_sections(segments.iter().map(String::as_str)))
            }
            PathExpr::Relative(segments) => relative(&segments),
        },
    }
}
