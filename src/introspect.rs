//! Model introspection.
//!
//! Walks a [`TypeInfo`] once and produces the [`SchemaNode`] tree the
//! renderer works from. Nothing here fails: shapes that cannot be expanded
//! are kept as plain columns or dropped, never reported.
//!
//! Nested types that turn out to have no tagged field at all are recorded in
//! the shared [`ExclusionSet`] and from then on rendered as a single column
//! named after the field's tag, without being scanned again. This is how
//! struct-valued columns (timestamps, money, wrapped ids) end up as one
//! column each.

use crate::cache::ExclusionSet;
use crate::reflect::{FieldInfo, TypeInfo, TypeKind};
use crate::schema::{FieldDescriptor, SchemaNode};

/// Effective shape of a field after one level of optional unwrapping.
#[derive(Debug, Clone)]
pub enum FieldShape {
    Scalar,
    Record(TypeInfo),
    OptionalRecord(TypeInfo),
    Sequence(TypeInfo),
    SequenceOfOptional(TypeInfo),
}

impl FieldShape {
    /// Classify a field type.
    ///
    /// One optional level is looked through first, so `Option<Vec<T>>`
    /// classifies like `Vec<T>`. A second optional level is a scalar.
    pub fn of(ty: TypeInfo) -> Self {
        if ty.is_record() {
            return FieldShape::Record(ty);
        }

        match ty.kind() {
            TypeKind::Optional(inner) => match inner.resolve() {
                Some(inner) if inner.is_record() => FieldShape::OptionalRecord(inner),
                Some(inner) => match inner.kind() {
                    TypeKind::Sequence(elem) => Self::sequence(elem.resolve()),
                    _ => FieldShape::Scalar,
                },
                None => FieldShape::Scalar,
            },
            TypeKind::Sequence(elem) => Self::sequence(elem.resolve()),
            TypeKind::Record(_) | TypeKind::Scalar => FieldShape::Scalar,
        }
    }

    fn sequence(elem: Option<TypeInfo>) -> Self {
        match elem {
            Some(elem) if elem.is_record() => FieldShape::Sequence(elem),
            Some(elem) => match elem.unwrap_optional() {
                Some(inner) if inner.is_record() => FieldShape::SequenceOfOptional(inner),
                _ => FieldShape::Scalar,
            },
            None => FieldShape::Scalar,
        }
    }

    /// The nested record type, for shapes that have one.
    pub fn into_record(self) -> Option<TypeInfo> {
        match self {
            FieldShape::Scalar => None,
            FieldShape::Record(ty)
            | FieldShape::OptionalRecord(ty)
            | FieldShape::Sequence(ty)
            | FieldShape::SequenceOfOptional(ty) => Some(ty),
        }
    }
}

/// Builds schema trees, consulting and feeding an exclusion set.
pub struct Introspector<'a> {
    excluded: &'a ExclusionSet,
}

impl<'a> Introspector<'a> {
    pub fn new(excluded: &'a ExclusionSet) -> Self {
        Self { excluded }
    }

    /// Build the tree for a root model.
    ///
    /// One level of optional wrapping is looked through, so `Option<User>`
    /// describes the same columns as `User`. Anything that is not a record
    /// yields an empty tree.
    pub fn introspect_root(&self, info: &TypeInfo, db_alias: &str) -> SchemaNode {
        match info.clone().unwrap_optional() {
            Some(model) => self.introspect(&model, db_alias, "").0,
            None => SchemaNode::new(info.name(), db_alias, ""),
        }
    }

    /// Build the node for `info`, returning whether any field survived.
    pub fn introspect(&self, info: &TypeInfo, db_alias: &str, path_prefix: &str) -> (SchemaNode, bool) {
        let mut node = SchemaNode::new(info.name(), db_alias, path_prefix);

        let TypeKind::Record(fields) = info.kind() else {
            return (node, false);
        };

        node.fields.reserve(fields.len());
        for field in fields.iter() {
            let Some(tag) = field.column_tag() else {
                continue;
            };
            node.fields.push(self.describe(field, tag, path_prefix));
        }

        let any_tagged = !node.fields.is_empty();
        (node, any_tagged)
    }

    fn describe(&self, field: &FieldInfo, tag: &str, path_prefix: &str) -> FieldDescriptor {
        let Some(record) = field.ty().resolve().and_then(|ty| FieldShape::of(ty).into_record()) else {
            return FieldDescriptor::leaf(tag);
        };

        if self.excluded.contains(record.key()) {
            return FieldDescriptor::leaf(tag);
        }

        let nested_prefix = if path_prefix.is_empty() {
            tag.to_string()
        } else {
            format!("{path_prefix}.{tag}")
        };

        let (child, any_tagged) = self.introspect(&record, tag, &nested_prefix);
        if !any_tagged {
            tracing::trace!(model = %record.key(), field = field.ident(), "no tagged fields, kept as column");
            self.excluded.insert(record.key().clone());
            return FieldDescriptor::leaf(tag);
        }

        FieldDescriptor::nested(tag, child)
    }
}
