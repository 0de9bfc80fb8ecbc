//! Static shape descriptions of model types.
//!
//! Rust has no runtime reflection, so every type that can appear in a model
//! publishes its own shape through [`Reflect`]. Structs get an implementation
//! from `#[derive(Model)]`; primitives, strings, date/time types and the
//! standard wrappers are covered here.
//!
//! ```text
//! User                 Record [id, name, address]
//! ├── id: i64          Scalar
//! ├── name: String     Scalar
//! └── address: Address Record [id, city]
//! ```

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

/// Tag value that excludes a field, same as having no tag at all.
pub const EXCLUDE_TAG: &str = "-";

/// A type that can describe its own shape.
pub trait Reflect {
    /// Describe this type.
    fn type_info() -> TypeInfo;
}

/// Identity of a described type.
///
/// `name` is the bare type name that join directives match against.
/// `path` is the module-qualified identity used for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeKey {
    name: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl TypeKey {
    /// Key for a type whose name and path are known at compile time.
    pub const fn from_static(name: &'static str, path: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            path: Cow::Borrowed(path),
        }
    }

    pub fn new(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Key derived from the compiler's name for `T`.
    pub fn of<T: ?Sized>() -> Self {
        let path = std::any::type_name::<T>();
        Self::from_static(bare_name(path), path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Strip the module path and generic arguments from a type path.
fn bare_name(path: &'static str) -> &'static str {
    let head = path.split('<').next().unwrap_or(path);
    head.rsplit("::").next().unwrap_or(head)
}

/// Shape of a described type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// A single column value.
    Scalar,
    /// An aggregate with named fields, in declaration order.
    Record(Fields),
    /// One level of optional wrapping.
    Optional(TypeRef),
    /// A collection of elements.
    Sequence(TypeRef),
}

/// Field list of a record.
#[derive(Debug, Clone)]
pub enum Fields {
    /// Fields emitted by `#[derive(Model)]`.
    Static(&'static [FieldInfo]),
    /// Fields built at runtime, e.g. from a catalog.
    Shared(Arc<[FieldInfo]>),
}

impl Deref for Fields {
    type Target = [FieldInfo];

    fn deref(&self) -> &[FieldInfo] {
        match self {
            Fields::Static(fields) => *fields,
            Fields::Shared(fields) => &**fields,
        }
    }
}

/// Reference to the type of a field.
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Described on demand by a compiled [`Reflect`] impl.
    Lazy(fn() -> TypeInfo),
    /// Already described.
    Shared(Arc<TypeInfo>),
    /// Nothing is known about the type. Used for excluded fields.
    Opaque,
}

impl TypeRef {
    pub fn of<T: Reflect>() -> Self {
        Self::Lazy(T::type_info)
    }

    /// Describe the referenced type, if anything is known about it.
    pub fn resolve(&self) -> Option<TypeInfo> {
        match self {
            TypeRef::Lazy(describe) => Some(describe()),
            TypeRef::Shared(info) => Some(TypeInfo::clone(info)),
            TypeRef::Opaque => None,
        }
    }
}

/// One declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    ident: Cow<'static, str>,
    tag: Option<Cow<'static, str>>,
    ty: TypeRef,
}

impl FieldInfo {
    pub const fn new(ident: &'static str, tag: Option<&'static str>, ty: TypeRef) -> Self {
        let tag = match tag {
            Some(tag) => Some(Cow::Borrowed(tag)),
            None => None,
        };
        Self {
            ident: Cow::Borrowed(ident),
            tag,
            ty,
        }
    }

    pub fn owned(ident: String, tag: Option<String>, ty: TypeRef) -> Self {
        Self {
            ident: Cow::Owned(ident),
            tag: tag.map(Cow::Owned),
            ty,
        }
    }

    /// Rust-side field name.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Raw tag, including the exclusion marker.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Column tag, or `None` when the field is excluded.
    pub fn column_tag(&self) -> Option<&str> {
        self.tag().filter(|tag| !tag.is_empty() && *tag != EXCLUDE_TAG)
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }
}

/// Description of one type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    key: TypeKey,
    kind: TypeKind,
}

impl TypeInfo {
    pub fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self { key, kind }
    }

    /// Record emitted by `#[derive(Model)]`.
    pub const fn record(name: &'static str, path: &'static str, fields: &'static [FieldInfo]) -> Self {
        Self {
            key: TypeKey::from_static(name, path),
            kind: TypeKind::Record(Fields::Static(fields)),
        }
    }

    pub fn scalar<T: ?Sized>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            kind: TypeKind::Scalar,
        }
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    /// Strip one level of optional wrapping, if present.
    pub fn unwrap_optional(self) -> Option<TypeInfo> {
        match &self.kind {
            TypeKind::Optional(inner) => inner.resolve(),
            _ => Some(self),
        }
    }
}

/// Mark types as single-column scalars.
///
/// ```ignore
/// struct Email(String);
/// colprefix::impl_scalar!(Email);
/// ```
#[macro_export]
macro_rules! impl_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn type_info() -> $crate::TypeInfo {
                    $crate::TypeInfo::scalar::<Self>()
                }
            }
        )+
    };
}

impl_scalar!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String,
);

impl_scalar!(
    std::time::SystemTime,
    std::time::Duration,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
);

impl<Tz: chrono::TimeZone> Reflect for chrono::DateTime<Tz> {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar::<Self>()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(TypeKey::of::<Self>(), TypeKind::Optional(TypeRef::of::<T>()))
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(TypeKey::of::<Self>(), TypeKind::Sequence(TypeRef::of::<T>()))
    }
}

// Pointers describe their pointee.
impl<T: Reflect> Reflect for Box<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }
}

impl<T: Reflect> Reflect for Rc<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }
}
