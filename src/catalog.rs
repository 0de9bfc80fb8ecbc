//! Models described in a TOML or JSON catalog instead of Rust structs.
//!
//! # Example
//!
//! ```
//! use colprefix::catalog::ModelCatalog;
//!
//! let catalog = ModelCatalog::from_toml_str(r#"
//!     [models.Address]
//!     fields = [{ name = "id", db = "id" }, { name = "city", db = "city" }]
//!
//!     [models.User]
//!     fields = [
//!         { name = "id", db = "id" },
//!         { name = "address", db = "addr", model = "Address" },
//!     ]
//! "#).unwrap();
//!
//! let user = catalog.type_info("User").unwrap();
//! assert_eq!(user.name(), "User");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ColprefixError, ColprefixResult};
use crate::reflect::{FieldInfo, Fields, TypeInfo, TypeKey, TypeKind, TypeRef, EXCLUDE_TAG};

/// Prefix of every catalog namespace.
pub const CATALOG_NAMESPACE: &str = "catalog";

/// A set of named model definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: BTreeMap<String, ModelSpec>,
}

/// One model: its fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One field of a catalog model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Column tag. Absent or `-` excludes the field.
    #[serde(default)]
    pub db: Option<String>,
    /// Nested catalog model. Absent means a scalar column.
    #[serde(default)]
    pub model: Option<String>,
    /// Column type of a scalar field; informational only.
    #[serde(default, rename = "type")]
    pub typ: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub many: bool,
}

impl ModelCatalog {
    pub fn from_toml_str(content: &str) -> ColprefixResult<Self> {
        toml::from_str(content).map_err(|e| ColprefixError::Catalog(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> ColprefixResult<Self> {
        serde_json::from_str(content).map_err(|e| ColprefixError::Catalog(e.to_string()))
    }

    /// Load a catalog file. `.json` files are read as JSON, anything else
    /// as TOML.
    pub fn load(path: &Path) -> ColprefixResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        tracing::debug!(path = %path.display(), models = catalog.models.len(), "loaded model catalog");
        Ok(catalog)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// Namespace this catalog's models are keyed under, e.g.
    /// `catalog@5f0c2a9d3e71b804`.
    ///
    /// Derived from the catalog's content: catalogs that define a model
    /// name differently get distinct cache and exclusion entries, identical
    /// catalogs share them.
    pub fn namespace(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{CATALOG_NAMESPACE}@{:016x}", hasher.finish())
    }

    /// Qualified key of one of this catalog's models.
    pub fn key(&self, name: &str) -> TypeKey {
        catalog_key(&self.namespace(), name)
    }

    /// Describe a model and everything it nests.
    pub fn type_info(&self, name: &str) -> ColprefixResult<TypeInfo> {
        let mut resolver = Resolver {
            catalog: self,
            namespace: self.namespace(),
            done: HashMap::new(),
            visiting: Vec::new(),
        };
        resolver.resolve(name).map(|info| TypeInfo::clone(&info))
    }
}

fn catalog_key(namespace: &str, name: &str) -> TypeKey {
    TypeKey::new(name.to_string(), format!("{namespace}::{name}"))
}

struct Resolver<'a> {
    catalog: &'a ModelCatalog,
    namespace: String,
    done: HashMap<&'a str, Arc<TypeInfo>>,
    visiting: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, name: &str) -> ColprefixResult<Arc<TypeInfo>> {
        let catalog = self.catalog;
        let (name, spec) = catalog
            .models
            .get_key_value(name)
            .ok_or_else(|| ColprefixError::UnknownModel(name.to_string()))?;

        if let Some(info) = self.done.get(name.as_str()) {
            return Ok(Arc::clone(info));
        }
        if self.visiting.contains(&name.as_str()) {
            return Err(ColprefixError::CyclicModel(name.clone()));
        }

        self.visiting.push(name);
        let mut fields = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            let ty = self.field_type(field)?;
            fields.push(FieldInfo::owned(field.name.clone(), field.db.clone(), ty));
        }
        self.visiting.pop();

        let info = Arc::new(TypeInfo::new(catalog_key(&self.namespace, name), TypeKind::Record(Fields::Shared(fields.into()))));
        self.done.insert(name, Arc::clone(&info));
        Ok(info)
    }

    fn field_type(&mut self, field: &FieldSpec) -> ColprefixResult<TypeRef> {
        // Excluded fields carry no type, same as with the derive.
        let excluded = field
            .db
            .as_deref()
            .is_none_or(|tag| tag.is_empty() || tag == EXCLUDE_TAG);
        if excluded {
            return Ok(TypeRef::Opaque);
        }

        let mut ty = match &field.model {
            Some(model) => self.resolve(model)?,
            None => {
                let typ = field.typ.clone().unwrap_or_else(|| "scalar".to_string());
                Arc::new(TypeInfo::new(TypeKey::new(typ.clone(), typ), TypeKind::Scalar))
            }
        };

        if field.optional {
            let key = TypeKey::new("Option", format!("Option<{}>", ty.key().path()));
            ty = Arc::new(TypeInfo::new(key, TypeKind::Optional(TypeRef::Shared(ty))));
        }
        if field.many {
            let key = TypeKey::new("Vec", format!("Vec<{}>", ty.key().path()));
            ty = Arc::new(TypeInfo::new(key, TypeKind::Sequence(TypeRef::Shared(ty))));
        }

        Ok(TypeRef::Shared(ty))
    }
}
