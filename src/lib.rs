//! # colprefix
//!
//! > **Stop hand-writing alias-heavy column lists.**
//!
//! colprefix builds `SELECT` column lists for queries that join several
//! tables and scan into nested structs. Tag the fields once; every column
//! comes out prefixed with its table alias, and columns of nested models
//! carry a dotted result-mapping alias.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use colprefix::prelude::*;
//!
//! #[derive(Model)]
//! struct Address {
//!     #[db("id")]
//!     id: i64,
//!     #[db("city")]
//!     city: String,
//! }
//!
//! #[derive(Model)]
//! struct User {
//!     #[db("id")]
//!     id: i64,
//!     #[db("name")]
//!     name: String,
//!     #[db("addr")]
//!     address: Address,
//! }
//!
//! let sql = Prefixer::new()
//!     .columns::<User>("u", &[join("Address", "a")])
//!     .bind_columns("SELECT {columns} FROM users u JOIN addresses a ON a.user_id = u.id");
//! // => SELECT u.id, u.name, a.id AS "addr.id", a.city AS "addr.city" FROM ...
//! ```
//!
//! ## Rules
//!
//! | Input                     | Effect                                      |
//! |---------------------------|---------------------------------------------|
//! | `#[db("col")]`            | Field becomes column `col`                  |
//! | `#[db("-")]` / no tag     | Field is skipped                            |
//! | tagged nested model       | Expanded; tag is its alias and path segment |
//! | nested model, no tags     | Rendered as one column named by the tag     |
//! | no join directives        | Every nested model is expanded              |
//! | join directives           | Only named nested models are expanded       |
//!
//! Rendering never fails. A model that cannot be described produces a
//! shorter list, so check the output rather than an error channel when a
//! column goes missing.

// Lets `#[derive(Model)]` output (which names `::colprefix`) work in this crate's own tests.
extern crate self as colprefix;

pub mod cache;
pub mod catalog;
pub mod config;
pub mod directive;
pub mod error;
pub mod introspect;
pub mod prefixer;
pub mod reflect;
pub mod render;
pub mod schema;

pub use colprefix_derive::Model;
pub use directive::{join, JoinDirective};
pub use error::{ColprefixError, ColprefixResult};
pub use prefixer::{Prefixer, COLUMNS_PLACEHOLDER};
pub use reflect::{FieldInfo, Fields, Reflect, TypeInfo, TypeKey, TypeKind, TypeRef};
pub use schema::{FieldDescriptor, SchemaNode};

pub mod prelude {
    pub use crate::cache::{CacheStats, SchemaCache};
    pub use crate::catalog::ModelCatalog;
    pub use crate::directive::{join, parse_directives, JoinDirective};
    pub use crate::error::*;
    pub use crate::prefixer::{Prefixer, COLUMNS_PLACEHOLDER};
    pub use crate::reflect::Reflect;
    pub use colprefix_derive::Model;
}
