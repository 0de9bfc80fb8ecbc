//! The public entry point.
//!
//! A [`Prefixer`] owns a private text buffer and shares its schema cache with
//! every fork. One instance renders one list at a time; to render from
//! several threads, give each one its own fork.
//!
//! ```ignore
//! use colprefix::prelude::*;
//!
//! let mut prefixer = Prefixer::new();
//! let sql = prefixer
//!     .columns::<User>("u", &[join("Address", "a")])
//!     .bind_columns("SELECT {columns} FROM users u JOIN addresses a ON a.user_id = u.id");
//! ```

use std::fmt::Write;

use crate::cache::{CacheStats, SchemaCache};
use crate::directive::{JoinDirective, JoinSet};
use crate::introspect::Introspector;
use crate::reflect::{Reflect, TypeInfo};
use crate::render::{trim_separator, ColumnWriter, SEPARATOR};

/// Token replaced by [`Prefixer::bind_columns`].
pub const COLUMNS_PLACEHOLDER: &str = "{columns}";

/// Builds prefixed column lists for models.
#[derive(Debug)]
pub struct Prefixer {
    buf: String,
    cache: SchemaCache,
    debug: bool,
}

impl Default for Prefixer {
    fn default() -> Self {
        Self::new()
    }
}

/// Shares the schema cache; the clone starts with an empty buffer.
impl Clone for Prefixer {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl Prefixer {
    /// Create a prefixer with a fresh cache.
    pub fn new() -> Self {
        Self::with_cache(SchemaCache::new())
    }

    /// Create a prefixer on top of an existing cache.
    pub fn with_cache(cache: SchemaCache) -> Self {
        Self {
            buf: String::with_capacity(256),
            cache,
            debug: false,
        }
    }

    /// New prefixer sharing this one's cache, with its own empty buffer.
    ///
    /// Use one fork per thread for concurrent rendering.
    pub fn fork(&self) -> Self {
        Self {
            buf: String::with_capacity(256),
            cache: self.cache.clone(),
            debug: self.debug,
        }
    }

    /// Log buffer write failures. Never changes the rendered output.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Render the columns of `T`, replacing anything already buffered.
    ///
    /// With no directives every nested model is included. Otherwise only
    /// nested models named by a directive are, at any depth.
    pub fn columns<T: Reflect>(&mut self, db_alias: &str, joins: &[JoinDirective]) -> &mut Self {
        self.columns_of(&T::type_info(), db_alias, joins)
    }

    /// Like [`columns`](Self::columns), for a model described at runtime.
    pub fn columns_of(&mut self, info: &TypeInfo, db_alias: &str, joins: &[JoinDirective]) -> &mut Self {
        self.buf.clear();
        self.append_columns_of(info, db_alias, joins)
    }

    /// Render the columns of `T` after whatever is already buffered.
    pub fn append_columns<T: Reflect>(&mut self, db_alias: &str, joins: &[JoinDirective]) -> &mut Self {
        self.append_columns_of(&T::type_info(), db_alias, joins)
    }

    pub fn append_columns_of(&mut self, info: &TypeInfo, db_alias: &str, joins: &[JoinDirective]) -> &mut Self {
        let root = self
            .cache
            .get_or_build(info.key(), |excluded| Introspector::new(excluded).introspect_root(info, db_alias));

        let joins = JoinSet::new(joins);
        ColumnWriter::new(&mut self.buf, &joins)
            .debug(self.debug)
            .render(&root, db_alias);
        self
    }

    /// Append a hand-written column expression, e.g. `COUNT(*) AS total`.
    ///
    /// Empty text is ignored.
    pub fn custom_columns(&mut self, custom: &str) -> &mut Self {
        if custom.is_empty() {
            return self;
        }
        self.write_raw(custom);
        self.write_raw(SEPARATOR);
        self
    }

    /// Put a hand-written column expression in front of the buffered list.
    pub fn prepend_custom_columns(&mut self, custom: &str) -> &mut Self {
        if custom.is_empty() {
            return self;
        }
        self.buf.insert_str(0, SEPARATOR);
        self.buf.insert_str(0, custom);
        self
    }

    /// Replace every `{columns}` in `query` with the column list.
    ///
    /// Resets the buffer.
    pub fn bind_columns(&mut self, query: &str) -> String {
        let bound = query.replace(COLUMNS_PLACEHOLDER, trim_separator(&self.buf));
        self.buf.clear();
        bound
    }

    /// The column list without its trailing separator.
    ///
    /// Resets the buffer.
    pub fn finalize(&mut self) -> String {
        let columns = trim_separator(&self.buf).to_string();
        self.buf.clear();
        columns
    }

    /// The buffered text, trailing separator included.
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn write_raw(&mut self, text: &str) {
        if let Err(e) = self.buf.write_str(text) {
            if self.debug {
                tracing::warn!(error = %e, text, "failed to write to column buffer");
            }
        }
    }
}
