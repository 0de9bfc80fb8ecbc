//! Column list rendering.
//!
//! Turns a [`SchemaNode`] tree into `alias.column` references. Columns of
//! nested models additionally get a result-mapping alias built from the
//! node's path prefix:
//!
//! ```text
//! u.id, u.name, addr.id AS "addr.id", addr.city AS "addr.city",
//! ```
//!
//! Every entry is followed by [`SEPARATOR`]; the trailing one is trimmed by
//! [`trim_separator`] when the list is handed out.

use std::fmt::Write;

use crate::directive::JoinSet;
use crate::schema::SchemaNode;

/// Separator written after every rendered entry.
pub const SEPARATOR: &str = ", ";

/// Strip the trailing separator left behind by the renderer.
pub fn trim_separator(text: &str) -> &str {
    text.strip_suffix(SEPARATOR).unwrap_or(text)
}

/// Writes column references for a tree into a caller-owned buffer.
pub struct ColumnWriter<'a> {
    buf: &'a mut String,
    joins: &'a JoinSet<'a>,
    debug: bool,
}

impl<'a> ColumnWriter<'a> {
    pub fn new(buf: &'a mut String, joins: &'a JoinSet<'a>) -> Self {
        Self {
            buf,
            joins,
            debug: false,
        }
    }

    /// Report buffer write failures through `tracing`.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Render `root` with its leaves prefixed by `root_alias`.
    pub fn render(&mut self, root: &SchemaNode, root_alias: &str) {
        self.render_node(root, root_alias);
    }

    fn render_node(&mut self, node: &SchemaNode, alias: &str) {
        for field in &node.fields {
            if let Some(child) = &field.child {
                // Unselected branches are pruned with everything below them.
                if !self.joins.includes(&child.name) {
                    continue;
                }
                let child_alias = self.joins.alias_for(&child.name).unwrap_or(child.table_alias.as_str());
                self.render_node(child, child_alias);
                continue;
            }

            self.write_column(alias, &field.column, &node.path_prefix);
        }
    }

    fn write_column(&mut self, alias: &str, column: &str, path_prefix: &str) {
        let result = if path_prefix.is_empty() {
            write!(self.buf, "{alias}.{column}{SEPARATOR}")
        } else {
            write!(self.buf, "{alias}.{column} AS \"{path_prefix}.{column}\"{SEPARATOR}")
        };

        if let Err(e) = result {
            self.report(e, column);
        }
    }

    fn report(&self, err: std::fmt::Error, text: &str) {
        if self.debug {
            tracing::warn!(error = %err, column = text, "failed to write column to buffer");
        }
    }
}

/// Render `root` into a fresh string, trailing separator included.
pub fn render(root: &SchemaNode, root_alias: &str, joins: &JoinSet<'_>) -> String {
    let mut buf = String::with_capacity(256);
    ColumnWriter::new(&mut buf, joins).render(root, root_alias);
    buf
}
