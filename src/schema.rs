//! Normalized column/nesting structure of one model.

use serde::Serialize;

/// Memoized description of a model, as built by the introspector.
///
/// Trees are immutable once cached. Per-call aliasing is applied while
/// rendering and never written back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaNode {
    /// Bare type name; matched by join directives.
    pub name: String,
    /// Default table alias used to prefix leaf columns.
    pub table_alias: String,
    /// Dotted chain of field tags from the root down to this node.
    /// Empty at the root.
    pub path_prefix: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

/// One surviving field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Column name for a leaf; alias and path segment for a nested model.
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<SchemaNode>,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, table_alias: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_alias: table_alias.into(),
            path_prefix: path_prefix.into(),
            fields: Vec::new(),
        }
    }

    /// True at the root of a tree.
    pub fn is_root(&self) -> bool {
        self.path_prefix.is_empty()
    }

    /// Number of leaf columns in this node and every nested node.
    pub fn leaf_count(&self) -> usize {
        self.fields
            .iter()
            .map(|field| match &field.child {
                Some(child) => child.leaf_count(),
                None => 1,
            })
            .sum()
    }

    /// Depth-first walk over this node and all nested nodes.
    pub fn walk(&self, visit: &mut impl FnMut(&SchemaNode)) {
        visit(self);
        for child in self.fields.iter().filter_map(|f| f.child.as_ref()) {
            child.walk(visit);
        }
    }
}

impl FieldDescriptor {
    pub fn leaf(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            child: None,
        }
    }

    pub fn nested(column: impl Into<String>, child: SchemaNode) -> Self {
        Self {
            column: column.into(),
            child: Some(child),
        }
    }

    pub fn is_nested(&self) -> bool {
        self.child.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_tree() -> SchemaNode {
        let mut address = SchemaNode::new("Address", "addr", "addr");
        address.fields.push(FieldDescriptor::leaf("id"));
        address.fields.push(FieldDescriptor::leaf("city"));

        let mut user = SchemaNode::new("User", "u", "");
        user.fields.push(FieldDescriptor::leaf("id"));
        user.fields.push(FieldDescriptor::nested("addr", address));
        user
    }

    #[test]
    fn test_leaf_count() {
        assert_eq!(user_tree().leaf_count(), 3);
    }

    #[test]
    fn test_walk_order() {
        let mut names = Vec::new();
        user_tree().walk(&mut |node| names.push(node.name.clone()));
        assert_eq!(names, vec!["User", "Address"]);
    }

    #[test]
    fn test_root_detection() {
        let tree = user_tree();
        assert!(tree.is_root());
        assert!(!tree.fields[1].child.as_ref().unwrap().is_root());
        assert!(tree.fields[1].is_nested());
    }
}
