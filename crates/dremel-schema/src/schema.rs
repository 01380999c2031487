//! Nested schemas and their flattening into ordered leaf fields.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::{Field, FieldPath, Mode, SchemaError};

/// A node of a nested schema: either a leaf or a group of child nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Leaf {
        name: String,
        mode: Mode,
    },
    Group {
        name: String,
        mode: Mode,
        children: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    pub fn leaf(name: impl Into<String>, mode: Mode) -> Self {
        SchemaNode::Leaf {
            name: name.into(),
            mode,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        SchemaNode::leaf(name, Mode::Required)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        SchemaNode::leaf(name, Mode::Optional)
    }

    pub fn repeated(name: impl Into<String>) -> Self {
        SchemaNode::leaf(name, Mode::Repeated)
    }

    pub fn group(name: impl Into<String>, mode: Mode, children: Vec<SchemaNode>) -> Self {
        SchemaNode::Group {
            name: name.into(),
            mode,
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Leaf { name, .. } | SchemaNode::Group { name, .. } => name,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            SchemaNode::Leaf { mode, .. } | SchemaNode::Group { mode, .. } => *mode,
        }
    }

    /// Children of a group; empty for leaves.
    pub fn children(&self) -> &[SchemaNode] {
        match self {
            SchemaNode::Leaf { .. } => &[],
            SchemaNode::Group { children, .. } => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, SchemaNode::Leaf { .. })
    }

    fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidDocument("field must be an object".into()))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::InvalidDocument("field is missing a \"name\"".into()))?;
        let mode = match obj.get("mode") {
            None => Mode::Required,
            Some(Value::String(mode)) => mode.parse()?,
            Some(other) => {
                return Err(SchemaError::InvalidDocument(format!(
                    "mode of {} must be a string, got {}",
                    name, other
                )));
            }
        };
        match obj.get("fields") {
            None => Ok(SchemaNode::leaf(name, mode)),
            Some(fields) => Ok(SchemaNode::group(name, mode, nodes_from_json(fields)?)),
        }
    }
}

/// A nested schema together with its flattened leaf fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    children: Vec<SchemaNode>,
    fields: Vec<Field>,
}

impl Schema {
    /// Validate a schema tree and flatten it into leaf fields in pre-order.
    pub fn new(name: impl Into<String>, children: Vec<SchemaNode>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut fields = Vec::new();
        flatten(&children, &FieldPath::root(), &mut Vec::new(), &mut fields)?;
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        debug!(schema = %name, fields = fields.len(), "flattened schema");
        Ok(Schema {
            name,
            children,
            fields,
        })
    }

    /// Parse a schema document:
    /// `{"name": "...", "fields": [{"name": "...", "mode": "...", "fields": [...]}]}`.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidDocument("schema must be an object".into()))?;
        let name = obj.get("name").and_then(Value::as_str).unwrap_or("root");
        let fields = obj
            .get("fields")
            .ok_or_else(|| SchemaError::InvalidDocument("schema is missing \"fields\"".into()))?;
        Schema::new(name, nodes_from_json(fields)?)
    }

    /// Parse a schema document from JSON text.
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| SchemaError::InvalidDocument(e.to_string()))?;
        Schema::from_json(&value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level schema nodes.
    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    /// Leaf fields in canonical (pre-order) traversal order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

fn nodes_from_json(value: &Value) -> Result<Vec<SchemaNode>, SchemaError> {
    value
        .as_array()
        .ok_or_else(|| SchemaError::InvalidDocument("\"fields\" must be an array".into()))?
        .iter()
        .map(SchemaNode::from_json)
        .collect()
}

fn flatten(
    nodes: &[SchemaNode],
    parent: &FieldPath,
    modes: &mut Vec<Mode>,
    out: &mut Vec<Field>,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for node in nodes {
        let name = node.name();
        if name.is_empty() || name.contains('.') {
            return Err(SchemaError::InvalidName(name.to_string()));
        }
        let path = parent.child(name);
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateName { path });
        }

        modes.push(node.mode());
        match node {
            SchemaNode::Leaf { .. } => out.push(Field::new(path, modes.clone())?),
            SchemaNode::Group { children, .. } => {
                if children.is_empty() {
                    return Err(SchemaError::EmptyGroup { path });
                }
                flatten(children, &path, modes, out)?;
            }
        }
        modes.pop();
    }
    Ok(())
}
