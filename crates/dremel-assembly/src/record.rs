//! The record tree produced by assembly.
//!
//! Nodes live in an arena and refer to their parent by index, so the tree
//! has a single owner and parent links never keep anything alive.

use std::collections::BTreeMap;
use std::fmt;

use dremel_schema::{Field, FieldPath, Mode};
use serde_json::{Map, Value};

use crate::Inconsistency;

/// Index of a node in its [`RecordTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A named node: a group with children, or a leaf holding values.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<V> {
    name: String,
    mode: Mode,
    leaf: bool,
    parent: Option<NodeId>,
    children: BTreeMap<String, Vec<NodeId>>,
    value: Option<V>,
    values: Option<Vec<V>>,
}

impl<V> Node<V> {
    fn new(name: String, mode: Mode, leaf: bool, parent: Option<NodeId>) -> Self {
        Node {
            name,
            mode,
            leaf,
            parent,
            children: BTreeMap::new(),
            value: None,
            values: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Scalar slot of a required or optional leaf.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Ordered values of a repeated leaf.
    pub fn values(&self) -> Option<&[V]> {
        self.values.as_deref()
    }

    /// Child names with their instances, ordered by name.
    pub fn children(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.children
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// All instances of the child called `name`, in record order.
    pub fn instances(&self, name: &str) -> &[NodeId] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn is_repeated_group(&self) -> bool {
        self.mode == Mode::Repeated && !self.leaf
    }
}

/// An assembled record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTree<V> {
    nodes: Vec<Node<V>>,
}

impl<V> RecordTree<V> {
    /// A tree holding only its root.
    pub fn new(root_name: impl Into<String>) -> Self {
        RecordTree {
            nodes: vec![Node::new(root_name.into(), Mode::Required, false, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Path of segment names from the root to `id`.
    pub fn path(&self, id: NodeId) -> FieldPath {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            segments.push(self.node(current).name.clone());
            current = parent;
        }
        segments.reverse();
        FieldPath::new(segments)
    }

    /// Find a node by dotted path. `name[n]` selects the n-th instance of a
    /// repeated group; a bare name selects the first.
    pub fn get(&self, path: &str) -> Option<&Node<V>> {
        let mut current = self.root();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (name, index) = split_index(segment)?;
            current = *self.node(current).instances(name).get(index)?;
        }
        Some(self.node(current))
    }

    /// Walk up `depth(previous) - depth(lca)` parents, closing every level
    /// opened for `previous` that `lca` does not share.
    pub fn ascend_to(
        &self,
        node: NodeId,
        previous: &FieldPath,
        lca: &FieldPath,
    ) -> Result<NodeId, Inconsistency> {
        if !lca.is_ancestor_of(previous) {
            return Err(Inconsistency::NotAnAncestor {
                ancestor: lca.clone(),
                path: previous.clone(),
            });
        }
        let mut node = node;
        for _ in lca.depth()..previous.depth() {
            node = self.node(node).parent.ok_or(Inconsistency::AboveRoot)?;
        }
        Ok(node)
    }

    /// Ascend from `previous` to `lca`, then open the segments of `target`
    /// from `depth(lca)` down to `depth`.
    ///
    /// `depth` is normally `target.depth()`; null cells may stop short of the
    /// leaf. Entering a repeated group that already exists under the current
    /// node starts a new instance of it; every other segment is reused when
    /// present.
    pub fn descend_to(
        &mut self,
        node: NodeId,
        target: &Field,
        depth: usize,
        previous: &FieldPath,
        lca: &FieldPath,
    ) -> Result<NodeId, Inconsistency> {
        let depth = depth.min(target.depth());
        if lca.depth() > depth || !lca.is_ancestor_of(target.path()) {
            return Err(Inconsistency::NotAnAncestor {
                ancestor: lca.clone(),
                path: target.path().prefix(depth),
            });
        }

        let mut node = self.ascend_to(node, previous, lca)?;
        let segments = target.path().segments();
        for level in lca.depth()..depth {
            let leaf = level + 1 == target.depth();
            node = self.enter(node, &segments[level], target.modes()[level], leaf);
        }
        Ok(node)
    }

    /// Store a leaf value: appended for repeated leaves, the scalar slot
    /// otherwise. A scalar slot is written at most once.
    pub fn append(&mut self, node: NodeId, value: V) -> Result<(), Inconsistency> {
        let node = &mut self.nodes[node.0];
        if node.mode == Mode::Repeated {
            node.values.get_or_insert_with(Vec::new).push(value);
            return Ok(());
        }
        if node.value.is_some() {
            return Err(Inconsistency::ScalarOverwrite {
                name: node.name.clone(),
            });
        }
        node.value = Some(value);
        Ok(())
    }

    fn enter(&mut self, parent: NodeId, name: &str, mode: Mode, leaf: bool) -> NodeId {
        let existing = self.node(parent).instances(name).last().copied();
        if let Some(id) = existing
            && !self.node(id).is_repeated_group()
        {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(name.to_string(), mode, leaf, Some(parent)));
        self.nodes[parent.0]
            .children
            .entry(name.to_string())
            .or_default()
            .push(id);
        id
    }
}

impl<V: Clone + Into<Value>> RecordTree<V> {
    /// Convert to JSON: groups become objects, repeated groups arrays of
    /// objects, repeated leaves arrays. Empty optional leaves are `null`.
    pub fn to_json(&self) -> Value {
        self.node_json(self.root())
    }

    fn node_json(&self, id: NodeId) -> Value {
        let node = self.node(id);
        if node.leaf {
            return match (&node.values, &node.value) {
                (Some(values), _) => Value::Array(values.iter().cloned().map(Into::into).collect()),
                (None, Some(value)) => value.clone().into(),
                (None, None) if node.mode == Mode::Repeated => Value::Array(Vec::new()),
                (None, None) => Value::Null,
            };
        }

        let mut map = Map::new();
        for (name, ids) in &node.children {
            let repeated_group = ids
                .first()
                .is_some_and(|id| self.node(*id).is_repeated_group());
            let value = match ids.as_slice() {
                [only] if !repeated_group => self.node_json(*only),
                _ => Value::Array(ids.iter().map(|id| self.node_json(*id)).collect()),
            };
            map.insert(name.clone(), value);
        }
        Value::Object(map)
    }
}

impl<V: fmt::Display> RecordTree<V> {
    /// Indented text listing, one line per node.
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        label: &str,
        indent: usize,
    ) -> fmt::Result {
        let node = self.node(id);
        write!(f, "{:width$}{}", "", label, width = indent * 2)?;
        if !node.leaf {
            writeln!(f)?;
            for (name, ids) in &node.children {
                for (index, child) in ids.iter().enumerate() {
                    if self.node(*child).is_repeated_group() {
                        self.write_node(f, *child, &format!("{}[{}]", name, index), indent + 1)?;
                    } else {
                        self.write_node(f, *child, name, indent + 1)?;
                    }
                }
            }
            return Ok(());
        }

        match (&node.values, &node.value) {
            (Some(values), _) => {
                write!(f, ": [")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                writeln!(f, "]")
            }
            (None, Some(value)) => writeln!(f, ": {}", value),
            (None, None) if node.mode == Mode::Repeated => writeln!(f, ": []"),
            (None, None) => writeln!(f, ": null"),
        }
    }
}

impl<V: fmt::Display> fmt::Display for RecordTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root(), &self.node(self.root()).name, 0)
    }
}

fn split_index(segment: &str) -> Option<(&str, usize)> {
    match segment.strip_suffix(']').and_then(|s| s.split_once('[')) {
        Some((name, index)) => Some((name, index.parse().ok()?)),
        None => Some((segment, 0)),
    }
}
