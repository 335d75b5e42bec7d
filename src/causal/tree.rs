//! Cause tree arena.
//!
//! Nodes live in a flat arena indexed by [`NodeId`]; a side map from
//! expression identity to id gives O(1) attach and lookup. The root is a
//! sentinel carrying no expression, with real expressions hanging below
//! it. Children are owned ids only; there are no parent pointers.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::causal::expression::{ExpressionIdentity, SuspiciousExpression};

/// Arena index of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One arena slot: the expression snapshot plus owned children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseNode {
    /// `None` only for the sentinel root.
    pub expression: Option<SuspiciousExpression>,
    pub children: Vec<NodeId>,
}

/// Deduplicated tree of cause expressions rooted at a sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseTree {
    nodes: Vec<CauseNode>,
    #[serde(skip)]
    by_identity: HashMap<ExpressionIdentity, NodeId>,
}

impl Default for CauseTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CauseTree {
    /// Tree holding only the sentinel root.
    pub fn new() -> Self {
        Self {
            nodes: vec![CauseNode {
                expression: None,
                children: Vec::new(),
            }],
            by_identity: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attach an expression under `parent`.
    ///
    /// When an expression with the same identity is already in the tree,
    /// no node is created and the existing id is returned; the first
    /// occurrence keeps its place.
    pub fn attach(&mut self, parent: NodeId, expression: SuspiciousExpression) -> NodeId {
        let identity = expression.identity();
        if let Some(&existing) = self.by_identity.get(&identity) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(CauseNode {
            expression: Some(expression),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.by_identity.insert(identity, id);
        id
    }

    /// Whether an expression with this identity is already in the tree.
    pub fn contains(&self, identity: &ExpressionIdentity) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// Node registered for an identity, if any.
    pub fn node_by_identity(&self, identity: &ExpressionIdentity) -> Option<NodeId> {
        self.by_identity.get(identity).copied()
    }

    /// Id for an identity the caller knows must be present.
    ///
    /// Panics when it is not: the explorer only attaches children to an
    /// expression it previously inserted, so a miss means the tree is
    /// corrupt and continuing would make it worse.
    pub fn expect_node(&self, identity: &ExpressionIdentity) -> NodeId {
        match self.by_identity.get(identity) {
            Some(&id) => id,
            None => panic!(
                "no tree node for expression at {}:{} with value {:?}; attach out of sequence",
                identity.locate_method, identity.locate_line, identity.actual_value
            ),
        }
    }

    /// Expression stored at a node; `None` for the sentinel root.
    pub fn expression(&self, id: NodeId) -> Option<&SuspiciousExpression> {
        self.nodes[id.0].expression.as_ref()
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of real expressions, excluding the sentinel.
    pub fn expression_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// True when only the sentinel exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// ASCII rendering with box-drawing prefixes, one expression per
    /// line, starting from the root's children.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let top = self.children_of(self.root());
        for (i, child) in top.iter().enumerate() {
            self.render_node(*child, "", i + 1 == top.len(), &mut out);
        }
        out
    }

    fn render_node(&self, id: NodeId, prefix: &str, is_last: bool, out: &mut String) {
        let connector = if is_last { "└── " } else { "├── " };
        if let Some(expr) = self.expression(id) {
            out.push_str(prefix);
            out.push_str(connector);
            out.push_str(&expr.to_string());
            out.push('\n');
        }
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let children = self.children_of(id);
        for (i, child) in children.iter().enumerate() {
            self.render_node(*child, &child_prefix, i + 1 == children.len(), out);
        }
    }

    /// Write the tree as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing cause tree {}", path.display()))?;
        Ok(())
    }

    /// Read a tree back from JSON and rebuild the identity index, which
    /// is not serialized.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading cause tree {}", path.display()))?;
        let mut tree: CauseTree = serde_json::from_str(&content)
            .with_context(|| format!("parsing cause tree {}", path.display()))?;
        tree.rebuild_index();
        Ok(tree)
    }

    fn rebuild_index(&mut self) {
        self.by_identity = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                node.expression
                    .as_ref()
                    .map(|expr| (expr.identity(), NodeId(index)))
            })
            .collect();
    }
}
