//! The opening tree: a rooted, ordered, multi-child database of move records
//! with free-text annotations. Lines are keyed by move sequence, not by board
//! position: two identical (from, to) pairs live in different nodes when they
//! were reached along different paths.
//!
//! Nodes live in an index arena. Parent links are navigation-only; ownership
//! is the arena's, and nodes are never deleted.

use std::fmt;

use anyhow::bail;

use crate::chess::core::Move;

pub mod codec;
pub mod store;

/// Handle into the repertoire arena. Stable for the lifetime of the tree
/// since nodes are never removed.
pub type NodeIndex = usize;

/// The synthetic root: it carries no move and owns the list of first moves.
pub const ROOT: NodeIndex = 0;

// This is a special value that is used to indicate that the node has no
// parent, i.e. it is the root.
const NO_PARENT: NodeIndex = usize::MAX;

#[derive(Debug)]
struct Node {
    /// `None` only at the root.
    mv: Option<Move>,
    description: String,
    parent: NodeIndex,
    /// Insertion (chronological) order, which is also the order the moves are
    /// listed in and persisted in.
    children: Vec<NodeIndex>,
}

/// The whole opening tree; the unit of persistence.
#[derive(Debug)]
pub struct Repertoire {
    nodes: Vec<Node>,
}

impl Repertoire {
    /// Creates a tree containing only an empty root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                mv: None,
                description: String::new(),
                parent: NO_PARENT,
                children: Vec::new(),
            }],
        }
    }

    /// Looks up `mv` among `cursor`'s children in insertion order, appending
    /// a new node with an empty description when there is no exact match.
    /// Returns the matching or freshly created node and whether it was
    /// created (callers persist the tree only in that case).
    pub fn record(&mut self, cursor: NodeIndex, mv: Move) -> (NodeIndex, bool) {
        if let Some(existing) = self
            .children(cursor)
            .find(|&child| self.nodes[child].mv == Some(mv))
        {
            return (existing, false);
        }
        let index = self.add_child(cursor, mv, String::new());
        (index, true)
    }

    pub(crate) fn add_child(
        &mut self,
        parent: NodeIndex,
        mv: Move,
        description: String,
    ) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(Node {
            mv: Some(mv),
            description,
            parent,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    /// The node's parent; `None` at the root.
    #[must_use]
    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        match self.nodes[node].parent {
            NO_PARENT => None,
            parent => Some(parent),
        }
    }

    /// The move this node records; `None` at the root.
    #[must_use]
    pub fn mv(&self, node: NodeIndex) -> Option<Move> {
        self.nodes[node].mv
    }

    /// The node's children in insertion order.
    pub fn children(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[node].children.iter().copied()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn description(&self, node: NodeIndex) -> &str {
        &self.nodes[node].description
    }

    /// Replaces a node's annotation in place.
    ///
    /// # Errors
    ///
    /// NUL terminates descriptions in the persisted grammar, so text
    /// containing one is rejected.
    pub fn set_description(&mut self, node: NodeIndex, text: &str) -> anyhow::Result<()> {
        if text.bytes().any(|byte| byte == 0) {
            bail!("description must not contain NUL bytes");
        }
        self.nodes[node].description = text.to_owned();
        Ok(())
    }

    /// Number of nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of moves from the root to `node`.
    #[must_use]
    pub fn depth(&self, node: NodeIndex) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }
}

impl Default for Repertoire {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Repertoire {
    /// Dumps the tree as an indented move list, mostly for debugging output
    /// in tests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn visit(
            tree: &Repertoire,
            node: NodeIndex,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            if let Some(mv) = tree.mv(node) {
                writeln!(f, "{:indent$}{mv}", "", indent = depth * 2)?;
            }
            for child in tree.children(node) {
                visit(tree, child, depth + 1, f)?;
            }
            Ok(())
        }
        visit(self, ROOT, 0, f)
    }
}
