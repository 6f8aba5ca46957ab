/// Index of a [`Node`] within its entry's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

/// The polymorphic payload of a handler node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain templated SQL, holding `#name#`, `#name.field#` and
    /// `@table_X@` placeholders.
    Fragment(String),
    /// Rendered when the guard expression holds against the scope.
    If {
        /// The raw guard expression, such as `a == 1`.
        guard: String,
    },
    /// Rendered when the variable is present in the scope.
    IfNotNil {
        /// The variable name checked for presence.
        name: String,
    },
    /// A loop over a sequence value.
    Range {
        /// The name of the collection variable.
        source: String,
        /// The per-iteration alias pushed onto the scope.
        alias: String,
        /// Literal emitted before the joined iterations.
        left: String,
        /// Literal emitted after the joined iterations.
        right: String,
    },
    /// Assembles a ` SET ` clause from its children.
    Set,
    /// Assembles a ` WHERE ` clause from its children.
    Where,
}

/// A handler node: a kind plus the children it renders, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

/// Flat storage for the handler nodes of one entry.
///
/// Nodes reference each other by [`NodeId`]; parent/child edges are
/// recorded once at compile time and never change afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    /// Append a childless node, returning its id.
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: vec![],
        });

        id
    }

    /// Record `child` as the next child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Access a node by id.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// One compiled SQL entry: a forest of handler nodes.
///
/// Entries are built once during the compile phase and never mutated
/// afterwards, so a single `Entry` may be rendered concurrently by any
/// number of callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The id this entry is registered under.
    pub name: String,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) arena: Arena,
}

impl Entry {
    /// The top-level nodes of this entry, in source order.
    pub(crate) fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Access a node by id.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }
}
