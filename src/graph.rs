//! Graph definition and compilation.
//!
//! [`GraphBuilder`] accumulates nodes and edges with virtual
//! `Start`/`End` endpoints, then [`compile`](GraphBuilder::compile)
//! validates the topology and freezes it into an executable
//! [`App`](crate::app::App). Compilation performs no I/O; attaching a
//! checkpointer only records the handle.
//!
//! Validation enforces the structural invariants every pipeline relies on:
//! an entry edge from `Start`, unique node names, no edge touching an
//! unregistered node, every node reachable from `Start`, at least one path
//! to `End`, and an acyclic topology. The engine supports branching fan-out
//! structurally, though every pipeline instantiated in this crate is a
//! linear chain.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::app::App;
use crate::checkpoint::Checkpointer;
use crate::node::Node;
use crate::types::NodeKind;

/// Builder for workflow graphs.
///
/// # Examples
///
/// ```rust,no_run
/// use tutorloom::graph::GraphBuilder;
/// use tutorloom::types::NodeKind;
/// # use tutorloom::node::{Node, NodeContext, NodeError, NodePartial};
/// # use tutorloom::state::StateSnapshot;
/// # struct Step;
/// # #[async_trait::async_trait]
/// # impl Node for Step {
/// #     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodePartial, NodeError> {
/// #         Ok(NodePartial::default())
/// #     }
/// # }
///
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("step".into()), Step)
///     .add_edge(NodeKind::Start, NodeKind::Custom("step".into()))
///     .add_edge(NodeKind::Custom("step".into()), NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    duplicates: Vec<NodeKind>,
    interrupt_before: Vec<NodeKind>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            duplicates: Vec::new(),
            interrupt_before: Vec::new(),
            checkpointer: None,
        }
    }

    /// Register an executable node under a graph-unique name.
    ///
    /// Registering `Start` or `End` is ignored with a warning: the virtual
    /// endpoints carry no implementation. Re-registering an existing name
    /// is recorded and rejected at compile time.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(?id, "ignoring registration of virtual endpoint");
            }
            _ => {
                if self.nodes.contains_key(&id) {
                    self.duplicates.push(id);
                } else {
                    self.nodes.insert(id, Arc::new(node));
                }
            }
        }
        self
    }

    /// Add a directed edge. Edges from `Start` define the entry; edges to
    /// `End` define termination.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    /// Halt execution immediately before the given node, without invoking
    /// it. Used to peek a routing decision before a manual streaming call.
    #[must_use]
    pub fn with_interrupt_before(mut self, node: NodeKind) -> Self {
        self.interrupt_before.push(node);
        self
    }

    /// Attach a checkpoint store; state is persisted after every node.
    #[must_use]
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Validate the topology and freeze it into an executable [`App`].
    pub fn compile(self) -> Result<App, GraphCompileError> {
        if let Some(dup) = self.duplicates.first() {
            return Err(GraphCompileError::DuplicateNode { node: dup.clone() });
        }

        let entry = self
            .edges
            .get(&NodeKind::Start)
            .cloned()
            .unwrap_or_default();
        if entry.is_empty() {
            return Err(GraphCompileError::MissingEntry);
        }

        // Every edge endpoint must be a registered node or a virtual endpoint.
        for (from, targets) in &self.edges {
            if !from.is_start() && !from.is_end() && !self.nodes.contains_key(from) {
                return Err(GraphCompileError::UnknownNode { node: from.clone() });
            }
            for to in targets {
                if !to.is_start() && !to.is_end() && !self.nodes.contains_key(to) {
                    return Err(GraphCompileError::UnknownNode { node: to.clone() });
                }
            }
        }

        for node in &self.interrupt_before {
            if !self.nodes.contains_key(node) {
                return Err(GraphCompileError::UnknownInterrupt { node: node.clone() });
            }
        }

        self.check_reachability()?;
        self.check_acyclic()?;

        Ok(App::from_parts(
            self.nodes,
            self.edges,
            self.checkpointer,
            self.interrupt_before,
        ))
    }

    /// Every registered node must be reachable from `Start`, and `End`
    /// must be reachable at all.
    fn check_reachability(&self) -> Result<(), GraphCompileError> {
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
        let mut queue = vec![NodeKind::Start];
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(targets) = self.edges.get(&current) {
                queue.extend(targets.iter().cloned());
            }
        }

        for node in self.nodes.keys() {
            if !seen.contains(node) {
                return Err(GraphCompileError::UnreachableNode { node: node.clone() });
            }
        }
        if !seen.contains(&NodeKind::End) {
            return Err(GraphCompileError::NoTerminalPath);
        }
        Ok(())
    }

    /// Reject cyclic topologies; the walk assumes a DAG.
    fn check_acyclic(&self) -> Result<(), GraphCompileError> {
        #[derive(PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        fn visit(
            node: &NodeKind,
            edges: &FxHashMap<NodeKind, Vec<NodeKind>>,
            marks: &mut FxHashMap<NodeKind, Mark>,
        ) -> Result<(), GraphCompileError> {
            match marks.get(node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    return Err(GraphCompileError::CycleDetected { node: node.clone() });
                }
                None => {}
            }
            marks.insert(node.clone(), Mark::InProgress);
            if let Some(targets) = edges.get(node) {
                for target in targets {
                    visit(target, edges, marks)?;
                }
            }
            marks.insert(node.clone(), Mark::Done);
            Ok(())
        }

        let mut marks = FxHashMap::default();
        visit(&NodeKind::Start, &self.edges, &mut marks)
    }
}

/// Structural validation failures raised by [`GraphBuilder::compile`].
#[derive(Debug, Error, Diagnostic)]
pub enum GraphCompileError {
    /// No edge originates from `Start`.
    #[error("graph has no entry point: no edge from Start")]
    #[diagnostic(
        code(tutorloom::graph::missing_entry),
        help("Add an edge from NodeKind::Start to the first node.")
    )]
    MissingEntry,

    /// A node name was registered twice.
    #[error("duplicate node registration: {node}")]
    #[diagnostic(code(tutorloom::graph::duplicate_node))]
    DuplicateNode {
        /// The duplicated name.
        node: NodeKind,
    },

    /// An edge references a node that was never registered.
    #[error("edge references unknown node: {node}")]
    #[diagnostic(
        code(tutorloom::graph::unknown_node),
        help("Register the node with add_node before wiring edges to it.")
    )]
    UnknownNode {
        /// The unknown endpoint.
        node: NodeKind,
    },

    /// An interrupt-before entry names an unregistered node.
    #[error("interrupt-before references unknown node: {node}")]
    #[diagnostic(code(tutorloom::graph::unknown_interrupt))]
    UnknownInterrupt {
        /// The unknown name.
        node: NodeKind,
    },

    /// A registered node cannot be reached from `Start`.
    #[error("node unreachable from Start: {node}")]
    #[diagnostic(code(tutorloom::graph::unreachable_node))]
    UnreachableNode {
        /// The orphaned node.
        node: NodeKind,
    },

    /// No path from `Start` ever reaches `End`.
    #[error("graph has no path to End")]
    #[diagnostic(
        code(tutorloom::graph::no_terminal),
        help("Wire the last node to NodeKind::End.")
    )]
    NoTerminalPath,

    /// The edge set contains a cycle.
    #[error("cycle detected involving node: {node}")]
    #[diagnostic(code(tutorloom::graph::cycle))]
    CycleDetected {
        /// A node on the cycle.
        node: NodeKind,
    },
}
