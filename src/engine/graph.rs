// src/engine/graph.rs

//! The build graph: which nodes run, and which must finish before others
//! start.
//!
//! Graphs are described as a [`Composition`] of `series(..)` and
//! `parallel(..)` groups and lowered into a `petgraph` DAG. A node depends
//! on every exit node of the group sequenced before it; nodes with no path
//! between them run in parallel.

use std::collections::BTreeSet;
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{AssetflowError, Result};
use crate::types::AssetClass;

/// One unit of work in the build graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    /// Run the transform task of one asset class over all its inputs.
    Task(AssetClass),
    /// Watch the project and re-run tasks on change. Never completes on its
    /// own.
    WatchLoop,
    /// Serve the output directory with live reload. Never completes on its
    /// own.
    DevServer,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Task(class) => write!(f, "{class}"),
            Node::WatchLoop => f.write_str("watch"),
            Node::DevServer => f.write_str("serve"),
        }
    }
}

/// Declarative shape of a build graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Node(Node),
    /// Each item starts only after the previous one has finished.
    Series(Vec<Composition>),
    /// Items have no ordering between them.
    Parallel(Vec<Composition>),
}

impl From<Node> for Composition {
    fn from(node: Node) -> Self {
        Composition::Node(node)
    }
}

pub fn series<I, C>(items: I) -> Composition
where
    I: IntoIterator<Item = C>,
    C: Into<Composition>,
{
    Composition::Series(items.into_iter().map(Into::into).collect())
}

pub fn parallel<I, C>(items: I) -> Composition
where
    I: IntoIterator<Item = C>,
    C: Into<Composition>,
{
    Composition::Parallel(items.into_iter().map(Into::into).collect())
}

/// All four transform tasks, unordered.
pub fn all_tasks() -> Composition {
    parallel(AssetClass::ALL.map(Node::Task))
}

/// Initial build, then watch and serve side by side.
pub fn watch_mode() -> Composition {
    series([all_tasks(), parallel([Node::WatchLoop, Node::DevServer])])
}

/// Initial build only.
pub fn build_once() -> Composition {
    all_tasks()
}

/// Validated, immutable build graph.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    graph: DiGraphMap<Node, ()>,
    order: Vec<Node>,
}

impl BuildGraph {
    /// Lower a composition into a DAG and check it for cycles.
    ///
    /// A node appearing twice is the same node; sequencing it against itself
    /// (e.g. `series(a, b, a)`) is reported as a cycle.
    pub fn from_composition(composition: &Composition) -> Result<Self> {
        let mut graph: DiGraphMap<Node, ()> = DiGraphMap::new();
        lower(&mut graph, composition);

        let order = toposort(&graph, None).map_err(|cycle| {
            AssetflowError::GraphCycle(format!("node `{}` depends on itself", cycle.node_id()))
        })?;

        Ok(Self { graph, order })
    }

    /// Every node, dependencies before dependents.
    pub fn nodes(&self) -> &[Node] {
        &self.order
    }

    pub fn contains(&self, node: Node) -> bool {
        self.graph.contains_node(node)
    }

    /// Nodes that must finish before `node` may start.
    pub fn predecessors(&self, node: Node) -> Vec<Node> {
        self.sorted_neighbors(node, Direction::Incoming)
    }

    /// Nodes that wait (directly) on `node`.
    pub fn successors(&self, node: Node) -> Vec<Node> {
        self.sorted_neighbors(node, Direction::Outgoing)
    }

    /// One line per node, e.g. `watch <- [style, script, image, template]`.
    pub fn describe(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|&node| {
                let preds = self.predecessors(node);
                if preds.is_empty() {
                    node.to_string()
                } else {
                    let names: Vec<String> = preds.iter().map(Node::to_string).collect();
                    format!("{node} <- [{}]", names.join(", "))
                }
            })
            .collect()
    }

    fn sorted_neighbors(&self, node: Node, dir: Direction) -> Vec<Node> {
        if !self.graph.contains_node(node) {
            return Vec::new();
        }
        let set: BTreeSet<Node> = self.graph.neighbors_directed(node, dir).collect();
        set.into_iter().collect()
    }
}

/// Add `composition` to `graph`; returns its (entry, exit) nodes.
fn lower(graph: &mut DiGraphMap<Node, ()>, composition: &Composition) -> (Vec<Node>, Vec<Node>) {
    match composition {
        Composition::Node(node) => {
            graph.add_node(*node);
            (vec![*node], vec![*node])
        }
        Composition::Parallel(items) => {
            let mut entries = Vec::new();
            let mut exits = Vec::new();
            for item in items {
                let (e, x) = lower(graph, item);
                entries.extend(e);
                exits.extend(x);
            }
            (entries, exits)
        }
        Composition::Series(items) => {
            let mut entries: Vec<Node> = Vec::new();
            let mut previous_exits: Vec<Node> = Vec::new();
            for item in items {
                let (e, x) = lower(graph, item);
                if e.is_empty() {
                    continue;
                }
                if entries.is_empty() {
                    entries = e.clone();
                }
                for &from in &previous_exits {
                    for &to in &e {
                        graph.add_edge(from, to, ());
                    }
                }
                previous_exits = x;
            }
            (entries, previous_exits)
        }
    }
}
