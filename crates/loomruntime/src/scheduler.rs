//! Run-time graph scheduling: dependency closure for partial runs and
//! Kahn's-algorithm leveling for barrier-synchronized parallel execution.

use loomcore::{Edge, Node, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Every node needed to produce valid inputs for `targets`: the targets
/// plus all transitive upstream producers, found by walking edges backward.
///
/// An empty target set means a full run and yields every node. Bounded by
/// the visited set, so it terminates even on malformed graphs.
pub fn dependency_closure(
    nodes: &[Node],
    edges: &[Edge],
    targets: &[NodeId],
) -> HashSet<NodeId> {
    if targets.is_empty() {
        return nodes.iter().map(|n| n.id.clone()).collect();
    }

    let mut dependencies: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        dependencies
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let mut closure: HashSet<NodeId> = targets.iter().cloned().collect();
    let mut queue: VecDeque<&str> = targets.iter().map(String::as_str).collect();

    while let Some(node_id) = queue.pop_front() {
        for dep in dependencies.get(node_id).map(Vec::as_slice).unwrap_or(&[]) {
            if closure.insert((*dep).to_string()) {
                queue.push_back(dep);
            }
        }
    }

    closure
}

/// Restrict a graph to the dependency closure of `targets`, keeping only
/// edges with both endpoints inside it so the leveler sees a well-formed
/// induced subgraph
pub fn filter_to_closure(
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    targets: &[NodeId],
) -> (Vec<Node>, Vec<Edge>) {
    let keep = dependency_closure(&nodes, &edges, targets);
    let nodes: Vec<Node> = nodes
        .into_iter()
        .filter(|n| keep.contains(&n.id))
        .collect();
    let edges: Vec<Edge> = edges
        .into_iter()
        .filter(|e| keep.contains(&e.source) && keep.contains(&e.target))
        .collect();
    (nodes, edges)
}

/// Order nodes into levels via Kahn's algorithm.
///
/// Level 0 holds every zero-in-degree node; scheduling a node decrements
/// each successor's remaining-in-degree counter, and a node graduates into
/// the next level exactly when its counter reaches zero. Assuming the input
/// is acyclic (guaranteed upstream by the cycle validator), every node
/// appears exactly once and for every edge (u,v) the level of u precedes
/// the level of v. Intra-level order is insertion order and carries no
/// guarantee: level members are causally independent.
pub fn levelize(nodes: &[Node], edges: &[Edge]) -> Vec<Vec<Node>> {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::new();

    for node in nodes {
        let idx = graph.add_node(node.id.clone());
        index_of.insert(node.id.as_str(), idx);
    }
    for edge in edges {
        if let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    let node_by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut remaining: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    // node_indices iterates in insertion order, so level 0 follows the
    // order nodes were listed in
    let mut frontier: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|idx| remaining[idx] == 0)
        .collect();

    let mut levels: Vec<Vec<Node>> = Vec::new();

    while !frontier.is_empty() {
        let mut level: Vec<Node> = Vec::with_capacity(frontier.len());
        let mut next: Vec<NodeIndex> = Vec::new();

        for idx in frontier {
            if let Some(node) = node_by_id.get(graph[idx].as_str()) {
                level.push((*node).clone());
            }
            for successor in graph.neighbors_directed(idx, Direction::Outgoing) {
                let counter = remaining.entry(successor).or_insert(0);
                *counter = counter.saturating_sub(1);
                if *counter == 0 {
                    next.push(successor);
                }
            }
        }

        if !level.is_empty() {
            levels.push(level);
        }
        frontier = next;
    }

    levels
}
