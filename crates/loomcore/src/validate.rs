//! Edit-time graph validation: cycle detection and port type compatibility.
//!
//! Both checks gate interactive edge creation; neither runs during
//! execution, where the graph is assumed already valid.

use crate::schema::{infer_output_type, input_ports, output_ports, PortType};
use crate::{Edge, Node};
use std::collections::{HashMap, HashSet};

/// Returns true when the edge set contains no directed cycle.
///
/// Depth-first search with an explicit stack; a back edge to a node still
/// on the traversal stack signals a cycle. Self-loops count as cycles and
/// every connected component is visited. Nodes that appear only as edge
/// targets (or not at all) cannot start a cycle, so the walk seeds from
/// edge sources, exactly covering disconnected graphs.
pub fn is_acyclic(edges: &[Edge]) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let starts: Vec<&str> = adjacency.keys().copied().collect();

    for start in starts {
        if visited.contains(start) {
            continue;
        }
        visited.insert(start);
        on_stack.insert(start);
        // (node, index of the next neighbor to explore)
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let neighbors = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if frame.1 < neighbors.len() {
                let neighbor = neighbors[frame.1];
                frame.1 += 1;

                if on_stack.contains(neighbor) {
                    return false;
                }
                if visited.insert(neighbor) {
                    on_stack.insert(neighbor);
                    stack.push((neighbor, 0));
                }
            } else {
                on_stack.remove(node);
                stack.pop();
            }
        }
    }

    true
}

/// Returns true when adding `candidate` to `edges` would close a cycle.
///
/// Walks forward from the candidate's target; if the candidate's source is
/// reachable, the new edge completes a loop.
pub fn creates_cycle(candidate: &Edge, edges: &[Edge]) -> bool {
    if candidate.source == candidate.target {
        return true;
    }

    let mut stack: Vec<&str> = vec![candidate.target.as_str()];
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if current == candidate.source {
            return true;
        }
        for edge in edges.iter().filter(|e| e.source == current) {
            stack.push(edge.target.as_str());
        }
    }

    false
}

/// Port type compatibility for a proposed connection.
///
/// Declared types must match, except a target of type `any` accepts
/// everything. When either side's type cannot be determined the check is
/// permissive; the cycle check independently vetoes structurally invalid
/// connections.
pub fn can_connect(
    source: &Node,
    source_handle: Option<&str>,
    target: &Node,
    target_handle: Option<&str>,
) -> bool {
    let source_type = source_handle
        .and_then(|handle| {
            output_ports(&source.kind)
                .iter()
                .find(|p| p.id == handle)
                .map(|p| p.port_type)
        })
        .or_else(|| match source_handle {
            Some("output") => infer_output_type(&source.kind),
            _ => None,
        });

    let target_type = target_handle.and_then(|handle| {
        input_ports(&target.kind)
            .iter()
            .find(|p| p.id == handle)
            .map(|p| p.port_type)
    });

    match (source_type, target_type) {
        (_, Some(PortType::Any)) => true,
        (Some(s), Some(t)) => s == t,
        // Schema unknown on either side: allow, and let the cycle check veto
        _ => true,
    }
}
