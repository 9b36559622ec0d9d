use crate::{Bond, MoleculeGraph};
use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, EdgeReference, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use std::collections::HashSet;

/// Ring membership of a molecular graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingInfo {
    /// Every bond that lies on at least one cycle.
    pub ring_bonds: HashSet<EdgeIndex>,
    /// The smallest cycle through each ring bond, deduplicated and ordered by size.
    /// Each ring lists its atoms in walking order.
    pub rings: Vec<Vec<NodeIndex>>,
}

/// Find the ring bonds and smallest rings of `graph`.
///
/// A bond is a ring bond iff its endpoints stay connected once it is removed;
/// the shortest such detour closes the smallest ring through the bond.
pub fn find_rings(graph: &MoleculeGraph) -> RingInfo {
    let mut info = RingInfo::default();
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();

    for edge in graph.edge_references() {
        let (a, b, id) = (edge.source(), edge.target(), edge.id());
        let without = EdgeFiltered::from_fn(graph, move |e: EdgeReference<'_, Bond>| e.id() != id);
        if let Some((_, path)) = astar(&without, a, |n| n == b, |_| 1usize, |_| 0usize) {
            info.ring_bonds.insert(id);
            let mut key = path.clone();
            key.sort();
            if seen.insert(key) {
                info.rings.push(path);
            }
        }
    }

    info.rings.sort_by_key(|ring| ring.len());
    info
}

/// The bonds walked around `ring`, including the closing one.
pub fn ring_edges(graph: &MoleculeGraph, ring: &[NodeIndex]) -> Vec<EdgeIndex> {
    (0..ring.len())
        .filter_map(|k| graph.find_edge(ring[k], ring[(k + 1) % ring.len()]))
        .collect()
}
