mod aromaticity;
mod rings;

pub use rings::{find_rings, ring_edges, RingInfo};

use crate::{parse_smiles, Atom, Bond, MoleculeGraph, SmilesError};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

/// A molecular graph with hydrogens, rings and aromaticity perceived.
///
/// Explicit hydrogen atoms bonded to a heavy atom are folded into that atom's
/// hydrogen count, so apart from odd cases like `[H][H]` every node is a heavy atom.
#[derive(Debug, Clone)]
pub struct Molecule {
    graph: MoleculeGraph,
    rings: RingInfo,
}

impl Molecule {
    /// Parse and perceive a SMILES string.
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        Self::from_graph(parse_smiles(smiles)?)
    }

    /// Perceive a raw parsed graph: assign implicit hydrogens, fold explicit
    /// hydrogen atoms, find rings and apply the aromaticity model.
    pub fn from_graph(mut graph: MoleculeGraph) -> Result<Self, SmilesError> {
        assign_implicit_hydrogens(&mut graph)?;
        let mut graph = fold_explicit_hydrogens(graph);
        let rings = find_rings(&graph);
        aromaticity::perceive_aromaticity(&mut graph, &rings);

        for node in graph.node_indices() {
            let atom = &graph[node];
            if atom.aromatic && !graph.edges(node).any(|e| rings.ring_bonds.contains(&e.id())) {
                return Err(SmilesError::NonRingAromatic(node.index(), atom.element));
            }
        }

        Ok(Self { graph, rings })
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.graph
    }

    pub fn atom(&self, node: NodeIndex) -> &Atom {
        &self.graph[node]
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings.rings
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn heavy_atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices().filter(|&n| self.graph[n].is_heavy())
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.heavy_atoms().count()
    }

    /// Neighbors of `node` together with the bond joining them.
    pub fn neighbors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Bond)> + '_ {
        self.graph.edges(node).map(move |e| {
            let other = if e.source() == node { e.target() } else { e.source() };
            (other, *e.weight())
        })
    }

    /// Number of heavy-atom neighbors (the SMARTS `D` primitive).
    pub fn heavy_degree(&self, node: NodeIndex) -> usize {
        self.neighbors(node).filter(|&(n, _)| self.graph[n].is_heavy()).count()
    }

    /// Total connections including hydrogens (the SMARTS `X` primitive).
    pub fn total_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count() + self.graph[node].hydrogens as usize
    }

    pub fn is_ring_bond(&self, edge: EdgeIndex) -> bool {
        self.rings.ring_bonds.contains(&edge)
    }

    pub fn is_ring_atom(&self, node: NodeIndex) -> bool {
        self.graph.edges(node).any(|e| self.is_ring_bond(e.id()))
    }
}

/// Fill in hydrogens on organic-subset atoms written without brackets.
///
/// The atom takes the lowest default valence that accommodates its bonds. An
/// aromatic atom first reserves one unit for the π system, and gets no
/// hydrogens if that overflows its lowest valence.
fn assign_implicit_hydrogens(graph: &mut MoleculeGraph) -> Result<(), SmilesError> {
    for node in graph.node_indices() {
        if graph[node].bracket {
            continue;
        }
        let used: u8 = graph.edges(node).map(|e| e.weight().order()).sum();
        let atom = &graph[node];
        let valences = atom.element.default_valences();
        let hydrogens = if atom.aromatic {
            valences
                .first()
                .map(|&v| v.saturating_sub(used + 1))
                .unwrap_or(0)
        } else {
            match valences.iter().find(|&&v| v >= used) {
                Some(&v) => v - used,
                None if valences.is_empty() => 0,
                None => return Err(SmilesError::Valence(node.index(), atom.element)),
            }
        };
        graph[node].hydrogens = hydrogens;
    }
    Ok(())
}

/// Remove `[H]` atoms bonded to exactly one heavy atom, adding them to that
/// atom's hydrogen count instead. Node order is otherwise preserved.
fn fold_explicit_hydrogens(graph: MoleculeGraph) -> MoleculeGraph {
    let mut extra = vec![0u8; graph.node_count()];
    let mut folded = vec![false; graph.node_count()];

    for node in graph.node_indices() {
        let atom = &graph[node];
        if atom.is_heavy() || atom.charge != 0 {
            continue;
        }
        let mut edges = graph.edges(node);
        if let (Some(edge), None) = (edges.next(), edges.next()) {
            let other = if edge.source() == node { edge.target() } else { edge.source() };
            if graph[other].is_heavy() && *edge.weight() == Bond::Single {
                extra[other.index()] += 1;
                folded[node.index()] = true;
            }
        }
    }

    graph.filter_map(
        |node, atom| {
            (!folded[node.index()]).then(|| Atom {
                hydrogens: atom.hydrogens + extra[node.index()],
                ..atom.clone()
            })
        },
        |_, bond| Some(*bond),
    )
}
