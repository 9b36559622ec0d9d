use super::rings::{ring_edges, RingInfo};
use crate::{Bond, Element::*, MoleculeGraph};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashSet};
use tracing::*;

/// Number of π electrons `node` donates to a ring, or `None` when the atom
/// cannot take part in an aromatic system (sp3 centres, triple bonds, exocyclic C=C).
fn pi_electrons(graph: &MoleculeGraph, ring_bonds: &HashSet<EdgeIndex>, node: NodeIndex) -> Option<u8> {
    let atom = &graph[node];
    let degree = graph.edges(node).count() + atom.hydrogens as usize;

    let mut ring_double = false;
    let mut exocyclic_double = None;
    for edge in graph.edges(node) {
        match edge.weight() {
            Bond::Triple | Bond::Quadruple => return None,
            Bond::Double if ring_bonds.contains(&edge.id()) => ring_double = true,
            Bond::Double => {
                let other = if edge.source() == node { edge.target() } else { edge.source() };
                exocyclic_double = Some(graph[other].element);
            }
            _ => {}
        }
    }

    // Carbonyl-like exocyclic double bonds pull the electrons out of the ring.
    if let Some(partner) = exocyclic_double {
        return match (atom.element, partner) {
            (C, O | N | S) => Some(0),
            _ => None,
        };
    }

    if atom.aromatic {
        return match atom.element {
            C => match atom.charge {
                0 => Some(1),
                -1 => Some(2),
                1 => Some(0),
                _ => None,
            },
            N | P | As => {
                if atom.charge > 0 {
                    Some(1)
                } else if atom.charge < 0 || atom.hydrogens > 0 || degree == 3 {
                    Some(2)
                } else {
                    Some(1)
                }
            }
            O | S | Se | Te => Some(if atom.charge > 0 { 1 } else { 2 }),
            B => Some(0),
            _ => None,
        };
    }

    if ring_double {
        return Some(1);
    }

    match atom.element {
        C => match atom.charge {
            -1 => Some(2),
            1 => Some(0),
            _ => None,
        },
        N | P | As if atom.charge == 0 && degree == 3 => Some(2),
        O | S | Se | Te if atom.charge == 0 && degree == 2 => Some(2),
        B if atom.charge == 0 && degree == 3 => Some(0),
        _ => None,
    }
}

/// Ring systems tested for aromaticity: every ring on its own, then every pair of
/// rings fused through a shared bond. Each entry is a set of indices into `info.rings`.
fn candidate_systems(info: &RingInfo) -> Vec<Vec<usize>> {
    let mut systems: Vec<Vec<usize>> = (0..info.rings.len()).map(|i| vec![i]).collect();
    for i in 0..info.rings.len() {
        for j in i + 1..info.rings.len() {
            let a: BTreeSet<_> = info.rings[i].iter().collect();
            let shared = info.rings[j].iter().filter(|n| a.contains(n)).count();
            if shared == 2 {
                systems.push(vec![i, j]);
            }
        }
    }
    systems
}

/// Apply the 4n+2 rule to every candidate ring system and mark the aromatic ones.
///
/// Atoms of an aromatic system become aromatic and the bonds around its rings
/// become `Bond::Aromatic`. Atoms written in lowercase keep their flag.
pub fn perceive_aromaticity(graph: &mut MoleculeGraph, info: &RingInfo) {
    for system in candidate_systems(info) {
        let atoms: BTreeSet<NodeIndex> = system
            .iter()
            .flat_map(|&ring| info.rings[ring].iter().copied())
            .collect();

        let already_aromatic = system.iter().all(|&ring| {
            ring_edges(graph, &info.rings[ring])
                .into_iter()
                .all(|edge| graph[edge] == Bond::Aromatic)
        }) && atoms.iter().all(|&n| graph[n].aromatic);
        if already_aromatic {
            continue;
        }

        let electrons: Option<u32> = atoms
            .iter()
            .map(|&n| pi_electrons(graph, &info.ring_bonds, n).map(u32::from))
            .sum();
        match electrons {
            Some(count) if count % 4 == 2 => {
                trace!("Ring system of {} atoms is aromatic ({count} π electrons)", atoms.len());
                for &n in &atoms {
                    graph[n].aromatic = true;
                }
                for &ring in &system {
                    for edge in ring_edges(graph, &info.rings[ring]) {
                        graph[edge] = Bond::Aromatic;
                    }
                }
            }
            _ => {}
        }
    }

    // Aromatic bonds only exist inside rings, between aromatic atoms.
    let demote: Vec<EdgeIndex> = graph
        .edge_references()
        .filter(|e| *e.weight() == Bond::Aromatic)
        .filter(|e| {
            !info.ring_bonds.contains(&e.id())
                || !graph[e.source()].aromatic
                || !graph[e.target()].aromatic
        })
        .map(|e| e.id())
        .collect();
    for edge in demote {
        graph[edge] = Bond::Single;
    }
}
