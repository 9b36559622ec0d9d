use super::bracket::parse_bracket_atom;
use crate::{Atom, Bond, Bond::*, Element, MoleculeGraph};
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SmilesError {
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Branch opened at position {0} is never closed")]
    UnclosedBranch(usize),
    #[error("Ring closure {0} at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u8, usize),
    #[error("Ring closure {0} opened at position {1} is never closed")]
    UnclosedRing(u8, usize),
    #[error("Ring closure {0} at position {1} bonds an atom to itself or to an existing neighbor")]
    InvalidRingBond(u8, usize),
    #[error("Ring closure {0} at position {1} uses a different bond symbol than where it was opened")]
    ConflictingRingBond(u8, usize),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingClosure(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom at position {0}: {1}")]
    InvalidBracketAtom(usize, String),
    #[error("Unknown element '{1}' at position {0}")]
    UnknownElement(usize, String),
    #[error("Unexpected character '{1}' at position {0}")]
    UnexpectedCharacter(usize, char),
    #[error("Bond symbol at position {0} is not followed by an atom")]
    DanglingBond(usize),
    #[error("Atom {0} ({1}) exceeds its maximum valence")]
    Valence(usize, Element),
    #[error("Atom {0} ({1}) is marked aromatic but is not in a ring")]
    NonRingAromatic(usize, Element),
}

/// An open ring-closure label: the atom that opened it, the explicit bond written
/// there (if any), and the position of the label.
#[derive(Debug, Clone, Copy)]
struct OpenRing {
    atom: NodeIndex,
    bond: Option<Bond>,
    position: usize,
}

/// Parses a SMILES string into a MoleculeGraph.
///
/// The graph holds exactly the atoms written in the string. Hydrogens are only
/// filled in for bracket atoms, and no ring or aromaticity perception is done;
/// see [`crate::Molecule::from_smiles`] for that.
///
/// # Arguments
///
/// * `smiles` - The SMILES string to parse.
///
/// # Returns
///
/// * `Result<MoleculeGraph, SmilesError>` - The parsed molecular graph or the first syntax error.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let mut graph = MoleculeGraph::new_undirected();
    let mut current_atom: Option<NodeIndex> = None;
    // Explicit bond symbol waiting for the next atom or ring closure.
    let mut bond_type: Option<(Bond, usize)> = None;
    let mut branch_stack: Vec<(NodeIndex, usize)> = Vec::new();
    let mut ring_map: BTreeMap<u8, OpenRing> = BTreeMap::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                let atom = current_atom.ok_or(SmilesError::BranchNoCurrentAtom(i))?;
                branch_stack.push((atom, i));
                i += 1;
            }
            ')' => {
                if let Some((_, position)) = bond_type {
                    return Err(SmilesError::DanglingBond(position));
                }
                let (atom, _) = branch_stack.pop().ok_or(SmilesError::BranchEndNoStart(i))?;
                current_atom = Some(atom);
                i += 1;
            }
            '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                let bond = match c {
                    '=' => Double,
                    '#' => Triple,
                    '$' => Quadruple,
                    ':' => Aromatic,
                    // Directional bonds only carry stereo information.
                    _ => Single,
                };
                bond_type = Some((bond, i));
                i += 1;
            }
            '%' => {
                if i + 2 >= chars.len()
                    || !chars[i + 1].is_ascii_digit()
                    || !chars[i + 2].is_ascii_digit()
                {
                    return Err(SmilesError::IncompleteRingClosure(i));
                }
                let ring_number = (chars[i + 1] as u8 - b'0') * 10 + (chars[i + 2] as u8 - b'0');
                ring_closure(
                    &mut graph,
                    &mut ring_map,
                    ring_number,
                    current_atom,
                    bond_type.take().map(|(bond, _)| bond),
                    i,
                )?;
                i += 3;
            }
            '0'..='9' => {
                let ring_number = c as u8 - b'0';
                ring_closure(
                    &mut graph,
                    &mut ring_map,
                    ring_number,
                    current_atom,
                    bond_type.take().map(|(bond, _)| bond),
                    i,
                )?;
                i += 1;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|relative| i + relative)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)
                    .map_err(|reason| SmilesError::InvalidBracketAtom(i, reason))?;
                let new_atom = graph.add_node(atom);
                attach(&mut graph, current_atom, new_atom, bond_type.take());
                current_atom = Some(new_atom);
                i = end + 1;
            }
            '.' => {
                // The next fragment is disconnected.
                if let Some((_, position)) = bond_type {
                    return Err(SmilesError::DanglingBond(position));
                }
                current_atom = None;
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '*' => {
                // Two-letter organic symbols (Cl, Br) win over their one-letter prefix.
                let (atom_str, width) = if i + 1 < chars.len() {
                    let candidate: String = chars[i..i + 2].iter().collect();
                    if Element::from_organic_symbol(&candidate).is_some() {
                        (candidate, 2)
                    } else {
                        (c.to_string(), 1)
                    }
                } else {
                    (c.to_string(), 1)
                };

                let (element, aromatic) = Element::from_organic_symbol(&atom_str)
                    .ok_or_else(|| SmilesError::UnknownElement(i, atom_str.clone()))?;
                let new_atom = graph.add_node(Atom::new(element, aromatic));
                attach(&mut graph, current_atom, new_atom, bond_type.take());
                current_atom = Some(new_atom);
                i += width;
            }
            _ => return Err(SmilesError::UnexpectedCharacter(i, c)),
        }
    }

    if let Some((_, position)) = bond_type {
        return Err(SmilesError::DanglingBond(position));
    }
    if let Some(&(_, position)) = branch_stack.last() {
        return Err(SmilesError::UnclosedBranch(position));
    }
    if let Some((&ring_number, open)) = ring_map.iter().next() {
        return Err(SmilesError::UnclosedRing(ring_number, open.position));
    }

    trace!(
        "Parsed {smiles} into {} atoms and {} bonds",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Bond a freshly added atom to the previous one. Without an explicit symbol the
/// bond is aromatic between two aromatic atoms and single otherwise.
fn attach(
    graph: &mut MoleculeGraph,
    previous: Option<NodeIndex>,
    new_atom: NodeIndex,
    bond_type: Option<(Bond, usize)>,
) {
    if let Some(prev_atom) = previous {
        let bond = bond_type
            .map(|(bond, _)| bond)
            .unwrap_or_else(|| implicit_bond(graph, prev_atom, new_atom));
        graph.add_edge(prev_atom, new_atom, bond);
    }
}

fn implicit_bond(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex) -> Bond {
    if graph[a].is_aromatic() && graph[b].is_aromatic() {
        Aromatic
    } else {
        Single
    }
}

/// Open or close ring label `ring_number` at `current_atom`.
fn ring_closure(
    graph: &mut MoleculeGraph,
    ring_map: &mut BTreeMap<u8, OpenRing>,
    ring_number: u8,
    current_atom: Option<NodeIndex>,
    bond: Option<Bond>,
    position: usize,
) -> Result<(), SmilesError> {
    let current = current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(ring_number, position))?;

    match ring_map.remove(&ring_number) {
        Some(open) => {
            if open.atom == current || graph.find_edge(open.atom, current).is_some() {
                return Err(SmilesError::InvalidRingBond(ring_number, position));
            }
            let bond_to_use = match (open.bond, bond) {
                (Some(a), Some(b)) if a != b => {
                    return Err(SmilesError::ConflictingRingBond(ring_number, position))
                }
                (Some(a), _) | (None, Some(a)) => a,
                (None, None) => implicit_bond(graph, open.atom, current),
            };
            graph.add_edge(open.atom, current, bond_to_use);
        }
        None => {
            ring_map.insert(
                ring_number,
                OpenRing {
                    atom: current,
                    bond,
                    position,
                },
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Element::*;
    use petgraph::visit::EdgeRef;

    fn bonds(graph: &MoleculeGraph) -> Vec<(usize, usize, Bond)> {
        let mut bonds: Vec<_> = graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b), *e.weight())
            })
            .collect();
        bonds.sort_by_key(|&(a, b, _)| (a, b));
        bonds
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").unwrap();
        assert_eq!(molecule.node_count(), 3);
        assert_eq!(molecule[NodeIndex::new(0)].element, C);
        assert_eq!(molecule[NodeIndex::new(1)].element, C);
        assert_eq!(molecule[NodeIndex::new(2)].element, O);
        assert_eq!(bonds(&molecule), vec![(0, 1, Single), (1, 2, Single)]);
    }

    #[test]
    fn test_parse_isobutane() {
        let molecule = parse_smiles("CC(C)C").unwrap();
        assert_eq!(molecule.node_count(), 4);
        assert_eq!(
            bonds(&molecule),
            vec![(0, 1, Single), (1, 2, Single), (1, 3, Single)]
        );
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").unwrap();
        assert_eq!(molecule.edge_count(), 6);
        for node in molecule.node_indices() {
            assert_eq!(molecule.edges(node).count(), 2);
        }
    }

    #[test]
    fn test_parse_benzene() {
        let molecule = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(molecule.edge_count(), 6);
        assert!(molecule.node_weights().all(|a| a.is(C) && a.aromatic));
        assert!(molecule.edge_weights().all(|&b| b == Aromatic));
    }

    #[test]
    fn test_explicit_single_between_aromatic_atoms() {
        let molecule = parse_smiles("c1ccccc1-c1ccccc1").unwrap();
        assert_eq!(molecule.edge_count(), 13);
        let singles = molecule.edge_weights().filter(|&&b| b == Single).count();
        assert_eq!(singles, 1);
    }

    #[test]
    fn test_ring_bond_symbols() {
        let molecule = parse_smiles("C=1CCCCC1").unwrap();
        assert!(bonds(&molecule).contains(&(0, 5, Double)));

        let molecule = parse_smiles("C1CCCCC=1").unwrap();
        assert!(bonds(&molecule).contains(&(0, 5, Double)));

        assert_eq!(
            parse_smiles("C=1CCCCC#1").unwrap_err(),
            SmilesError::ConflictingRingBond(1, 9)
        );
    }

    #[test]
    fn test_two_digit_ring_closure() {
        let molecule = parse_smiles("C%12CCCC%12").unwrap();
        assert_eq!(molecule.edge_count(), 5);
        assert_eq!(
            parse_smiles("C%1").unwrap_err(),
            SmilesError::IncompleteRingClosure(1)
        );
    }

    #[test]
    fn test_bracket_atoms_and_charges() {
        let molecule = parse_smiles("[NH4+].[Cl-]").unwrap();
        assert_eq!(molecule.node_count(), 2);
        assert_eq!(molecule.edge_count(), 0);
        assert_eq!(molecule[NodeIndex::new(0)].hydrogens, 4);
        assert_eq!(molecule[NodeIndex::new(0)].charge, 1);
        assert_eq!(molecule[NodeIndex::new(1)].charge, -1);

        let molecule = parse_smiles("C[C@@H](O)F").unwrap();
        assert_eq!(molecule.node_count(), 4);
        assert!(molecule[NodeIndex::new(1)].bracket);
    }

    #[test]
    fn test_ciprofloxacin() {
        let molecule =
            parse_smiles("C1CNCCN1c(c2)c(F)cc3c2N(C4CC4)C=C(C3=O)C(=O)O").unwrap();
        assert_eq!(molecule.node_count(), 24);
        assert_eq!(molecule.edge_count(), 27);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_smiles("(C)").unwrap_err(), SmilesError::BranchNoCurrentAtom(0));
        assert_eq!(parse_smiles("CC)").unwrap_err(), SmilesError::BranchEndNoStart(2));
        assert_eq!(parse_smiles("CC(C").unwrap_err(), SmilesError::UnclosedBranch(2));
        assert_eq!(parse_smiles("C1CC").unwrap_err(), SmilesError::UnclosedRing(1, 1));
        assert_eq!(parse_smiles("C11").unwrap_err(), SmilesError::InvalidRingBond(1, 2));
        assert_eq!(parse_smiles("CC[C").unwrap_err(), SmilesError::UnclosedBracket(2));
        assert_eq!(parse_smiles("CC=").unwrap_err(), SmilesError::DanglingBond(2));
        assert_eq!(
            parse_smiles("CXC").unwrap_err(),
            SmilesError::UnknownElement(1, "X".to_string())
        );
        assert_eq!(
            parse_smiles("C C").unwrap_err(),
            SmilesError::UnexpectedCharacter(1, ' ')
        );
        assert!(matches!(
            parse_smiles("C[Xy]"),
            Err(SmilesError::InvalidBracketAtom(1, _))
        ));
    }

    #[test]
    fn test_empty_string_is_an_empty_graph() {
        let molecule = parse_smiles("").unwrap();
        assert_eq!(molecule.node_count(), 0);
    }
}
