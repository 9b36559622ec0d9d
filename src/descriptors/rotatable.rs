use crate::{Atom, Bond, Element, Molecule};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

/// Neighbors of `node` reached through an acyclic single bond (SMARTS `-!@`).
fn chain_neighbors(molecule: &Molecule, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
    molecule.graph().edges(node).filter_map(move |e| {
        let other = if e.source() == node { e.target() } else { e.source() };
        (*e.weight() == Bond::Single && !molecule.is_ring_bond(e.id())).then_some(other)
    })
}

fn count_neighbors(molecule: &Molecule, node: NodeIndex, pred: impl Fn(&Atom) -> bool) -> usize {
    molecule
        .neighbors(node)
        .filter(|&(n, _)| pred(molecule.atom(n)))
        .count()
}

fn aliphatic(atom: &Atom, element: Element) -> bool {
    !atom.aromatic && atom.element == element
}

/// Conditions both ends of a rotatable bond must meet: not triple bonded, not
/// terminal, and not a CX3 or t-butyl centre whose rotation is degenerate.
fn movable(molecule: &Molecule, node: NodeIndex) -> bool {
    if molecule.heavy_degree(node) <= 1 {
        return false;
    }
    if molecule.neighbors(node).any(|(_, b)| b == Bond::Triple) {
        return false;
    }
    if aliphatic(molecule.atom(node), Element::C) {
        for halogen in [Element::F, Element::Cl, Element::Br] {
            if count_neighbors(molecule, node, |a| a.element == halogen) >= 3 {
                return false;
            }
        }
        let methyls = count_neighbors(molecule, node, |a| aliphatic(a, Element::C) && a.hydrogens == 3);
        if methyls >= 3 {
            return false;
        }
    }
    true
}

/// `[CD3](=[N,O,S])`: the carbon of an amide, ester, thioamide or similar.
fn acyl_carbon(molecule: &Molecule, node: NodeIndex) -> bool {
    aliphatic(molecule.atom(node), Element::C)
        && molecule.heavy_degree(node) == 3
        && molecule.neighbors(node).any(|(n, b)| {
            let atom = molecule.atom(n);
            b == Bond::Double && !atom.aromatic && matches!(atom.element, Element::N | Element::O | Element::S)
        })
}

/// `[#7,O,S!D1]`: the heteroatom an acyl carbon is bonded to.
fn acyl_partner(molecule: &Molecule, node: NodeIndex) -> bool {
    let atom = molecule.atom(node);
    atom.element == Element::N
        || aliphatic(atom, Element::O)
        || (aliphatic(atom, Element::S) && molecule.heavy_degree(node) != 1)
}

/// `[CD3](=[N+])`: the central carbon of an amidinium.
fn amidinium_carbon(molecule: &Molecule, node: NodeIndex) -> bool {
    aliphatic(molecule.atom(node), Element::C)
        && molecule.heavy_degree(node) == 3
        && molecule.neighbors(node).any(|(n, b)| {
            let atom = molecule.atom(n);
            b == Bond::Double && aliphatic(atom, Element::N) && atom.charge > 0
        })
}

/// `[#7!D1]`
fn amidinium_partner(molecule: &Molecule, node: NodeIndex) -> bool {
    molecule.atom(node).element == Element::N && molecule.heavy_degree(node) != 1
}

/// Atoms that sit on an amide-like linkage. Only one end of a rotatable bond may
/// be such an atom.
fn in_acyl_linkage(molecule: &Molecule, node: NodeIndex) -> bool {
    let linked = |this: fn(&Molecule, NodeIndex) -> bool, other: fn(&Molecule, NodeIndex) -> bool| {
        this(molecule, node) && chain_neighbors(molecule, node).any(|n| other(molecule, n))
    };
    linked(acyl_carbon, acyl_partner)
        || linked(acyl_partner, acyl_carbon)
        || linked(amidinium_carbon, amidinium_partner)
        || linked(amidinium_partner, amidinium_carbon)
}

/// Number of rotatable bonds, using the strict definition: an acyclic single
/// bond between two movable atoms, at least one of which is not part of an
/// amide-like linkage.
pub fn num_rotatable_bonds(molecule: &Molecule) -> usize {
    let graph = molecule.graph();
    graph
        .edge_references()
        .filter(|e| matches!(e.weight(), Bond::Single | Bond::Aromatic))
        .filter(|e| !molecule.is_ring_bond(e.id()))
        .filter(|e| {
            let (a, b) = (e.source(), e.target());
            movable(molecule, a)
                && movable(molecule, b)
                && (!in_acyl_linkage(molecule, a) || !in_acyl_linkage(molecule, b))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotatable(smiles: &str) -> usize {
        num_rotatable_bonds(&Molecule::from_smiles(smiles).unwrap())
    }

    #[test]
    fn test_simple_chains() {
        assert_eq!(rotatable("C"), 0);
        assert_eq!(rotatable("CCO"), 0);
        assert_eq!(rotatable("CCCCO"), 2);
        assert_eq!(rotatable("CCCCCC"), 3);
        assert_eq!(rotatable("CCOCC"), 2);
    }

    #[test]
    fn test_rings_do_not_rotate() {
        assert_eq!(rotatable("C1CCCCC1"), 0);
        assert_eq!(rotatable("Cc1ccccc1"), 0);
        assert_eq!(rotatable("CCc1ccccc1"), 1);
        assert_eq!(rotatable("c1ccccc1-c1ccccc1"), 1);
        assert_eq!(rotatable("COc1ccccc1"), 1);
    }

    #[test]
    fn test_halogenated_ethanes() {
        assert_eq!(rotatable("ClCC(Cl)(Cl)Cl"), 0);
        assert_eq!(rotatable("ClC(Cl)C(Cl)Cl"), 1);
        assert_eq!(rotatable("ClCC(Cl)Cl"), 1);
        assert_eq!(rotatable("FC(F)(Cl)C(F)(Cl)Cl"), 1);
        assert_eq!(rotatable("CC(F)(F)F"), 0);
    }

    #[test]
    fn test_tert_butyl_and_triple_bonds() {
        assert_eq!(rotatable("CCC(C)(C)C"), 0);
        assert_eq!(rotatable("CCCC#N"), 1);
    }

    #[test]
    fn test_amide_like_linkages() {
        assert_eq!(rotatable("CCOC(C)=O"), 1);
        assert_eq!(rotatable("CC(=O)NC"), 0);
        assert_eq!(rotatable("CCC(=O)NC"), 1);
        assert_eq!(rotatable("CC(=O)OC(C)=O"), 0);
    }
}
