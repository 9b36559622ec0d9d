//! Wildman–Crippen atom-contribution LogP.
//!
//! Every heavy atom is assigned the first matching type in the order the types are
//! declared below, and every hydrogen is typed by the heavy atom it sits on.
//! LogP is the sum of the per-type contributions.

use crate::{Atom, Bond, Element as E, Molecule};
use petgraph::graph::NodeIndex;
use tracing::*;

/// Atom types of the Wildman–Crippen scheme.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrippenType {
    C1, C2, C3, C4, C5, C6, C7, C8, C9, C10, C11, C12, C13, C14,
    C15, C16, C17, C18, C19, C20, C21, C22, C23, C24, C25, C26, C27, CS,
    H1, H2, H3, H4, HS,
    N1, N2, N3, N4, N5, N6, N7, N8, N9, N10, N11, N12, N13, N14, NS,
    O1, O2, O3, O4, O5, O6, O7, O8, O9, O10, O11, O12, OS,
    F, Cl, Br, I, Hal,
    P,
    S1, S2, S3,
    Me1, Me2,
    /// Elements without a parameter contribute nothing.
    Unknown,
}

use CrippenType::*;

impl CrippenType {
    /// Contribution to LogP.
    pub fn log_p(&self) -> f64 {
        match self {
            C1 => 0.1441,
            C2 => 0.0,
            C3 => -0.2035,
            C4 => -0.2051,
            C5 => -0.2783,
            C6 => 0.1551,
            C7 => 0.0017,
            C8 => 0.08452,
            C9 => -0.1444,
            C10 => -0.0516,
            C11 => 0.1193,
            C12 => -0.0967,
            C13 => -0.5443,
            C14 => 0.0,
            C15 => 0.245,
            C16 => 0.198,
            C17 => 0.0,
            C18 => 0.1581,
            C19 => 0.2955,
            C20 => 0.2713,
            C21 => 0.136,
            C22 => 0.4619,
            C23 => 0.5437,
            C24 => 0.1893,
            C25 => -0.8186,
            C26 => 0.264,
            C27 => 0.2148,
            CS => 0.08129,
            H1 => 0.123,
            H2 => -0.2677,
            H3 => 0.2142,
            H4 => 0.298,
            HS => 0.1125,
            N1 => -1.019,
            N2 => -0.7096,
            N3 => -1.027,
            N4 => -0.5188,
            N5 => 0.08387,
            N6 => 0.1836,
            N7 => -0.3187,
            N8 => -0.4458,
            N9 => 0.01508,
            N10 => -1.95,
            N11 => -0.3239,
            N12 => -1.119,
            N13 => -0.3396,
            N14 => 0.2887,
            NS => -0.4806,
            O1 => 0.1552,
            O2 => -0.2893,
            O3 => -0.0684,
            O4 => -0.4195,
            O5 => 0.0335,
            O6 => -0.3339,
            O7 => -1.189,
            O8 => 0.1788,
            O9 => -0.1526,
            O10 => 0.1129,
            O11 => 0.4833,
            O12 => -1.326,
            OS => -0.1188,
            F => 0.4202,
            Cl => 0.6895,
            Br => 0.8456,
            I => 0.8857,
            Hal => -2.996,
            P => 0.8612,
            S1 => 0.6482,
            S2 => -0.0024,
            S3 => 0.6237,
            Me1 => -0.3808,
            Me2 => -0.0025,
            Unknown => 0.0,
        }
    }
}

/// A heavy neighbor and the bond leading to it.
#[derive(Clone, Copy)]
struct Neighbor<'a> {
    node: NodeIndex,
    atom: &'a Atom,
    bond: Bond,
}

/// The neighborhood of one atom, with the SMARTS-style counts the typing rules use.
struct Site<'a> {
    molecule: &'a Molecule,
    node: NodeIndex,
    atom: &'a Atom,
    neighbors: Vec<Neighbor<'a>>,
    /// `X`: total connections including hydrogens.
    connections: usize,
}

impl<'a> Site<'a> {
    fn new(molecule: &'a Molecule, node: NodeIndex) -> Self {
        let neighbors = molecule
            .neighbors(node)
            .map(|(n, bond)| Neighbor {
                node: n,
                atom: molecule.atom(n),
                bond,
            })
            .filter(|n| n.atom.is_heavy())
            .collect();
        Self {
            molecule,
            node,
            atom: molecule.atom(node),
            neighbors,
            connections: molecule.total_degree(node),
        }
    }

    fn h(&self) -> u8 {
        self.atom.hydrogens
    }

    fn degree(&self) -> usize {
        self.neighbors.len()
    }

    fn any(&self, pred: impl Fn(&Atom, Bond) -> bool) -> bool {
        self.neighbors.iter().any(|n| pred(n.atom, n.bond))
    }

    fn all(&self, pred: impl Fn(&Atom, Bond) -> bool) -> bool {
        self.neighbors.iter().all(|n| pred(n.atom, n.bond))
    }

    fn count(&self, pred: impl Fn(&Atom, Bond) -> bool) -> usize {
        self.neighbors.iter().filter(|n| pred(n.atom, n.bond)).count()
    }
}

fn aliphatic(atom: &Atom, element: E) -> bool {
    !atom.aromatic && atom.element == element
}

fn aromatic(atom: &Atom, element: E) -> bool {
    atom.aromatic && atom.element == element
}

/// SMARTS `[A;!#1]`.
fn aliphatic_heavy(atom: &Atom) -> bool {
    !atom.aromatic && atom.is_heavy()
}

/// SMARTS `[N,O,P,S,F,Cl,Br,I]`.
fn hetero(atom: &Atom) -> bool {
    !atom.aromatic
        && matches!(
            atom.element,
            E::N | E::O | E::P | E::S | E::F | E::Cl | E::Br | E::I
        )
}

/// Aliphatic heavy atoms outside the common organic set (Si, B, Se, ...).
fn unusual(atom: &Atom) -> bool {
    aliphatic_heavy(atom) && atom.element != E::C && !hetero(atom)
}

/// Aryl substituents of C13: anything aliphatic outside C, N, O, S and the halogens.
fn aryl_unusual(atom: &Atom) -> bool {
    unusual(atom) || aliphatic(atom, E::P)
}

/// SMARTS default bond: single or aromatic.
fn single(bond: Bond) -> bool {
    matches!(bond, Bond::Single | Bond::Aromatic)
}

fn double(bond: Bond) -> bool {
    bond == Bond::Double
}

fn carbon_type(site: &Site) -> CrippenType {
    if site.atom.aromatic {
        return aromatic_carbon_type(site);
    }
    let (h, x, d) = (site.h(), site.connections, site.degree());
    let carbon = |a: &Atom| aliphatic(a, E::C);

    if (h == 4 && d == 0)
        || (h == 3 && site.any(|a, b| carbon(a) && single(b)))
        || (h == 2 && d == 2 && site.all(|a, b| carbon(a) && single(b)))
    {
        return C1;
    }
    if (h == 1 && d == 3 && site.all(|a, b| carbon(a) && single(b)))
        || (h == 0 && d == 4 && site.all(|a, b| carbon(a) && single(b)))
    {
        return C2;
    }
    if (h == 3 && site.any(|a, _| hetero(a)))
        || (h == 2 && x == 4 && site.any(|a, _| hetero(a)) && site.all(|a, _| aliphatic_heavy(a)))
    {
        return C3;
    }
    if x == 4 && h <= 1 && site.any(|a, _| hetero(a)) && site.all(|a, _| aliphatic_heavy(a)) {
        return C4;
    }
    if site.any(|a, b| double(b) && aliphatic_heavy(a) && a.element != E::C) {
        return C5;
    }

    let double_to_carbon = site.count(|a, b| double(b) && carbon(a));
    let single_to_aliphatic = site.count(|a, b| single(b) && aliphatic_heavy(a));
    if (h == 2 && double_to_carbon >= 1)
        || (h == 1 && double_to_carbon >= 1 && single_to_aliphatic >= 1)
        || (h == 0 && double_to_carbon >= 1 && single_to_aliphatic >= 2)
        || double_to_carbon >= 2
    {
        return C6;
    }
    if x == 2 && site.any(|a, b| b == Bond::Triple && !a.aromatic) {
        return C7;
    }

    let to_aromatic = site.any(|a, b| single(b) && a.aromatic);
    match h {
        3 if site.any(|a, b| single(b) && aromatic(a, E::C)) => return C8,
        3 if to_aromatic => return C9,
        2 if x == 4 && to_aromatic => return C10,
        1 if x == 4 && to_aromatic => return C11,
        0 if x == 4 && to_aromatic => return C12,
        _ => {}
    }

    if (double_to_carbon >= 1 && site.any(|a, _| a.aromatic))
        || site.any(|a, b| double(b) && aromatic(a, E::C))
    {
        return C26;
    }
    if x == 4 && site.any(|a, _| unusual(a)) {
        return C27;
    }
    CS
}

fn aromatic_carbon_type(site: &Site) -> CrippenType {
    let h = site.h();
    if h == 0 && site.any(|a, b| b == Bond::Single && aryl_unusual(a)) {
        return C13;
    }
    for (halogen, kind) in [(E::F, C14), (E::Cl, C15), (E::Br, C16), (E::I, C17)] {
        if site.any(|a, _| a.element == halogen) {
            return kind;
        }
    }
    if h == 1 {
        return C18;
    }

    let ring_bonds = site.count(|a, b| b == Bond::Aromatic && a.aromatic);
    if ring_bonds >= 3 {
        return C19;
    }
    if ring_bonds == 2 {
        let substituent = |pred: fn(&Atom) -> bool| site.any(|a, b| b == Bond::Single && pred(a));
        if substituent(|a| a.aromatic) {
            return C20;
        }
        if substituent(|a| aliphatic(a, E::C)) {
            return C21;
        }
        if substituent(|a| aliphatic(a, E::N)) {
            return C22;
        }
        if substituent(|a| aliphatic(a, E::O)) {
            return C23;
        }
        if substituent(|a| aliphatic(a, E::S)) {
            return C24;
        }
        if site.any(|a, b| double(b) && !a.aromatic && matches!(a.element, E::C | E::N | E::O)) {
            return C25;
        }
    }
    CS
}

fn nitrogen_type(site: &Site) -> CrippenType {
    let atom = site.atom;
    if atom.aromatic {
        return match atom.charge {
            0 => N11,
            c if c > 0 => N12,
            _ => NS,
        };
    }
    let h = site.h();
    if atom.charge > 0 {
        return if h > 0 {
            N10
        } else if site.any(|_, b| b == Bond::Triple) {
            N14
        } else {
            N13
        };
    }
    if atom.charge < 0 {
        return N14;
    }

    let to_aliphatic = site.count(|a, b| single(b) && aliphatic_heavy(a));
    let to_aromatic = site.count(|a, b| single(b) && a.aromatic);
    let has_double = site.any(|_, b| double(b));
    match h {
        2 if to_aliphatic >= 1 => N1,
        1 if to_aliphatic >= 2 => N2,
        2 if to_aromatic >= 1 => N3,
        1 if to_aromatic >= 1 && to_aliphatic + to_aromatic >= 2 => N4,
        1 if has_double => N5,
        0 if has_double && site.degree() >= 2 => N6,
        0 if to_aliphatic >= 3 => N7,
        0 if to_aromatic >= 1 && to_aliphatic + to_aromatic >= 3 => N8,
        _ if site.any(|_, b| b == Bond::Triple) => N9,
        _ => NS,
    }
}

fn oxygen_type(site: &Site) -> CrippenType {
    let atom = site.atom;
    if atom.aromatic {
        return O1;
    }
    if site.h() >= 1 {
        return O2;
    }
    if site.degree() == 2 && site.all(|_, b| single(b)) {
        return if site.all(|a, _| aliphatic_heavy(a)) { O3 } else { O4 };
    }
    if site.any(|a, b| double(b) && matches!(a.element, E::N | E::O)) {
        return O5;
    }
    if atom.charge < 0 && site.degree() == 1 {
        let partner = site.neighbors[0];
        return match partner.atom.element {
            E::N => O5,
            E::S => O6,
            E::C if has_double_to(site.molecule, partner.node, |a| aliphatic(a, E::O)) => O12,
            _ => O7,
        };
    }
    if site.any(|a, b| double(b) && aromatic(a, E::C)) {
        return O8;
    }
    match site.neighbors.as_slice() {
        [carbon] if carbon.bond == Bond::Double && aliphatic(carbon.atom, E::C) => {
            carbonyl_oxygen_type(site, *carbon)
        }
        _ => OS,
    }
}

fn has_double_to(molecule: &Molecule, node: NodeIndex, pred: impl Fn(&Atom) -> bool) -> bool {
    molecule
        .neighbors(node)
        .any(|(other, bond)| double(bond) && pred(molecule.atom(other)))
}

/// Type a carbonyl oxygen by what else the carbonyl carbon is bonded to.
fn carbonyl_oxygen_type(site: &Site, carbon: Neighbor) -> CrippenType {
    let others: Vec<Neighbor> = Site::new(site.molecule, carbon.node)
        .neighbors
        .into_iter()
        .filter(|n| n.node != site.node)
        .collect();
    let kh = carbon.atom.hydrogens;

    let aliphatic_o9 = match others.as_slice() {
        [] => kh == 2,
        [a] => {
            (kh == 1
                && single(a.bond)
                && aliphatic_heavy(a.atom)
                && matches!(a.atom.element, E::C | E::N | E::O))
                || (double(a.bond) && aliphatic(a.atom, E::O))
        }
        [a, b] => {
            kh == 0
                && aliphatic_heavy(a.atom)
                && aliphatic_heavy(b.atom)
                && (aliphatic(a.atom, E::C) || aliphatic(b.atom, E::C))
        }
        _ => false,
    };
    if aliphatic_o9 {
        return O9;
    }

    let aromatic_o10 = match others.as_slice() {
        [a] => kh == 1 && a.atom.aromatic,
        [a, b] => {
            (a.atom.aromatic || b.atom.aromatic)
                && (a.atom.element == E::C
                    || b.atom.element == E::C
                    || aliphatic_heavy(a.atom)
                    || aliphatic_heavy(b.atom))
        }
        _ => false,
    };
    if aromatic_o10 {
        return O10;
    }
    if others.len() == 2 && others.iter().all(|n| n.atom.element != E::C) {
        return O11;
    }
    OS
}

/// Type a heavy atom, or a hydrogen atom that was kept in the graph.
pub fn atom_type(molecule: &Molecule, node: NodeIndex) -> CrippenType {
    let site = Site::new(molecule, node);
    let atom = site.atom;
    match atom.element {
        E::C => carbon_type(&site),
        E::N => nitrogen_type(&site),
        E::O => oxygen_type(&site),
        E::F | E::Cl | E::Br | E::I if atom.charge != 0 => Hal,
        E::F => F,
        E::Cl => Cl,
        E::Br => Br,
        E::I => I,
        E::P => P,
        E::S if atom.aromatic => S3,
        E::S if atom.charge != 0 => S2,
        E::S => S1,
        E::Li | E::Na | E::K | E::Rb | E::Cs => Me1,
        E::Be | E::Mg | E::Ca | E::Sr | E::Ba => Me2,
        E::H => match molecule.neighbors(node).next() {
            Some((other, _)) if !molecule.atom(other).is_heavy() => H1,
            Some((other, _)) => hydrogen_type(molecule, other),
            None => HS,
        },
        _ => Unknown,
    }
}

/// Type of the hydrogens attached to `node`.
pub fn hydrogen_type(molecule: &Molecule, node: NodeIndex) -> CrippenType {
    let site = Site::new(molecule, node);
    match site.atom.element {
        E::C => H1,
        E::N => H3,
        // Water: the other neighbor is a hydrogen.
        E::O if site.h() >= 2 => H2,
        E::O => match site.neighbors.as_slice() {
            [other] => {
                let atom = other.atom;
                if (aliphatic(atom, E::C) && molecule.total_degree(other.node) == 4)
                    || aromatic(atom, E::C)
                    || !matches!(atom.element, E::C | E::N | E::O | E::S)
                {
                    H2
                } else if atom.element == E::N {
                    H3
                } else if matches!(atom.element, E::O | E::S) && !atom.aromatic {
                    H4
                } else if atom.element == E::C
                    && has_double_to(molecule, other.node, |a| {
                        matches!(a.element, E::C | E::N)
                            || (!a.aromatic && matches!(a.element, E::O | E::S))
                    })
                {
                    // Enols and acids.
                    H4
                } else {
                    HS
                }
            }
            _ => HS,
        },
        _ => H2,
    }
}

/// Wildman–Crippen LogP of the molecule.
pub fn mol_log_p(molecule: &Molecule) -> f64 {
    molecule
        .atoms()
        .map(|node| {
            let kind = atom_type(molecule, node);
            let hydrogens = molecule.atom(node).hydrogens;
            let mut contribution = kind.log_p();
            if hydrogens > 0 {
                contribution += hydrogens as f64 * hydrogen_type(molecule, node).log_p();
            }
            trace!("atom {} typed {kind:?} with {hydrogens} H", node.index());
            contribution
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn log_p(smiles: &str) -> f64 {
        mol_log_p(&Molecule::from_smiles(smiles).unwrap())
    }

    fn types(smiles: &str) -> Vec<CrippenType> {
        let molecule = Molecule::from_smiles(smiles).unwrap();
        molecule.atoms().map(|n| atom_type(&molecule, n)).collect()
    }

    #[test]
    fn test_reference_values() {
        assert_abs_diff_eq!(log_p("CCO"), -0.0014, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("c1ccccc1"), 1.6866, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("CC(=O)O"), 0.0909, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("CC(Cl)Cl"), 1.81, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("CC(Cl)(Cl)Cl"), 2.3765, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("ClCC(Cl)(Cl)Cl"), 2.5954, epsilon = 1e-4);
        assert_abs_diff_eq!(log_p("ClC(Cl)C(Cl)Cl"), 2.5938, epsilon = 1e-4);
    }

    #[test]
    fn test_kekule_and_aromatic_forms_agree() {
        assert_abs_diff_eq!(log_p("C1=CC=CC=C1"), log_p("c1ccccc1"), epsilon = 1e-9);
        assert_abs_diff_eq!(log_p("CC1=CC=CC=C1"), log_p("Cc1ccccc1"), epsilon = 1e-9);
    }

    #[test]
    fn test_carbon_types() {
        assert_eq!(types("C"), vec![C1]);
        assert_eq!(types("CC(C)(C)C"), vec![C1, C2, C1, C1, C1]);
        assert_eq!(types("CC(C)=O"), vec![C1, C5, C1, O9]);
        assert_eq!(types("C=CC"), vec![C6, C6, C1]);
        assert_eq!(types("CC#N"), vec![C1, C7, N9]);
        assert_eq!(types("Cc1ccccc1"), vec![C8, C21, C18, C18, C18, C18, C18]);
        assert_eq!(types("CCc1ccccc1")[1], C10);
        assert_eq!(types("C=Cc1ccccc1")[1], C26);
        assert_eq!(types("Oc1ccccc1")[1], C23);
        assert_eq!(types("Nc1ccccc1")[1], C22);
        assert_eq!(types("Clc1ccccc1")[1], C15);
        assert_eq!(types("c1ccc2ccccc2c1")[3], C19);
        assert_eq!(types("c1ccccc1-c1ccccc1")[0], C18);
        assert_eq!(types("c1ccccc1-c1ccccc1")[5], C20);
    }

    #[test]
    fn test_benzylic_carbons_with_heteroatoms() {
        assert_eq!(types("CC(O)c1ccccc1")[1], C11);
        assert_eq!(types("CC(C)(O)c1ccccc1")[1], C12);
        assert_eq!(types("NC(C)c1ccccc1")[1], C11);
        assert_eq!(types("CC(O)CC")[1], C4);
        assert_eq!(types("CC(C)(O)C")[1], C4);
    }

    #[test]
    fn test_aryl_carbon_on_phosphorus() {
        assert_eq!(types("Pc1ccccc1")[1], C13);
        assert_eq!(types("C[Si](C)(C)c1ccccc1")[4], C13);
        assert_eq!(types("CP(C)C")[0], C3);
    }

    #[test]
    fn test_heteroatom_types() {
        assert_eq!(types("CCN"), vec![C1, C3, N1]);
        assert_eq!(types("CNC")[1], N2);
        assert_eq!(types("CN(C)C")[1], N7);
        assert_eq!(types("c1ccncc1")[3], N11);
        assert_eq!(types("COC"), vec![C3, O3, C3]);
        assert_eq!(types("COc1ccccc1")[1], O4);
        assert_eq!(types("NC(N)=O")[3], O11);
        assert_eq!(types("O=Cc1ccccc1")[0], O10);
        assert_eq!(types("CC(=O)[O-]")[3], O12);
        assert_eq!(types("c1ccoc1")[3], O1);
        assert_eq!(types("c1ccsc1")[3], S3);
        assert_eq!(types("CSC")[1], S1);
        assert_eq!(types("[Na+].[Cl-]"), vec![Me1, Hal]);
    }

    #[test]
    fn test_hydrogen_types() {
        let molecule = Molecule::from_smiles("CC(=O)O").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(0)), H1);
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(3)), H4);

        let molecule = Molecule::from_smiles("CO").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(1)), H2);

        let molecule = Molecule::from_smiles("Oc1ccccc1").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(0)), H2);

        let molecule = Molecule::from_smiles("ON").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(0)), H3);
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(1)), H3);

        let molecule = Molecule::from_smiles("CS").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(1)), H2);

        let molecule = Molecule::from_smiles("O").unwrap();
        assert_eq!(hydrogen_type(&molecule, NodeIndex::new(0)), H2);
    }

    #[test]
    fn test_unknown_elements_contribute_nothing() {
        let molecule = Molecule::from_smiles("[Xe]").unwrap();
        assert_eq!(atom_type(&molecule, NodeIndex::new(0)), Unknown);
        assert_eq!(mol_log_p(&molecule), 0.0);
    }
}
