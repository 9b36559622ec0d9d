use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The elements a SMILES string may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Fe,
    Cu,
    Zn,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Ag,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Cs,
    Ba,
    Pt,
    Au,
    Hg,
    Pb,
    Bi,
}

use Element::*;

/// Symbol and average atomic weight.
const ELEMENT_DATA: &[(Element, &str, f64)] = &[
    (H, "H", 1.008),
    (He, "He", 4.003),
    (Li, "Li", 6.941),
    (Be, "Be", 9.012),
    (B, "B", 10.812),
    (C, "C", 12.011),
    (N, "N", 14.007),
    (O, "O", 15.999),
    (F, "F", 18.998),
    (Ne, "Ne", 20.18),
    (Na, "Na", 22.99),
    (Mg, "Mg", 24.305),
    (Al, "Al", 26.982),
    (Si, "Si", 28.086),
    (P, "P", 30.974),
    (S, "S", 32.067),
    (Cl, "Cl", 35.453),
    (Ar, "Ar", 39.948),
    (K, "K", 39.098),
    (Ca, "Ca", 40.078),
    (Fe, "Fe", 55.845),
    (Cu, "Cu", 63.546),
    (Zn, "Zn", 65.39),
    (Ge, "Ge", 72.61),
    (As, "As", 74.922),
    (Se, "Se", 78.96),
    (Br, "Br", 79.904),
    (Kr, "Kr", 83.8),
    (Rb, "Rb", 85.468),
    (Sr, "Sr", 87.62),
    (Ag, "Ag", 107.868),
    (Sn, "Sn", 118.71),
    (Sb, "Sb", 121.76),
    (Te, "Te", 127.6),
    (I, "I", 126.904),
    (Xe, "Xe", 131.29),
    (Cs, "Cs", 132.905),
    (Ba, "Ba", 137.328),
    (Pt, "Pt", 195.078),
    (Au, "Au", 196.967),
    (Hg, "Hg", 200.59),
    (Pb, "Pb", 207.2),
    (Bi, "Bi", 208.98),
];

lazy_static! {
    static ref BY_SYMBOL: HashMap<&'static str, Element> = ELEMENT_DATA
        .iter()
        .map(|&(element, symbol, _)| (symbol, element))
        .collect();
    static ref BY_ELEMENT: HashMap<Element, (&'static str, f64)> = ELEMENT_DATA
        .iter()
        .map(|&(element, symbol, weight)| (element, (symbol, weight)))
        .collect();
}

impl Element {
    /// Look up an element by its capitalized symbol (`"Cl"`, `"C"`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BY_SYMBOL.get(symbol).copied()
    }

    /// Look up an element written in lowercase aromatic form (`"c"`, `"se"`).
    ///
    /// Only the elements SMILES allows to be aromatic are accepted.
    pub fn from_aromatic_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "b" => Some(B),
            "c" => Some(C),
            "n" => Some(N),
            "o" => Some(O),
            "p" => Some(P),
            "s" => Some(S),
            "se" => Some(Se),
            "as" => Some(As),
            "te" => Some(Te),
            _ => None,
        }
    }

    /// Elements of the organic subset, which may be written without brackets.
    pub fn from_organic_symbol(symbol: &str) -> Option<(Self, bool)> {
        match symbol {
            "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I" => {
                Self::from_symbol(symbol).map(|e| (e, false))
            }
            "b" | "c" | "n" | "o" | "p" | "s" => Self::from_aromatic_symbol(symbol).map(|e| (e, true)),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        BY_ELEMENT[self].0
    }

    /// Average atomic weight in daltons.
    pub fn atomic_weight(&self) -> f64 {
        BY_ELEMENT[self].1
    }

    /// The allowed valences used to fill in implicit hydrogens, lowest first.
    /// Empty for elements that never receive implicit hydrogens.
    pub fn default_valences(&self) -> &'static [u8] {
        match self {
            B => &[3],
            C => &[4],
            N | P => &[3, 5],
            O => &[2],
            S => &[2, 4, 6],
            F | Cl | Br | I => &[1],
            _ => &[],
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        *self == H
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}
