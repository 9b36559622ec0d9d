mod crippen;
pub use crippen::{atom_type, hydrogen_type, mol_log_p, CrippenType};

mod rotatable;
pub use rotatable::num_rotatable_bonds;

use crate::{Element, Molecule, SolubilityError};
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("molecule has no heavy atoms")]
    NoHeavyAtoms,
}

/// The four descriptors the solubility model is trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptors {
    pub mol_log_p: f64,
    pub mol_wt: f64,
    pub num_rotatable_bonds: usize,
    pub aromatic_proportion: f64,
}

impl Descriptors {
    /// Column names, in the order of `values`.
    pub const COLUMNS: [&'static str; 4] = [
        "MolLogP",
        "MolWt",
        "NumRotatableBonds",
        "AromaticProportion",
    ];

    pub fn compute(molecule: &Molecule) -> Result<Self, DescriptorError> {
        Ok(Self {
            mol_log_p: mol_log_p(molecule),
            mol_wt: mol_wt(molecule),
            num_rotatable_bonds: num_rotatable_bonds(molecule),
            aromatic_proportion: aromatic_proportion(molecule)?,
        })
    }

    pub fn values(&self) -> [f64; 4] {
        [
            self.mol_log_p,
            self.mol_wt,
            self.num_rotatable_bonds as f64,
            self.aromatic_proportion,
        ]
    }
}

/// Average molecular weight, hydrogens included. Isotope labels are ignored.
pub fn mol_wt(molecule: &Molecule) -> f64 {
    let hydrogen = Element::H.atomic_weight();
    molecule
        .graph()
        .node_weights()
        .map(|atom| atom.element.atomic_weight() + atom.hydrogens as f64 * hydrogen)
        .sum()
}

/// Fraction of the heavy atoms that are aromatic.
pub fn aromatic_proportion(molecule: &Molecule) -> Result<f64, DescriptorError> {
    let heavy = molecule.heavy_atom_count();
    if heavy == 0 {
        return Err(DescriptorError::NoHeavyAtoms);
    }
    let aromatic = molecule
        .heavy_atoms()
        .filter(|&n| molecule.atom(n).is_aromatic())
        .count();
    Ok(aromatic as f64 / heavy as f64)
}

/// Descriptors for a batch of molecules, one row per input SMILES.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorTable {
    pub smiles: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<[f64; 4]>,
}

impl DescriptorTable {
    fn new() -> Self {
        Self {
            smiles: Vec::new(),
            columns: Descriptors::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, smiles: &str, descriptors: Descriptors) {
        self.smiles.push(smiles.to_owned());
        self.rows.push(descriptors.values());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compute the descriptors of the SMILES found on 1-based input line `line`.
pub fn describe(line: usize, smiles: &str) -> Result<Descriptors, SolubilityError> {
    let molecule = Molecule::from_smiles(smiles).map_err(|source| SolubilityError::Parse {
        line,
        smiles: smiles.to_owned(),
        source,
    })?;
    let descriptors = Descriptors::compute(&molecule).map_err(|_| SolubilityError::DegenerateMolecule {
        line,
        smiles: smiles.to_owned(),
    })?;
    debug!("{smiles}: {descriptors:?}");
    Ok(descriptors)
}

/// Compute the descriptor table of a batch. The first invalid molecule fails the batch.
pub fn generate<S: AsRef<str>>(smiles: &[S]) -> Result<DescriptorTable, SolubilityError> {
    let mut table = DescriptorTable::new();
    for (i, s) in smiles.iter().enumerate() {
        let s = s.as_ref();
        table.push(s, describe(i + 1, s)?);
    }
    info!("Computed descriptors for {} molecules", table.len());
    Ok(table)
}

/// Like `generate`, but invalid molecules are left out of the table and
/// returned alongside it.
pub fn generate_lenient<S: AsRef<str>>(smiles: &[S]) -> (DescriptorTable, Vec<SolubilityError>) {
    let mut table = DescriptorTable::new();
    let mut skipped = Vec::new();
    for (i, s) in smiles.iter().enumerate() {
        let s = s.as_ref();
        match describe(i + 1, s) {
            Ok(descriptors) => table.push(s, descriptors),
            Err(e) => {
                warn!("Skipping molecule: {e}");
                skipped.push(e);
            }
        }
    }
    info!(
        "Computed descriptors for {} molecules, skipped {}",
        table.len(),
        skipped.len()
    );
    (table, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SmilesError;
    use approx::assert_abs_diff_eq;

    fn descriptors(smiles: &str) -> Descriptors {
        describe(1, smiles).unwrap()
    }

    #[test]
    fn test_methane() {
        let d = descriptors("C");
        assert_abs_diff_eq!(d.mol_wt, 16.043, epsilon = 1e-3);
        assert_eq!(d.num_rotatable_bonds, 0);
        assert_eq!(d.aromatic_proportion, 0.0);
    }

    #[test]
    fn test_ethanol() {
        let d = descriptors("CCO");
        assert_abs_diff_eq!(d.mol_log_p, -0.0014, epsilon = 1e-4);
        assert_abs_diff_eq!(d.mol_wt, 46.069, epsilon = 1e-3);
        assert_eq!(d.num_rotatable_bonds, 0);
        assert_eq!(d.aromatic_proportion, 0.0);
    }

    #[test]
    fn test_aromatic_proportion() {
        assert_eq!(descriptors("c1ccccc1").aromatic_proportion, 1.0);
        assert_eq!(descriptors("C1=CC=CC=C1").aromatic_proportion, 1.0);
        assert_eq!(descriptors("CC").aromatic_proportion, 0.0);
        assert_abs_diff_eq!(descriptors("Cc1ccccc1").aromatic_proportion, 6.0 / 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(descriptors("COc1ccccc1").aromatic_proportion, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_with_explicit_hydrogens() {
        assert_abs_diff_eq!(
            descriptors("[H]C([H])([H])[H]").mol_wt,
            descriptors("C").mol_wt,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(descriptors("ClC(Cl)Cl").mol_wt, 119.378, epsilon = 1e-3);
        assert_abs_diff_eq!(descriptors("[13CH4]").mol_wt, 16.043, epsilon = 1e-3);
    }

    #[test]
    fn test_degenerate_molecules() {
        assert!(matches!(
            describe(3, ""),
            Err(SolubilityError::DegenerateMolecule { line: 3, .. })
        ));
        assert!(matches!(
            describe(1, "[H][H]"),
            Err(SolubilityError::DegenerateMolecule { line: 1, .. })
        ));
    }

    #[test]
    fn test_generate_preserves_order() {
        let table = generate(&["CCO", "c1ccccc1", "C"]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.smiles, vec!["CCO", "c1ccccc1", "C"]);
        assert_eq!(table.columns, Descriptors::COLUMNS);
        assert_eq!(table.rows[1][3], 1.0);
        assert_abs_diff_eq!(table.rows[2][1], 16.043, epsilon = 1e-3);
    }

    #[test]
    fn test_generate_fails_on_first_invalid_line() {
        let err = generate(&["CCO", "C1CC", "C(("]).unwrap_err();
        assert_eq!(err.line(), Some(2));
        match err {
            SolubilityError::Parse { smiles, source, .. } => {
                assert_eq!(smiles, "C1CC");
                assert!(matches!(source, SmilesError::UnclosedRing(1, _)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_generate_lenient_skips_and_reports() {
        let (table, skipped) = generate_lenient(&["CCO", "Xx", "[H][H]", "CC"]);
        assert_eq!(table.smiles, vec!["CCO", "CC"]);
        let lines: Vec<_> = skipped.iter().filter_map(|e| e.line()).collect();
        assert_eq!(lines, vec![2, 3]);
    }
}
