use crate::SmilesError;
use thiserror::Error;

/// Everything that can end a prediction run.
#[derive(Error, Debug)]
pub enum SolubilityError {
    #[error("line {line}: could not parse SMILES '{smiles}'")]
    Parse {
        line: usize,
        smiles: String,
        #[source]
        source: SmilesError,
    },

    #[error("line {line}: molecule '{smiles}' has no heavy atoms")]
    DegenerateMolecule { line: usize, smiles: String },

    #[error("could not fetch training data from {location}: {reason}")]
    DataFetch { location: String, reason: String },

    #[error("descriptor columns {found:?} do not match the training features {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("malformed training data: {0}")]
    Dataset(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SolubilityError {
    /// The 1-based input line the error refers to, for per-molecule errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } | Self::DegenerateMolecule { line, .. } => Some(*line),
            _ => None,
        }
    }
}
