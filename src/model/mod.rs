mod forest;
pub use forest::{DecisionTree, RandomForest};

mod svr;
pub use svr::Svr;

mod cache;
pub use cache::ModelCache;

use crate::{DescriptorTable, SolubilityError, TrainingSet};
use serde::Deserialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::*;

/// A fitted regression model.
pub trait Regressor {
    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict_table(&self, table: &DescriptorTable) -> Vec<f64> {
        table.rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    RandomForest,
    Svr,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Algorithm::RandomForest => write!(f, "random-forest"),
            Algorithm::Svr => write!(f, "svr"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = SolubilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random-forest" | "randomforest" | "rf" => Ok(Algorithm::RandomForest),
            "svr" => Ok(Algorithm::Svr),
            other => Err(SolubilityError::Config(format!("unknown algorithm '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// RBF kernel width.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))` over every element of the training matrix.
    #[default]
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

impl FromStr for Gamma {
    type Err = SolubilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scale" => Ok(Gamma::Scale),
            "auto" => Ok(Gamma::Auto),
            other => match other.parse::<f64>() {
                Ok(v) if v > 0.0 && v.is_finite() => Ok(Gamma::Value(v)),
                _ => Err(SolubilityError::Config(format!(
                    "gamma must be \"scale\", \"auto\" or a positive number, not '{other}'"
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvrParams {
    pub c: f64,
    pub epsilon: f64,
    pub gamma: Gamma,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SvrParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: Gamma::Scale,
            tolerance: 1e-3,
            max_iterations: 10_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelConfig {
    pub algorithm: Algorithm,
    /// Reuse fitted models across calls through a `ModelCache`.
    pub cache: bool,
    pub forest: ForestParams,
    pub svr: SvrParams,
}

/// Validate the training matrix and return its width.
fn check_training_input(features: &[Vec<f64>], labels: &[f64]) -> Result<usize, SolubilityError> {
    if features.is_empty() {
        return Err(SolubilityError::Model("cannot train on zero rows".to_owned()));
    }
    if features.len() != labels.len() {
        return Err(SolubilityError::Model(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    let width = features[0].len();
    if width == 0 || features.iter().any(|row| row.len() != width) {
        return Err(SolubilityError::Model("feature rows must share a non-zero width".to_owned()));
    }
    Ok(width)
}

/// Fail unless the descriptor columns are exactly the training features, in order.
pub fn check_schema(dataset: &TrainingSet, table: &DescriptorTable) -> Result<(), SolubilityError> {
    let width_mismatch = table.rows.iter().any(|row| row.len() != dataset.n_features());
    if dataset.columns != table.columns || width_mismatch {
        return Err(SolubilityError::FeatureMismatch {
            expected: dataset.columns.clone(),
            found: table.columns.clone(),
        });
    }
    Ok(())
}

/// Fit the configured algorithm on the whole training set.
pub fn train(dataset: &TrainingSet, config: &ModelConfig) -> Result<Box<dyn Regressor>, SolubilityError> {
    info!(
        "Training {} on {} rows of {} features",
        config.algorithm,
        dataset.len(),
        dataset.n_features()
    );
    Ok(match config.algorithm {
        Algorithm::RandomForest => Box::new(RandomForest::fit(
            &dataset.features,
            &dataset.labels,
            &config.forest,
        )?),
        Algorithm::Svr => Box::new(Svr::fit(&dataset.features, &dataset.labels, &config.svr)?),
    })
}

/// Fit a fresh model and predict one LogS per descriptor row, in row order.
pub fn train_and_predict(
    dataset: &TrainingSet,
    table: &DescriptorTable,
    config: &ModelConfig,
) -> Result<Vec<f64>, SolubilityError> {
    check_schema(dataset, table)?;
    let model = train(dataset, config)?;
    Ok(model.predict_table(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;

    const SAMPLE: &str = include_str!("../../tests/fixtures/delaney-sample.csv");

    fn sample() -> TrainingSet {
        TrainingSet::from_reader(SAMPLE.as_bytes(), "logS").unwrap()
    }

    fn small_forest() -> ModelConfig {
        ModelConfig {
            forest: ForestParams {
                n_estimators: 25,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_prediction_lengths() {
        let dataset = sample();
        let table = generate(&["CCO", "c1ccccc1", "CCCCCC", "ClC(Cl)Cl"]).unwrap();
        for algorithm in [Algorithm::RandomForest, Algorithm::Svr] {
            let config = ModelConfig {
                algorithm,
                ..small_forest()
            };
            let predictions = train_and_predict(&dataset, &table, &config).unwrap();
            assert_eq!(predictions.len(), table.len());
            assert!(predictions.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_forest_is_deterministic() {
        let dataset = sample();
        let table = generate(&["CCO", "Cc1ccccc1", "CCOC(C)=O"]).unwrap();
        let first = train_and_predict(&dataset, &table, &small_forest()).unwrap();
        let second = train_and_predict(&dataset, &table, &small_forest()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ethanol_end_to_end() {
        let dataset = sample();
        let table = generate(&["CCO"]).unwrap();
        assert_eq!(table.rows[0][2], 0.0);
        assert_eq!(table.rows[0][3], 0.0);
        let predictions = train_and_predict(&dataset, &table, &ModelConfig::default()).unwrap();
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0].is_finite());
    }

    #[test]
    fn test_feature_mismatch() {
        let dataset = TrainingSet::from_reader(
            "MolWt,MolLogP,NumRotatableBonds,AromaticProportion,logS\n1,2,3,4,5\n".as_bytes(),
            "logS",
        )
        .unwrap();
        let table = generate(&["CCO"]).unwrap();
        let err = train_and_predict(&dataset, &table, &small_forest()).unwrap_err();
        match err {
            SolubilityError::FeatureMismatch { expected, found } => {
                assert_eq!(expected[0], "MolWt");
                assert_eq!(found[0], "MolLogP");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_algorithm_and_gamma() {
        assert_eq!("svr".parse::<Algorithm>().unwrap(), Algorithm::Svr);
        assert_eq!("Random-Forest".parse::<Algorithm>().unwrap(), Algorithm::RandomForest);
        assert!("knn".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::RandomForest.to_string(), "random-forest");

        assert_eq!("scale".parse::<Gamma>().unwrap(), Gamma::Scale);
        assert_eq!("auto".parse::<Gamma>().unwrap(), Gamma::Auto);
        assert_eq!("0.5".parse::<Gamma>().unwrap(), Gamma::Value(0.5));
        assert!("-1".parse::<Gamma>().is_err());
    }

    #[test]
    fn test_bad_training_input() {
        assert!(check_training_input(&[], &[]).is_err());
        assert!(check_training_input(&[vec![1.0], vec![1.0, 2.0]], &[0.0, 1.0]).is_err());
        assert_eq!(check_training_input(&[vec![1.0, 2.0]], &[0.0]).unwrap(), 2);
    }
}
