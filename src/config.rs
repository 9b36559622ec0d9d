use crate::{
    Algorithm, ForestParams, Gamma, ModelConfig, SolubilityError, SvrParams, DEFAULT_LABEL_COLUMN,
    DELANEY_URL,
};
use serde::Deserialize;
use std::path::Path;
use tracing::*;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDatasetConfig {
    source: Option<String>,
    label_column: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialForestConfig {
    n_estimators: Option<usize>,
    seed: Option<u64>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    min_samples_leaf: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum PartialGamma {
    Value(f64),
    Name(String),
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSvrConfig {
    c: Option<f64>,
    epsilon: Option<f64>,
    gamma: Option<PartialGamma>,
    tolerance: Option<f64>,
    max_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialModelConfig {
    algorithm: Option<Algorithm>,
    cache: Option<bool>,
    random_forest: Option<PartialForestConfig>,
    svr: Option<PartialSvrConfig>,
}

/// The configuration file as written; every key is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    dataset: Option<PartialDatasetConfig>,
    model: Option<PartialModelConfig>,
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub algorithm: Option<Algorithm>,
    pub dataset: Option<String>,
    pub n_estimators: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub source: String,
    pub label_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: DELANEY_URL.to_owned(),
            label_column: DEFAULT_LABEL_COLUMN.to_owned(),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self, SolubilityError> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| SolubilityError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Resolve against the built-in defaults, letting `overrides` win.
    pub fn merge(self, overrides: &Overrides) -> Result<AppConfig, SolubilityError> {
        let dataset = self.dataset.unwrap_or_default();
        let model = self.model.unwrap_or_default();
        let forest = model.random_forest.unwrap_or_default();
        let svr = model.svr.unwrap_or_default();
        let defaults = AppConfig::default();

        let dataset = DatasetConfig {
            source: overrides
                .dataset
                .clone()
                .or(dataset.source)
                .unwrap_or(defaults.dataset.source),
            label_column: dataset.label_column.unwrap_or(defaults.dataset.label_column),
        };

        let forest_defaults = ForestParams::default();
        let forest = ForestParams {
            n_estimators: overrides
                .n_estimators
                .or(forest.n_estimators)
                .unwrap_or(forest_defaults.n_estimators),
            seed: overrides.seed.or(forest.seed).unwrap_or(forest_defaults.seed),
            max_depth: forest.max_depth.or(forest_defaults.max_depth),
            min_samples_split: forest
                .min_samples_split
                .unwrap_or(forest_defaults.min_samples_split),
            min_samples_leaf: forest
                .min_samples_leaf
                .unwrap_or(forest_defaults.min_samples_leaf),
        };

        let svr_defaults = SvrParams::default();
        let gamma = match svr.gamma {
            None => svr_defaults.gamma,
            Some(PartialGamma::Value(v)) if v > 0.0 && v.is_finite() => Gamma::Value(v),
            Some(PartialGamma::Value(v)) => {
                return Err(SolubilityError::Config(format!(
                    "`model.svr.gamma` must be positive, not {v}"
                )))
            }
            Some(PartialGamma::Name(name)) => name.parse::<Gamma>()?,
        };
        let svr = SvrParams {
            c: svr.c.unwrap_or(svr_defaults.c),
            epsilon: svr.epsilon.unwrap_or(svr_defaults.epsilon),
            gamma,
            tolerance: svr.tolerance.unwrap_or(svr_defaults.tolerance),
            max_iterations: svr.max_iterations.unwrap_or(svr_defaults.max_iterations),
        };

        let config = AppConfig {
            dataset,
            model: ModelConfig {
                algorithm: overrides
                    .algorithm
                    .or(model.algorithm)
                    .unwrap_or_default(),
                cache: model.cache.unwrap_or(false),
                forest,
                svr,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

impl AppConfig {
    /// Read `path` if given and apply `overrides` on top.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, SolubilityError> {
        let partial = match path {
            Some(path) => PartialConfig::from_file(path)?,
            None => PartialConfig::default(),
        };
        partial.merge(overrides)
    }

    fn validate(&self) -> Result<(), SolubilityError> {
        let fail = |msg: &str| Err(SolubilityError::Config(msg.to_owned()));
        let forest = &self.model.forest;
        let svr = &self.model.svr;
        if self.dataset.source.trim().is_empty() {
            return fail("`dataset.source` must not be empty");
        }
        if forest.n_estimators == 0 {
            return fail("`model.random-forest.n-estimators` must be at least 1");
        }
        if forest.min_samples_split < 2 {
            return fail("`model.random-forest.min-samples-split` must be at least 2");
        }
        if forest.min_samples_leaf == 0 {
            return fail("`model.random-forest.min-samples-leaf` must be at least 1");
        }
        if forest.max_depth == Some(0) {
            return fail("`model.random-forest.max-depth` must be at least 1");
        }
        if svr.c.is_nan() || svr.c <= 0.0 {
            return fail("`model.svr.c` must be positive");
        }
        if svr.epsilon.is_nan() || svr.epsilon < 0.0 {
            return fail("`model.svr.epsilon` must not be negative");
        }
        if svr.tolerance.is_nan() || svr.tolerance <= 0.0 {
            return fail("`model.svr.tolerance` must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn merged(toml: &str, overrides: &Overrides) -> Result<AppConfig, SolubilityError> {
        PartialConfig::from_toml(toml).unwrap().merge(overrides)
    }

    #[test]
    fn test_defaults() {
        let config = merged("", &Overrides::default()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.dataset.source, DELANEY_URL);
        assert_eq!(config.model.algorithm, Algorithm::RandomForest);
        assert_eq!(config.model.forest.n_estimators, 500);
        assert_eq!(config.model.forest.seed, 42);
        assert_eq!(config.model.svr.gamma, Gamma::Scale);
        assert!(!config.model.cache);
    }

    #[test]
    fn test_file_values() {
        let toml = r#"
            [dataset]
            source = "data/delaney.csv"
            label-column = "measured"

            [model]
            algorithm = "svr"
            cache = true

            [model.random-forest]
            n-estimators = 100
            max-depth = 8

            [model.svr]
            c = 10
            gamma = "auto"
        "#;
        let config = merged(toml, &Overrides::default()).unwrap();
        assert_eq!(config.dataset.source, "data/delaney.csv");
        assert_eq!(config.dataset.label_column, "measured");
        assert_eq!(config.model.algorithm, Algorithm::Svr);
        assert!(config.model.cache);
        assert_eq!(config.model.forest.n_estimators, 100);
        assert_eq!(config.model.forest.max_depth, Some(8));
        assert_eq!(config.model.forest.seed, 42);
        assert_eq!(config.model.svr.c, 10.0);
        assert_eq!(config.model.svr.gamma, Gamma::Auto);
        assert_eq!(config.model.svr.epsilon, 0.1);
    }

    #[test]
    fn test_numeric_gamma() {
        let config = merged("[model.svr]\ngamma = 0.25\n", &Overrides::default()).unwrap();
        assert_eq!(config.model.svr.gamma, Gamma::Value(0.25));
    }

    #[test]
    fn test_cli_overrides_win() {
        let toml = "[dataset]\nsource = \"a.csv\"\n[model]\nalgorithm = \"svr\"\n[model.random-forest]\nseed = 1\n";
        let overrides = Overrides {
            algorithm: Some(Algorithm::RandomForest),
            dataset: Some("b.csv".to_owned()),
            n_estimators: Some(5),
            seed: Some(9),
        };
        let config = merged(toml, &overrides).unwrap();
        assert_eq!(config.dataset.source, "b.csv");
        assert_eq!(config.model.algorithm, Algorithm::RandomForest);
        assert_eq!(config.model.forest.n_estimators, 5);
        assert_eq!(config.model.forest.seed, 9);
    }

    #[test]
    fn test_rejected_files() {
        assert!(PartialConfig::from_toml("[model]\nalgorithm = \"knn\"\n").is_err());
        assert!(PartialConfig::from_toml("[model]\nlearning-rate = 0.1\n").is_err());
        assert!(PartialConfig::from_toml("[output]\nformat = \"csv\"\n").is_err());

        let invalid = merged("[model.random-forest]\nn-estimators = 0\n", &Overrides::default());
        assert!(matches!(invalid, Err(SolubilityError::Config(_))));
        let invalid = merged("[model.svr]\ngamma = \"wide\"\n", &Overrides::default());
        assert!(matches!(invalid, Err(SolubilityError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model]\nalgorithm = \"svr\"").unwrap();
        let config = AppConfig::load(Some(file.path()), &Overrides::default()).unwrap();
        assert_eq!(config.model.algorithm, Algorithm::Svr);

        let missing = AppConfig::load(Some(Path::new("/no/such/config.toml")), &Overrides::default());
        assert!(matches!(missing, Err(SolubilityError::Io(_))));
    }
}
