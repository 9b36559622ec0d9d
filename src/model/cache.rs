use super::{check_schema, train, ModelConfig, Regressor};
use crate::{DescriptorTable, SolubilityError, TrainingSet};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::*;

/// Fitted models keyed by a fingerprint of the training set and the model
/// settings, so repeated predictions against the same data skip retraining.
#[derive(Default)]
pub struct ModelCache {
    models: HashMap<String, Box<dyn Regressor>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(dataset: &TrainingSet, config: &ModelConfig) -> String {
        let mut hasher = Sha256::new();
        hasher.update(dataset.fingerprint().as_bytes());
        hasher.update(config.algorithm.to_string().as_bytes());
        hasher.update(format!("{:?}{:?}", config.forest, config.svr).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The model for this dataset and configuration, trained on first use.
    pub fn get_or_train(
        &mut self,
        dataset: &TrainingSet,
        config: &ModelConfig,
    ) -> Result<&dyn Regressor, SolubilityError> {
        let key = Self::key(dataset, config);
        if !self.models.contains_key(&key) {
            let model = train(dataset, config)?;
            self.models.insert(key.clone(), model);
        } else {
            debug!("Reusing cached {} model {}", config.algorithm, &key[..12]);
        }
        self.models
            .get(&key)
            .map(|model| model.as_ref())
            .ok_or_else(|| SolubilityError::Model("model cache lost an entry".to_owned()))
    }

    /// `train_and_predict`, reusing a cached model when one matches.
    pub fn predict(
        &mut self,
        dataset: &TrainingSet,
        table: &DescriptorTable,
        config: &ModelConfig,
    ) -> Result<Vec<f64>, SolubilityError> {
        check_schema(dataset, table)?;
        let model = self.get_or_train(dataset, config)?;
        Ok(model.predict_table(table))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}
