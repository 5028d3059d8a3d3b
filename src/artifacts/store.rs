//! Read-only catalog of model and scaler artifacts

use crate::artifacts::key::ModelKey;
use crate::artifacts::onnx::{Classifier, OnnxClassifier};
use crate::artifacts::scaler::{FeatureScaler, ScalerKind};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, warn};

/// Immutable catalog of loaded artifacts.
///
/// Loaded once at startup and shared read-only by all predictions; there is
/// no reload path. A missing artifact file leaves a gap in the catalog; a
/// corrupt one aborts that entry's load, is recorded in `load_errors`, and
/// does not stop the rest of the catalog from loading.
pub struct ArtifactStore {
    models: BTreeMap<ModelKey, Box<dyn Classifier>>,
    scalers: BTreeMap<ScalerKind, FeatureScaler>,
    load_errors: Vec<(String, String)>,
}

impl ArtifactStore {
    /// Load all canonical artifacts found under `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        ort::init().commit()?;

        let mut scalers = BTreeMap::new();
        let mut load_errors = Vec::new();

        for kind in ScalerKind::ALL {
            let path = dir.join(kind.filename());
            if !path.exists() {
                warn!(scaler = %kind, path = %path.display(), "Scaler artifact not found");
                continue;
            }
            match FeatureScaler::load(&path, kind) {
                Ok(scaler) => {
                    scalers.insert(kind, scaler);
                }
                Err(e) => {
                    error!(scaler = %kind, error = %e, "Corrupt scaler artifact, entry skipped");
                    load_errors.push((kind.filename().to_string(), e.to_string()));
                }
            }
        }

        let mut models: BTreeMap<ModelKey, Box<dyn Classifier>> = BTreeMap::new();

        for key in ModelKey::catalog() {
            let path = dir.join(key.model_filename());
            if !path.exists() {
                warn!(model = %key, path = %path.display(), "Model artifact not found");
                continue;
            }
            match OnnxClassifier::load(&path, key) {
                Ok(model) => {
                    models.insert(key, Box::new(model));
                }
                Err(e) => {
                    error!(model = %key, error = %e, "Corrupt model artifact, entry skipped");
                    load_errors.push((key.model_filename(), e.to_string()));
                }
            }
        }

        if models.is_empty() {
            warn!(path = %dir.display(), "No model artifacts loaded, catalog is empty");
        }

        info!(
            models = models.len(),
            scalers = scalers.len(),
            errors = load_errors.len(),
            "Artifact catalog loaded from {}",
            dir.display()
        );

        Ok(Self {
            models,
            scalers,
            load_errors,
        })
    }

    /// Look up a model by key.
    pub fn get_model(&self, key: &ModelKey) -> Option<&dyn Classifier> {
        self.models.get(key).map(|m| m.as_ref())
    }

    /// Look up a fitted scaler.
    pub fn get_scaler(&self, kind: ScalerKind) -> Option<&FeatureScaler> {
        self.scalers.get(&kind)
    }

    /// Iterate over all loaded models, in catalog order.
    pub fn models(&self) -> impl Iterator<Item = (ModelKey, &dyn Classifier)> {
        self.models.iter().map(|(k, m)| (*k, m.as_ref()))
    }

    /// Keys of all successfully loaded models, in catalog order.
    pub fn model_keys(&self) -> Vec<ModelKey> {
        self.models.keys().copied().collect()
    }

    /// Number of successfully loaded models.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of successfully loaded scalers.
    pub fn scaler_count(&self) -> usize {
        self.scalers.len()
    }

    /// Artifacts that existed on disk but failed to load, as
    /// (filename, reason) pairs.
    pub fn load_errors(&self) -> &[(String, String)] {
        &self.load_errors
    }

    /// Build a store directly from parts, bypassing the filesystem.
    #[cfg(test)]
    pub(crate) fn from_parts(
        models: BTreeMap<ModelKey, Box<dyn Classifier>>,
        scalers: BTreeMap<ScalerKind, FeatureScaler>,
    ) -> Self {
        Self {
            models,
            scalers,
            load_errors: Vec::new(),
        }
    }
}
