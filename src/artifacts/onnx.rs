//! ONNX-backed classifier artifacts

use crate::artifacts::key::ModelKey;
use crate::error::{EngineError, Result};
use crate::types::FEATURE_COUNT;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// A fitted binary classifier.
///
/// Probability output is an explicit capability: callers query
/// `supports_probability` before asking for one, so "no such capability"
/// never has to be inferred from a failed call.
pub trait Classifier: Send + Sync {
    /// Predict a label in {0, 1} for an already-scaled feature vector.
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<u8>;

    /// Whether this model can produce a probability for its prediction.
    fn supports_probability(&self) -> bool;

    /// Probability of the given label. Only meaningful when
    /// `supports_probability` returns true.
    fn probability_of(&self, features: &[f32; FEATURE_COUNT], label: u8) -> Result<f64>;
}

/// Classifier backed by an ONNX Runtime session.
///
/// sklearn-exported models carry a `label` output and, for probabilistic
/// models, a probability output that is either a tensor or a seq(map).
pub struct OnnxClassifier {
    key: ModelKey,
    // Session::run takes &mut self
    session: RwLock<Session>,
    input_name: String,
    label_output: String,
    probability_output: Option<String>,
}

impl OnnxClassifier {
    /// Load an ONNX model artifact from file.
    pub fn load(path: &Path, key: ModelKey) -> Result<Self> {
        debug!(model = %key, path = %path.display(), "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(path)
            .map_err(|e| EngineError::ArtifactCorrupt {
                name: key.model_filename(),
                reason: e.to_string(),
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output_label".to_string());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        info!(
            model = %key,
            input = %input_name,
            label_output = %label_output,
            has_probability = probability_output.is_some(),
            "Model loaded"
        );

        Ok(Self {
            key,
            session: RwLock::new(session),
            input_name,
            label_output,
            probability_output,
        })
    }

    fn run(
        &self,
        features: &[f32; FEATURE_COUNT],
        extract: impl FnOnce(&SessionOutputs) -> Result<f64>,
    ) -> Result<f64> {
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))?;

        let mut session = self
            .session
            .write()
            .map_err(|e| EngineError::Prediction(format!("lock error: {e}")))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;
        extract(&outputs)
    }

    /// Pull the probability of `label` from a probability output that is
    /// either a [1, n_classes] tensor or a seq(map(int64, float)).
    fn extract_probability(outputs: &SessionOutputs, output_name: &str, label: u8) -> Result<f64> {
        let output = outputs.get(output_name).ok_or_else(|| {
            EngineError::Prediction(format!("output '{output_name}' missing from session"))
        })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let n_classes = *dims.last().unwrap_or(&0) as usize;
            let idx = label as usize;
            if idx < n_classes && idx < data.len() {
                return Ok(f64::from(data[idx]));
            }
            return Err(EngineError::Prediction(format!(
                "probability tensor has {n_classes} classes, wanted label {label}"
            )));
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            let allocator = Allocator::default();
            let sequence = output
                .downcast_ref::<DynSequenceValueType>()
                .map_err(|e| EngineError::Prediction(format!("not a sequence: {e}")))?;
            let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
            let map_value = maps
                .first()
                .ok_or_else(|| EngineError::Prediction("empty probability sequence".into()))?;

            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
            for (class_id, prob) in &kv_pairs {
                if *class_id == i64::from(label) {
                    return Ok(f64::from(*prob));
                }
            }
            return Err(EngineError::Prediction(format!(
                "class {label} missing from probability map"
            )));
        }

        Err(EngineError::Prediction(format!(
            "unsupported probability output format for '{output_name}'"
        )))
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<u8> {
        let key = self.key;
        let label_output = self.label_output.clone();

        let label = self.run(features, |outputs| {
            let output = outputs.get(&label_output).ok_or_else(|| {
                EngineError::Prediction(format!("output '{label_output}' missing from session"))
            })?;

            // sklearn exports labels as int64 tensors; fall back to f32.
            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                let v = *data.first().ok_or_else(|| {
                    EngineError::Prediction("empty label tensor".into())
                })?;
                return Ok(v as f64);
            }
            let (_, data) = output.try_extract_tensor::<f32>()?;
            let v = *data.first().ok_or_else(|| {
                EngineError::Prediction("empty label tensor".into())
            })?;
            Ok(f64::from(v))
        })?;

        debug!(model = %key, label = label, "Label predicted");
        Ok(u8::from(label != 0.0))
    }

    fn supports_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    fn probability_of(&self, features: &[f32; FEATURE_COUNT], label: u8) -> Result<f64> {
        let output_name = self.probability_output.clone().ok_or_else(|| {
            EngineError::Prediction(format!("model '{}' has no probability output", self.key))
        })?;

        self.run(features, |outputs| {
            Self::extract_probability(outputs, &output_name, label)
        })
    }
}
