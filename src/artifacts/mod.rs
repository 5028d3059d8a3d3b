//! Model and scaler artifact loading

pub mod key;
pub mod onnx;
pub mod scaler;
pub mod store;

pub use key::{ModelFamily, ModelKey, ScalingKind};
pub use onnx::{Classifier, OnnxClassifier};
pub use scaler::{FeatureScaler, ScalerKind};
pub use store::ArtifactStore;
