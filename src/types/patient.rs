//! Patient record input for heart-disease prediction

use serde::{Deserialize, Serialize};

/// Number of input features expected by every model and scaler.
pub const FEATURE_COUNT: usize = 13;

/// Canonical feature names, in the exact order the scalers and models
/// were fitted against.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach",
    "exang", "oldpeak", "slope", "ca", "thal",
];

/// Patient measurements used as model input.
///
/// Field order matches the training data format. Physiological range
/// checks belong to the input boundary, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years
    pub age: f64,

    /// Sex (1 = male, 0 = female)
    pub sex: u8,

    /// Chest pain type (0-3)
    pub cp: u8,

    /// Resting blood pressure (mm Hg)
    pub trestbps: f64,

    /// Serum cholesterol (mg/dl)
    pub chol: f64,

    /// Fasting blood sugar > 120 mg/dl (1 = true, 0 = false)
    pub fbs: u8,

    /// Resting ECG results (0-2)
    pub restecg: u8,

    /// Maximum heart rate achieved
    pub thalach: f64,

    /// Exercise-induced angina (1 = yes, 0 = no)
    pub exang: u8,

    /// ST depression induced by exercise
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment (0-2)
    pub slope: u8,

    /// Number of major vessels colored by fluoroscopy (0-3)
    pub ca: u8,

    /// Thalassemia (0 = normal, 1 = fixed defect, 2 = reversible defect)
    pub thal: u8,
}

impl PatientRecord {
    /// Flatten the record into the feature vector the models expect,
    /// in training order.
    pub fn to_features(&self) -> [f32; FEATURE_COUNT] {
        [
            self.age as f32,
            self.sex as f32,
            self.cp as f32,
            self.trestbps as f32,
            self.chol as f32,
            self.fbs as f32,
            self.restecg as f32,
            self.thalach as f32,
            self.exang as f32,
            self.oldpeak as f32,
            self.slope as f32,
            self.ca as f32,
            self.thal as f32,
        ]
    }
}
