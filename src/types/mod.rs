//! Boundary data types

pub mod patient;
pub mod report;

pub use patient::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
pub use report::{
    Consensus, EnsembleReport, HealthStatus, ModelOutcome, RiskLevel, ServiceStatus,
};
