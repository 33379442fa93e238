use thiserror::Error;

/// Failures of a single `fit()` call. A failed fit never installs a
/// transform; whatever was fitted before stays in effect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("landmark count mismatch: {from} source vs {to} target points")]
    MismatchedLandmarkCount { from: usize, to: usize },

    #[error("degenerate landmark set: {0}")]
    DegenerateLandmarks(&'static str),

    #[error("fitted transform is singular and cannot be inverted")]
    SingularTransform,
}

/// Per-tick geometric faults. These are logged and the operation is
/// skipped for the tick; processing resumes on the next frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("coil distances are not sorted ascending from the tip")]
    UnsortedCoilDistances,

    #[error("coil distance count {distances} does not match curve point count {points}")]
    CountMismatch { distances: usize, points: usize },

    #[error("curve has {0} control points, need at least 2")]
    ShortCurve(usize),
}

/// A missing or invalid configuration key. Callers catch this at the
/// boundary, log it and fall back to the default value.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("missing or invalid parameter '{key}'")]
pub struct ParameterError {
    pub key: String,
}

impl ParameterError {
    pub fn new(key: impl Into<String>) -> Self {
        ParameterError { key: key.into() }
    }
}
