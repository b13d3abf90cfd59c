use std::io;

use thiserror::Error;

/// Errors raised while loading or constructing a pipeline artifact.
///
/// Every variant is fatal at startup: a process holding no valid artifact
/// must not serve predictions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArtifactError {
    /// The artifact file does not exist.
    #[error("artifact file not found: {0}")]
    NotFound(String),
    /// The file exists but could not be read.
    #[error("failed to read artifact: {0}")]
    Io(String),
    /// The file is not valid JSON or a section has the wrong shape.
    #[error("failed to parse artifact: {0}")]
    Parse(String),
    /// A required top-level key is absent.
    #[error("artifact is missing required key '{0}'")]
    MissingKey(&'static str),
    /// `format_version` is not one this build understands.
    #[error("unsupported artifact format version: {0}")]
    UnsupportedVersion(u64),
    /// The sections are present but inconsistent with each other.
    #[error("invalid artifact: {0}")]
    Invalid(String),
    /// The clustering model does not have the configured number of clusters.
    #[error("expected {expected} clusters, artifact has {actual}")]
    ClusterCount { expected: usize, actual: usize },
}

impl From<io::Error> for ArtifactError {
    fn from(err: io::Error) -> Self {
        ArtifactError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ArtifactError {
    fn from(err: serde_json::Error) -> Self {
        ArtifactError::Parse(err.to_string())
    }
}

/// Errors raised while preprocessing a feature vector with a loaded artifact.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransformError {
    /// The caller's feature order differs from the order the scaler was fit with.
    #[error("feature schema mismatch: artifact expects {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// Value count differs from the schema length.
    #[error("expected {expected} values, got {actual}")]
    Dimension { expected: usize, actual: usize },
    /// `ln(1 + x)` is undefined or infinite for this value (`x <= -1`).
    #[error("log transform undefined for '{feature}' = {value}")]
    Domain { feature: String, value: f64 },
    /// Scaling produced NaN or infinity.
    #[error("scaled value for '{feature}' is not finite (input {value})")]
    NonFinite { feature: String, value: f64 },
    /// The distance to the nearest centroid does not fit in an `f64`.
    #[error("distance to centroid {label} is not finite")]
    NonFiniteDistance { label: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_message() {
        let err: ArtifactError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err, ArtifactError::Io("denied".into()));
    }

    #[test]
    fn json_errors_become_parse() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ArtifactError = json_err.into();
        assert!(matches!(err, ArtifactError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse artifact"));
    }

    #[test]
    fn domain_error_names_feature() {
        let err = TransformError::Domain {
            feature: "chlorides".into(),
            value: -2.0,
        };
        assert_eq!(err.to_string(), "log transform undefined for 'chlorides' = -2");
    }
}
