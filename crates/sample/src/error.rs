//! Error types produced by the sample crate.
//!
//! All errors are typed, cloneable and comparable so callers can match on
//! the exact failure and tests can assert on it.
//!
//! | Error | Recoverable | Description |
//! |-------|-------------|-------------|
//! | [`Incomplete`](SampleError::Incomplete) | yes, re-prompt | One or more fields unset |
//! | [`NonFinite`](SampleError::NonFinite) | yes, re-prompt | NaN or infinite measurement |
//! | [`UnknownFeature`](SampleError::UnknownFeature) | yes | Name outside the schema |
//! | [`DuplicateFeature`](SampleError::DuplicateFeature) | yes | Name supplied twice |
//! | [`Arity`](SampleError::Arity) | yes | Wrong number of values |

use thiserror::Error;

use crate::feature::Feature;

/// Errors raised while collecting a wine sample into a feature vector.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SampleError {
    /// At least one feature is unset under the active
    /// [`UnsetPolicy`](crate::UnsetPolicy). `missing` lists every unset
    /// feature in canonical order.
    #[error("incomplete sample, missing: {}", join_features(.missing))]
    Incomplete { missing: Vec<Feature> },

    /// A measurement is NaN or infinite.
    #[error("feature '{feature}' is not a finite number: {value}")]
    NonFinite { feature: Feature, value: f64 },

    /// A name that is not one of the eleven features.
    #[error("unknown feature name: {0}")]
    UnknownFeature(String),

    /// The same feature was supplied more than once.
    #[error("feature '{0}' supplied more than once")]
    DuplicateFeature(Feature),

    /// A positional vector of the wrong length.
    #[error("expected {expected} feature values, got {actual}")]
    Arity { expected: usize, actual: usize },
}

impl SampleError {
    /// True for the "field left empty" case, which interactive collectors
    /// answer with a warning and a re-prompt.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, SampleError::Incomplete { .. })
    }
}

fn join_features(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| f.column_name())
        .collect::<Vec<_>>()
        .join(", ")
}
