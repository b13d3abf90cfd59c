//! Fitted per-feature scalers.
//!
//! Both variants are affine, per-feature, and carry parameters learned
//! offline. Zero-width ranges and zero scales divide by one instead of
//! zero, which is what the fitting side does for constant features.

use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// A fitted feature scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `x' = (x - data_min) / (data_max - data_min) * (hi - lo) + lo`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    /// `x' = (x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn kind(&self) -> &'static str {
        match self {
            Scaler::MinMax { .. } => "min_max",
            Scaler::Standard { .. } => "standard",
        }
    }

    /// Number of features the scaler was fit on.
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::MinMax { data_min, .. } => data_min.len(),
            Scaler::Standard { mean, .. } => mean.len(),
        }
    }

    /// Check parameter shapes against the artifact schema width.
    pub fn validate(&self, n_features: usize) -> Result<(), ArtifactError> {
        let (name_a, a, name_b, b) = match self {
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(ArtifactError::Invalid(format!(
                        "min_max feature_range must satisfy lo < hi, got ({lo}, {hi})"
                    )));
                }
                ("data_min", data_min, "data_max", data_max)
            }
            Scaler::Standard { mean, scale } => ("mean", mean, "scale", scale),
        };

        for (name, params) in [(name_a, a), (name_b, b)] {
            if params.len() != n_features {
                return Err(ArtifactError::Invalid(format!(
                    "scaler {name} has {} entries, schema has {n_features} features",
                    params.len()
                )));
            }
            if let Some(pos) = params.iter().position(|v| !v.is_finite()) {
                return Err(ArtifactError::Invalid(format!(
                    "scaler {name}[{pos}] is not finite"
                )));
            }
        }
        Ok(())
    }

    /// Apply the scaler. `input` must have [`n_features`](Self::n_features) entries.
    pub fn transform(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                let mut out = input.to_owned();
                Zip::from(&mut out)
                    .and(ArrayView1::from(data_min.as_slice()))
                    .and(ArrayView1::from(data_max.as_slice()))
                    .for_each(|x, &min, &max| {
                        let std = (*x - min) / non_zero(max - min);
                        *x = std * (hi - lo) + lo;
                    });
                out
            }
            Scaler::Standard { mean, scale } => {
                let mut out = input.to_owned();
                Zip::from(&mut out)
                    .and(ArrayView1::from(mean.as_slice()))
                    .and(ArrayView1::from(scale.as_slice()))
                    .for_each(|x, &mean, &scale| {
                        *x = (*x - mean) / non_zero(scale);
                    });
                out
            }
        }
    }
}

fn non_zero(v: f64) -> f64 {
    if v == 0.0 { 1.0 } else { v }
}
