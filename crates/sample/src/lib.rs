//! Wine sample collection layer.
//!
//! This crate owns the input side of the prediction pipeline: the fixed
//! eleven-feature schema, the raw sample an input collector produces, and
//! the completeness check that turns a raw sample into a [`FeatureVector`].
//!
//! ## What we check
//!
//! - Every feature is set under the active [`UnsetPolicy`]. All unset
//!   features are reported together, in canonical order.
//! - Every value is finite.
//!
//! Chemical plausibility is not checked. A pH of 12 is a valid sample here.
//!
//! ## Example
//!
//! ```rust
//! use sample::{collect, Feature, RawSample, SampleError, UnsetPolicy};
//!
//! let raw = RawSample::new()
//!     .with(Feature::FixedAcidity, 7.4)
//!     .with(Feature::CitricAcid, 0.0);
//!
//! match collect(&raw, UnsetPolicy::ZeroIsUnset) {
//!     Err(SampleError::Incomplete { missing }) => {
//!         assert!(missing.contains(&Feature::CitricAcid));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
use std::time::Instant;

use tracing::{debug, warn};

mod error;
mod feature;
mod types;

pub use crate::error::SampleError;
pub use crate::feature::{FEATURE_COUNT, FEATURE_NAMES, Feature};
pub use crate::types::{FeatureVector, RawSample, UnsetPolicy};

/// Validate a raw sample into a complete, finite [`FeatureVector`].
pub fn collect(raw: &RawSample, policy: UnsetPolicy) -> Result<FeatureVector, SampleError> {
    let start = Instant::now();

    let missing = raw.missing(policy);
    if !missing.is_empty() {
        let elapsed_micros = start.elapsed().as_micros();
        warn!(
            missing = missing.len(),
            first_missing = %missing[0],
            policy = ?policy,
            elapsed_micros,
            "sample_incomplete"
        );
        return Err(SampleError::Incomplete { missing });
    }

    let mut values = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        // Presence was checked above; `ExplicitPresence` never lets `None` through.
        let Some(value) = raw.get(feature) else {
            return Err(SampleError::Incomplete {
                missing: vec![feature],
            });
        };
        values[feature.index()] = value;
    }

    match FeatureVector::from_values(&values) {
        Ok(vector) => {
            debug!(elapsed_micros = start.elapsed().as_micros(), "sample_collected");
            Ok(vector)
        }
        Err(err) => {
            warn!(error = %err, "sample_invalid");
            Err(err)
        }
    }
}
