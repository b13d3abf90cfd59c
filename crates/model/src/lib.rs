//! Fitted preprocessing and clustering for wine samples.
//!
//! A [`PipelineArtifact`] bundles everything learned offline:
//!
//! 1. the feature schema (column order the model was fit with),
//! 2. the columns that receive `ln(1 + x)` before scaling,
//! 3. a fitted [`Scaler`],
//! 4. a fitted [`KMeans`] model.
//!
//! The crate knows nothing about wine. It works on schema names plus
//! ordered `f64` values, so the same artifact format can serve any fixed
//! numeric schema.
//!
//! ```rust
//! use model::{KMeans, PipelineArtifact, Scaler};
//!
//! let artifact = PipelineArtifact::new(
//!     vec!["x".into(), "y".into()],
//!     vec!["y".into()],
//!     Scaler::Standard { mean: vec![0.0, 0.0], scale: vec![1.0, 1.0] },
//!     KMeans::from_rows(vec![vec![0.0, 0.0], vec![5.0, 5.0]])?,
//! )?;
//!
//! let scaled = artifact.transform(&["x", "y"], &[4.0, 100.0])?;
//! let hit = artifact.clustering().assign(scaled.view())?;
//! assert_eq!(hit.label, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod artifact;
mod error;
mod kmeans;
mod scaler;

pub use crate::artifact::{ArtifactLoadOptions, ArtifactSummary, FORMAT_VERSION, PipelineArtifact};
pub use crate::error::{ArtifactError, TransformError};
pub use crate::kmeans::{ClusterAssignment, KMeans, KMeansSpec};
pub use crate::scaler::Scaler;
