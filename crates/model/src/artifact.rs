//! The fitted pipeline artifact and its JSON file format.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "feature_names": ["fixed acidity", "...", "alcohol"],
//!   "log_transform_cols": ["residual sugar", "chlorides"],
//!   "scaler": { "kind": "min_max", "data_min": [...], "data_max": [...] },
//!   "kmeans": { "centroids": [[...], [...]] }
//! }
//! ```
//!
//! `feature_names` is the column order the scaler and centroids were fit
//! with. Callers must present values in exactly this order; see
//! [`PipelineArtifact::check_schema`].

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ArtifactError, TransformError};
use crate::kmeans::{KMeans, KMeansSpec};
use crate::scaler::Scaler;

/// Highest artifact format this build reads.
pub const FORMAT_VERSION: u64 = 1;

const REQUIRED_KEYS: [&str; 4] = ["feature_names", "log_transform_cols", "scaler", "kmeans"];

fn default_format_version() -> u64 {
    FORMAT_VERSION
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactFile {
    #[serde(default = "default_format_version")]
    format_version: u64,
    feature_names: Vec<String>,
    log_transform_cols: Vec<String>,
    scaler: Scaler,
    kmeans: KMeansSpec,
}

/// Extra checks applied while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactLoadOptions {
    /// When set, the clustering model must have exactly this many centroids.
    pub expected_clusters: Option<usize>,
}

/// Fitted scaler + clustering model + log-transform columns + feature schema.
///
/// Immutable once built. Preprocessing and assignment take `&self`, so one
/// artifact can be shared across threads without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineArtifact {
    feature_names: Vec<String>,
    log_transform_cols: Vec<String>,
    log_mask: Vec<bool>,
    scaler: Scaler,
    kmeans: KMeans,
}

impl PipelineArtifact {
    /// Assemble and validate an artifact from its parts.
    pub fn new(
        feature_names: Vec<String>,
        log_transform_cols: Vec<String>,
        scaler: Scaler,
        kmeans: KMeans,
    ) -> Result<Self, ArtifactError> {
        if feature_names.is_empty() {
            return Err(ArtifactError::Invalid("feature_names is empty".into()));
        }
        for (idx, name) in feature_names.iter().enumerate() {
            if feature_names[..idx].contains(name) {
                return Err(ArtifactError::Invalid(format!(
                    "feature '{name}' appears more than once in feature_names"
                )));
            }
        }
        if let Some(unknown) = log_transform_cols
            .iter()
            .find(|col| !feature_names.contains(col))
        {
            return Err(ArtifactError::Invalid(format!(
                "log_transform_cols names '{unknown}', which is not in feature_names"
            )));
        }

        let n_features = feature_names.len();
        scaler.validate(n_features)?;
        if kmeans.n_features() != n_features {
            return Err(ArtifactError::Invalid(format!(
                "centroids have {} entries, schema has {n_features} features",
                kmeans.n_features()
            )));
        }

        let log_mask = feature_names
            .iter()
            .map(|name| log_transform_cols.contains(name))
            .collect();

        Ok(Self {
            feature_names,
            log_transform_cols,
            log_mask,
            scaler,
            kmeans,
        })
    }

    /// Load from a JSON file with default options.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Self::load(path, &ArtifactLoadOptions::default())
    }

    /// Load from a JSON file, applying `opts`.
    pub fn load(path: impl AsRef<Path>, opts: &ArtifactLoadOptions) -> Result<Self, ArtifactError> {
        let start = Instant::now();
        let path = path.as_ref();

        let result = read_artifact(path).and_then(|json| Self::from_json_with(&json, opts));
        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(artifact) => info!(
                path = %path.display(),
                n_features = artifact.n_features(),
                n_clusters = artifact.n_clusters(),
                log_cols = artifact.log_transform_cols.len(),
                scaler = artifact.scaler.kind(),
                elapsed_micros,
                "artifact_loaded"
            ),
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                elapsed_micros,
                "artifact_load_failure"
            ),
        }
        result
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ArtifactError> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        Self::from_json_with(json, &ArtifactLoadOptions::default())
    }

    pub fn from_json_with(json: &str, opts: &ArtifactLoadOptions) -> Result<Self, ArtifactError> {
        let value: Value = serde_json::from_str(json)?;
        let Some(object) = value.as_object() else {
            return Err(ArtifactError::Parse(
                "artifact root must be a JSON object".into(),
            ));
        };
        for key in REQUIRED_KEYS {
            if !object.contains_key(key) {
                return Err(ArtifactError::MissingKey(key));
            }
        }

        let file: ArtifactFile = serde_json::from_value(value)?;
        if file.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(file.format_version));
        }

        let kmeans = KMeans::try_from(file.kmeans)?;
        let artifact = Self::new(
            file.feature_names,
            file.log_transform_cols,
            file.scaler,
            kmeans,
        )?;

        if let Some(expected) = opts.expected_clusters {
            if artifact.n_clusters() != expected {
                return Err(ArtifactError::ClusterCount {
                    expected,
                    actual: artifact.n_clusters(),
                });
            }
        }
        Ok(artifact)
    }

    /// Serialize back to the on-disk JSON format.
    pub fn to_json_pretty(&self) -> Result<String, ArtifactError> {
        let file = ArtifactFile {
            format_version: FORMAT_VERSION,
            feature_names: self.feature_names.clone(),
            log_transform_cols: self.log_transform_cols.clone(),
            scaler: self.scaler.clone(),
            kmeans: self.kmeans.to_spec(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn log_transform_cols(&self) -> &[String] {
        &self.log_transform_cols
    }

    pub fn is_log_transformed(&self, name: &str) -> bool {
        self.log_transform_cols.iter().any(|col| col == name)
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn clustering(&self) -> &KMeans {
        &self.kmeans
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_clusters(&self) -> usize {
        self.kmeans.n_clusters()
    }

    /// Fail unless `schema` lists exactly the artifact's feature names in order.
    pub fn check_schema<S: AsRef<str>>(&self, schema: &[S]) -> Result<(), TransformError> {
        let matches = schema.len() == self.feature_names.len()
            && schema
                .iter()
                .zip(&self.feature_names)
                .all(|(given, fitted)| given.as_ref() == fitted);
        if matches {
            Ok(())
        } else {
            Err(TransformError::SchemaMismatch {
                expected: self.feature_names.clone(),
                actual: schema.iter().map(|s| s.as_ref().to_string()).collect(),
            })
        }
    }

    /// Replace each listed column's value `x` with `ln(1 + x)`.
    ///
    /// `values` must already be in schema order.
    pub fn log_transform(&self, values: &[f64]) -> Result<Array1<f64>, TransformError> {
        if values.len() != self.n_features() {
            return Err(TransformError::Dimension {
                expected: self.n_features(),
                actual: values.len(),
            });
        }
        let mut out = Array1::from(values.to_vec());
        for ((value, &apply), name) in out
            .iter_mut()
            .zip(&self.log_mask)
            .zip(&self.feature_names)
        {
            if !apply {
                continue;
            }
            let logged = value.ln_1p();
            if !logged.is_finite() {
                return Err(TransformError::Domain {
                    feature: name.clone(),
                    value: *value,
                });
            }
            *value = logged;
        }
        Ok(out)
    }

    /// Schema check, log transform, then scaling.
    pub fn transform<S: AsRef<str>>(
        &self,
        schema: &[S],
        values: &[f64],
    ) -> Result<Array1<f64>, TransformError> {
        self.check_schema(schema)?;
        let logged = self.log_transform(values)?;
        let scaled = self.scaler.transform(logged.view());
        if let Some(pos) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite {
                feature: self.feature_names[pos].clone(),
                value: values[pos],
            });
        }
        Ok(scaled)
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            format_version: FORMAT_VERSION,
            feature_names: self.feature_names.clone(),
            log_transform_cols: self.log_transform_cols.clone(),
            scaler: self.scaler.kind().to_string(),
            n_clusters: self.n_clusters(),
            centroids: self.kmeans.to_spec().centroids,
        }
    }
}

fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Printable overview of a loaded artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub format_version: u64,
    pub feature_names: Vec<String>,
    pub log_transform_cols: Vec<String>,
    pub scaler: String,
    pub n_clusters: usize,
    pub centroids: Vec<Vec<f64>>,
}
