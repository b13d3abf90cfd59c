//! Workspace umbrella crate for wine quality cluster inference.
//!
//! This crate stitches together sample collection (`sample`) and the fitted
//! preprocessing + clustering artifact (`model`) so callers can go from a
//! set of eleven chemical measurements to a cluster label with a single
//! API entry point.
//!
//! ```text
//! RawSample ──collect──▶ FeatureVector ──log1p──▶ ──scale──▶ ──nearest centroid──▶ label
//! ```

pub mod config;
pub mod quality;

pub use model::{
    ArtifactError, ArtifactLoadOptions, ArtifactSummary, ClusterAssignment, KMeans,
    PipelineArtifact, Scaler, TransformError,
};
pub use quality::{ClusterReport, Locale, QualityTable};
pub use sample::{
    FEATURE_COUNT, FEATURE_NAMES, Feature, FeatureVector, RawSample, SampleError, UnsetPolicy,
};

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{Level, info, warn};

/// Errors that can occur while taking a wine sample through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineError {
    /// One or more features are unset. Recover by asking for them again.
    IncompleteInput(Vec<Feature>),
    /// A value is malformed or outside the domain of a transform.
    InvalidInput(String),
    /// The vector's feature order differs from the order the artifact was fit with.
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// The artifact is missing or structurally unexpected.
    ArtifactLoad(ArtifactError),
}

impl PipelineError {
    /// True for input-level errors a caller can fix by resubmitting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::IncompleteInput(_) | PipelineError::InvalidInput(_)
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::IncompleteInput(missing) => {
                write!(f, "incomplete input: missing ")?;
                for (idx, feature) in missing.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", feature.label())?;
                }
                Ok(())
            }
            PipelineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            PipelineError::SchemaMismatch { expected, actual } => write!(
                f,
                "feature schema mismatch: artifact expects {expected:?}, got {actual:?}"
            ),
            PipelineError::ArtifactLoad(err) => write!(f, "artifact load failure: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::ArtifactLoad(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SampleError> for PipelineError {
    fn from(value: SampleError) -> Self {
        match value {
            SampleError::Incomplete { missing } => PipelineError::IncompleteInput(missing),
            other => PipelineError::InvalidInput(other.to_string()),
        }
    }
}

impl From<TransformError> for PipelineError {
    fn from(value: TransformError) -> Self {
        match value {
            TransformError::SchemaMismatch { expected, actual } => {
                PipelineError::SchemaMismatch { expected, actual }
            }
            other => PipelineError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ArtifactError> for PipelineError {
    fn from(value: ArtifactError) -> Self {
        PipelineError::ArtifactLoad(value)
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_collect(&self, latency: Duration, result: Result<(), SampleError>);
    fn record_transform(&self, latency: Duration, result: Result<(), PipelineError>);
    fn record_assign(&self, latency: Duration, label: usize);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_collect(self, result: Result<(), SampleError>) {
        self.recorder.record_collect(self.start.elapsed(), result);
    }

    fn record_transform(self, result: Result<(), PipelineError>) {
        self.recorder.record_transform(self.start.elapsed(), result);
    }

    fn record_assign(self, label: usize) {
        self.recorder.record_assign(self.start.elapsed(), label);
    }
}

/// Result of running one feature vector through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Cluster label, always below the artifact's cluster count.
    pub label: usize,
    /// Euclidean distance to the winning centroid in scaled space.
    pub distance: f64,
    /// The vector after log transform and scaling.
    pub scaled: Vec<f64>,
}

/// Load the artifact and check that its schema covers exactly the eleven
/// wine features. Order is not checked here; [`predict`] rejects a
/// vector whose order differs from the artifact's.
pub fn load_artifact(
    path: impl AsRef<Path>,
    opts: &ArtifactLoadOptions,
) -> Result<PipelineArtifact, PipelineError> {
    let artifact = PipelineArtifact::load(path, opts)?;
    check_wine_schema(&artifact)?;

    if artifact.n_clusters() > quality::DESCRIBED_CLUSTERS {
        warn!(
            n_clusters = artifact.n_clusters(),
            described = quality::DESCRIBED_CLUSTERS,
            "artifact_clusters_undescribed"
        );
    }
    Ok(artifact)
}

fn check_wine_schema(artifact: &PipelineArtifact) -> Result<(), ArtifactError> {
    let names = artifact.feature_names();
    if names.len() != FEATURE_COUNT {
        return Err(ArtifactError::Invalid(format!(
            "artifact schema has {} features, a wine sample has {FEATURE_COUNT}",
            names.len()
        )));
    }
    if let Some(unknown) = names
        .iter()
        .find(|name| !FEATURE_NAMES.contains(&name.as_str()))
    {
        return Err(ArtifactError::Invalid(format!(
            "artifact schema names unknown feature '{unknown}'"
        )));
    }
    Ok(())
}

/// Validate a raw sample into a [`FeatureVector`], reporting the `collect` stage.
pub fn collect(raw: &RawSample, policy: UnsetPolicy) -> Result<FeatureVector, PipelineError> {
    let mut collect_metrics = MetricsSpan::start();
    match sample::collect(raw, policy) {
        Ok(vector) => {
            if let Some(span) = collect_metrics.take() {
                span.record_collect(Ok(()));
            }
            Ok(vector)
        }
        Err(err) => {
            if let Some(span) = collect_metrics.take() {
                span.record_collect(Err(err.clone()));
            }
            Err(err.into())
        }
    }
}

/// Log transform, schema guard, scaling, then nearest centroid assignment.
pub fn predict(
    features: &FeatureVector,
    artifact: &PipelineArtifact,
) -> Result<Prediction, PipelineError> {
    let start = Instant::now();
    let span = tracing::span!(
        Level::DEBUG,
        "winecluster.predict",
        n_clusters = artifact.n_clusters()
    );
    let _guard = span.enter();

    let scaled = match transform_stage(features, artifact) {
        Ok(scaled) => scaled,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "predict_failure");
            return Err(err);
        }
    };

    let mut assign_metrics = MetricsSpan::start();
    let assignment = match artifact.clustering().assign(scaled.view()) {
        Ok(assignment) => assignment,
        Err(err) => {
            let err = PipelineError::from(err);
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "predict_failure");
            return Err(err);
        }
    };
    if let Some(span) = assign_metrics.take() {
        span.record_assign(assignment.label);
    }

    let elapsed_micros = start.elapsed().as_micros();
    info!(
        label = assignment.label,
        distance = assignment.distance,
        elapsed_micros,
        "predict_success"
    );

    Ok(Prediction {
        label: assignment.label,
        distance: assignment.distance,
        scaled: scaled.to_vec(),
    })
}

fn transform_stage(
    features: &FeatureVector,
    artifact: &PipelineArtifact,
) -> Result<Array1<f64>, PipelineError> {
    let mut transform_metrics = MetricsSpan::start();
    match artifact.transform(features.schema(), features.as_slice()) {
        Ok(scaled) => {
            if let Some(span) = transform_metrics.take() {
                span.record_transform(Ok(()));
            }
            Ok(scaled)
        }
        Err(err) => {
            let pipeline_err = PipelineError::from(err);
            if let Some(span) = transform_metrics.take() {
                span.record_transform(Err(pipeline_err.clone()));
            }
            Err(pipeline_err)
        }
    }
}

/// Convenience wrapper returning only the cluster label.
pub fn predict_label(
    features: &FeatureVector,
    artifact: &PipelineArtifact,
) -> Result<usize, PipelineError> {
    predict(features, artifact).map(|prediction| prediction.label)
}

/// Collect a raw sample and predict in one call. Incomplete samples never
/// reach the transform stage.
pub fn predict_sample(
    raw: &RawSample,
    policy: UnsetPolicy,
    artifact: &PipelineArtifact,
) -> Result<Prediction, PipelineError> {
    let features = collect(raw, policy)?;
    predict(&features, artifact)
}

/// Predict every vector, returning one result per input in input order.
///
/// With `parallel` set the work is spread over the rayon pool; the artifact
/// is shared read-only so the output is identical either way.
pub fn predict_batch(
    features: &[FeatureVector],
    artifact: &PipelineArtifact,
    parallel: bool,
) -> Vec<Result<Prediction, PipelineError>> {
    if parallel {
        features
            .par_iter()
            .map(|vector| predict(vector, artifact))
            .collect()
    } else {
        features
            .iter()
            .map(|vector| predict(vector, artifact))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: [f64; FEATURE_COUNT] = [
        7.4, 0.7, 0.1, 1.9, 0.076, 11.0, 34.0, 0.9978, 3.51, 0.56, 9.4,
    ];

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
    }

    fn identity_artifact(log_cols: &[&str]) -> PipelineArtifact {
        PipelineArtifact::new(
            names(),
            log_cols.iter().map(|c| c.to_string()).collect(),
            Scaler::Standard {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            KMeans::from_rows(vec![vec![0.0; FEATURE_COUNT], vec![100.0; FEATURE_COUNT]])
                .unwrap(),
        )
        .unwrap()
    }

    fn reference_vector() -> FeatureVector {
        FeatureVector::from_values(&REFERENCE).unwrap()
    }

    #[test]
    fn predict_assigns_known_label() {
        let artifact = identity_artifact(&[]);
        let prediction = predict(&reference_vector(), &artifact).expect("prediction");
        assert!(prediction.label < artifact.n_clusters());
        assert_eq!(prediction.scaled, REFERENCE.to_vec());
    }

    #[test]
    fn log_transform_applies_only_to_listed_columns() {
        let artifact = identity_artifact(&["residual sugar", "chlorides"]);
        let prediction = predict(&reference_vector(), &artifact).unwrap();
        for feature in Feature::ALL {
            let raw = REFERENCE[feature.index()];
            let expected = match feature {
                Feature::ResidualSugar | Feature::Chlorides => raw.ln_1p(),
                _ => raw,
            };
            assert_eq!(prediction.scaled[feature.index()], expected, "{feature}");
        }
    }

    #[test]
    fn permuted_schema_is_rejected() {
        let mut permuted = names();
        permuted.swap(0, 1);
        let artifact = PipelineArtifact::new(
            permuted,
            vec![],
            Scaler::Standard {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            KMeans::from_rows(vec![vec![0.0; FEATURE_COUNT]]).unwrap(),
        )
        .unwrap();

        let result = predict(&reference_vector(), &artifact);
        assert!(matches!(result, Err(PipelineError::SchemaMismatch { .. })));
    }

    #[test]
    fn log_domain_error_is_invalid_input() {
        let artifact = identity_artifact(&["chlorides"]);
        let mut values = REFERENCE;
        values[Feature::Chlorides.index()] = -1.0;
        let vector = FeatureVector::from_values(&values).unwrap();

        let err = predict(&vector, &artifact).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn predict_sample_rejects_unset_citric_acid() {
        let artifact = identity_artifact(&[]);
        let mut raw = RawSample::from(reference_vector());
        raw.set(Feature::CitricAcid, 0.0);

        let err = predict_sample(&raw, UnsetPolicy::ZeroIsUnset, &artifact).unwrap_err();
        assert_eq!(err, PipelineError::IncompleteInput(vec![Feature::CitricAcid]));
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "incomplete input: missing Citric Acid");
    }

    #[test]
    fn predict_label_matches_predict() {
        let artifact = identity_artifact(&["sulphates"]);
        let vector = reference_vector();
        assert_eq!(
            predict_label(&vector, &artifact).unwrap(),
            predict(&vector, &artifact).unwrap().label
        );
    }

    #[test]
    fn batch_preserves_order_and_errors() {
        let artifact = identity_artifact(&["chlorides"]);
        let mut bad = REFERENCE;
        bad[Feature::Chlorides.index()] = -2.0;
        let far = [80.0; FEATURE_COUNT];
        let vectors = vec![
            reference_vector(),
            FeatureVector::from_values(&bad).unwrap(),
            FeatureVector::from_values(&far).unwrap(),
        ];

        let results = predict_batch(&vectors, &artifact, false);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().label, 0);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().label, 1);
    }

    #[test]
    fn artifact_errors_are_not_recoverable() {
        let err = PipelineError::from(ArtifactError::MissingKey("kmeans"));
        assert!(!err.is_recoverable());
        assert!(err.source().is_some());
    }

    #[test]
    fn sample_errors_map_to_pipeline_errors() {
        let err = PipelineError::from(SampleError::UnknownFeature("quality".into()));
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn bundled_artifact_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/model_kmeans_wine_quality.json");
        let artifact = load_artifact(path, &ArtifactLoadOptions::default()).unwrap();
        assert_eq!(artifact.n_features(), FEATURE_COUNT);
        assert_eq!(artifact.n_clusters(), 2);
    }
}
