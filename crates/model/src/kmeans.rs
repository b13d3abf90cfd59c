//! Nearest-centroid assignment for a fitted k-means model.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, TransformError};

/// Outcome of assigning one scaled vector to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Index of the nearest centroid.
    pub label: usize,
    /// Euclidean distance to that centroid, in scaled space.
    pub distance: f64,
}

/// On-disk shape of the clustering section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansSpec {
    pub centroids: Vec<Vec<f64>>,
}

/// A fitted k-means model: `k` centroids of equal width.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    centroids: Array2<f64>,
}

impl KMeans {
    pub fn new(centroids: Array2<f64>) -> Result<Self, ArtifactError> {
        if centroids.nrows() == 0 {
            return Err(ArtifactError::Invalid(
                "clustering model has no centroids".into(),
            ));
        }
        if centroids.ncols() == 0 {
            return Err(ArtifactError::Invalid("centroids have zero width".into()));
        }
        if let Some(((row, col), _)) = centroids.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ArtifactError::Invalid(format!(
                "centroid[{row}][{col}] is not finite"
            )));
        }
        Ok(Self { centroids })
    }

    /// Build from row-major centroid lists. Rows must share one width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ArtifactError> {
        let k = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(pos) = rows.iter().position(|row| row.len() != width) {
            return Err(ArtifactError::Invalid(format!(
                "centroid {pos} has {} entries, centroid 0 has {width}",
                rows[pos].len()
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let centroids = Array2::from_shape_vec((k, width), flat)
            .map_err(|e| ArtifactError::Invalid(e.to_string()))?;
        Self::new(centroids)
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.centroids.ncols()
    }

    pub fn centroids(&self) -> ArrayView2<'_, f64> {
        self.centroids.view()
    }

    pub fn to_spec(&self) -> KMeansSpec {
        KMeansSpec {
            centroids: self
                .centroids
                .axis_iter(Axis(0))
                .map(|row| row.to_vec())
                .collect(),
        }
    }

    /// Label of the centroid nearest to `x` under Euclidean distance.
    /// Ties go to the lowest label.
    ///
    /// Centroids are ranked by `|c|^2 - 2 x.c`, computed after dividing every
    /// coordinate by the largest magnitude in play, so large finite inputs
    /// cannot overflow the comparison. `x` must have
    /// [`n_features`](Self::n_features) entries.
    pub fn assign(&self, x: ArrayView1<'_, f64>) -> Result<ClusterAssignment, TransformError> {
        if let Some((pos, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(TransformError::NonFinite {
                feature: format!("x[{pos}]"),
                value,
            });
        }

        let magnitude = x
            .iter()
            .chain(self.centroids.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let unit = if magnitude > 0.0 { magnitude } else { 1.0 };

        let mut best_label = 0;
        let mut best_score = f64::INFINITY;
        for (label, centroid) in self.centroids.axis_iter(Axis(0)).enumerate() {
            let score: f64 = centroid
                .iter()
                .zip(x.iter())
                .map(|(&c, &v)| {
                    let (c, v) = (c / unit, v / unit);
                    c * c - 2.0 * v * c
                })
                .sum();
            if score < best_score {
                best_score = score;
                best_label = label;
            }
        }

        let distance = euclidean(x, self.centroids.row(best_label));
        if !distance.is_finite() {
            return Err(TransformError::NonFiniteDistance { label: best_label });
        }
        Ok(ClusterAssignment {
            label: best_label,
            distance,
        })
    }
}

/// `|a - b|` with every difference divided by the largest one before squaring.
fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let largest = a
        .iter()
        .zip(b.iter())
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()));
    if largest == 0.0 || !largest.is_finite() {
        return largest;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (x - y) / largest;
            d * d
        })
        .sum();
    largest * sum.sqrt()
}

impl TryFrom<KMeansSpec> for KMeans {
    type Error = ArtifactError;

    fn try_from(spec: KMeansSpec) -> Result<Self, Self::Error> {
        KMeans::from_rows(spec.centroids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    fn two_clusters() -> KMeans {
        KMeans::new(array![[0.0, 0.0], [1.0, 1.0]]).unwrap()
    }

    #[test]
    fn assigns_nearest_centroid() {
        let model = two_clusters();
        let near_zero = model.assign(array![0.1, 0.2].view()).unwrap();
        assert_eq!(near_zero.label, 0);
        let near_one = model.assign(array![0.9, 0.7].view()).unwrap();
        assert_eq!(near_one.label, 1);
    }

    #[test]
    fn reports_distance_to_winner() {
        let model = two_clusters();
        let hit = model.assign(array![1.0, 1.0].view()).unwrap();
        assert_eq!(hit.label, 1);
        assert_eq!(hit.distance, 0.0);

        let off = model.assign(array![3.0, 4.0].view()).unwrap();
        assert_eq!(off.label, 1);
        assert!((off.distance - (4.0f64 + 9.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ties_resolve_to_lowest_label() {
        let model = two_clusters();
        let midpoint = model.assign(array![0.5, 0.5].view()).unwrap();
        assert_eq!(midpoint.label, 0);
    }

    #[test]
    fn label_always_within_k() {
        let model = KMeans::new(array![[0.0], [5.0], [10.0]]).unwrap();
        for x in [-100.0, -1.0, 2.4, 2.6, 7.0, 1e9] {
            assert!(model.assign(array![x].view()).unwrap().label < model.n_clusters());
        }
    }

    #[test]
    fn large_finite_inputs_keep_their_ordering() {
        let model = KMeans::from_rows(vec![vec![0.0; 11], vec![1e150; 11]]).unwrap();
        let far = Array1::from_elem(11, 2e200);
        let hit = model.assign(far.view()).unwrap();
        assert_eq!(hit.label, 1);
        assert!(hit.distance.is_finite());
        assert!(hit.distance > 6e200);

        let model = KMeans::from_rows(vec![vec![0.0; 3], vec![1e300; 3]]).unwrap();
        let hit = model.assign(Array1::from_elem(3, 9e299).view()).unwrap();
        assert_eq!(hit.label, 1);
    }

    #[test]
    fn overflowing_distance_is_an_error() {
        let model = KMeans::new(array![[-1e308], [-1.5e308]]).unwrap();
        let err = model.assign(array![1e308].view()).unwrap_err();
        assert_eq!(err, TransformError::NonFiniteDistance { label: 0 });
    }

    #[test]
    fn non_finite_input_is_an_error() {
        let model = two_clusters();
        let err = model.assign(array![0.0, f64::NAN].view()).unwrap_err();
        assert!(matches!(err, TransformError::NonFinite { ref feature, .. } if feature == "x[1]"));
    }

    #[test]
    fn rejects_empty_and_ragged() {
        assert!(matches!(
            KMeans::from_rows(vec![]),
            Err(ArtifactError::Invalid(_))
        ));
        let err = KMeans::from_rows(vec![vec![0.0, 1.0], vec![0.0]]).unwrap_err();
        assert!(err.to_string().contains("centroid 1 has 1 entries"));
    }

    #[test]
    fn rejects_non_finite_centroid() {
        let err = KMeans::new(array![[0.0, f64::NAN]]).unwrap_err();
        assert!(err.to_string().contains("centroid[0][1]"));
    }

    #[test]
    fn spec_round_trip() {
        let model = two_clusters();
        let spec = model.to_spec();
        assert_eq!(spec.centroids, vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        assert_eq!(KMeans::try_from(spec).unwrap(), model);
    }
}
