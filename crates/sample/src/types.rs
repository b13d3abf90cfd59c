//! Data model for collected wine samples.
//!
//! ```text
//! RawSample                       (what the user typed; any field may be unset)
//! ├── fixed_acidity: Option<f64>
//! ├── ...
//! └── alcohol: Option<f64>
//!
//!         ↓ collect(policy)
//!
//! FeatureVector                   (all 11 present and finite, canonical order)
//! └── values: [f64; 11]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SampleError;
use crate::feature::{FEATURE_COUNT, FEATURE_NAMES, Feature};

/// Rule deciding when a collected field counts as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsetPolicy {
    /// A field is unset when absent or exactly `0.0`.
    ///
    /// Number widgets default to zero, so zero doubles as "never touched".
    /// A genuine measurement of zero is rejected under this policy.
    #[default]
    ZeroIsUnset,
    /// Only an absent field is unset; `0.0` is a valid measurement.
    ExplicitPresence,
}

impl UnsetPolicy {
    pub fn is_unset(self, value: Option<f64>) -> bool {
        match (self, value) {
            (_, None) => true,
            (UnsetPolicy::ZeroIsUnset, Some(v)) => v == 0.0,
            (UnsetPolicy::ExplicitPresence, Some(_)) => false,
        }
    }
}

/// A wine sample as gathered by an input collector.
///
/// JSON input uses snake_case keys; the artifact column names
/// (`"fixed acidity"`, `"pH"`, ...) are accepted as aliases. Missing keys and
/// `null` values both deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSample {
    #[serde(default, alias = "fixed acidity")]
    pub fixed_acidity: Option<f64>,
    #[serde(default, alias = "volatile acidity")]
    pub volatile_acidity: Option<f64>,
    #[serde(default, alias = "citric acid")]
    pub citric_acid: Option<f64>,
    #[serde(default, alias = "residual sugar")]
    pub residual_sugar: Option<f64>,
    #[serde(default)]
    pub chlorides: Option<f64>,
    #[serde(default, alias = "free sulfur dioxide")]
    pub free_sulfur_dioxide: Option<f64>,
    #[serde(default, alias = "total sulfur dioxide")]
    pub total_sulfur_dioxide: Option<f64>,
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default, alias = "pH")]
    pub ph: Option<f64>,
    #[serde(default)]
    pub sulphates: Option<f64>,
    #[serde(default)]
    pub alcohol: Option<f64>,
}

impl RawSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        *self.slot(feature)
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        *self.slot_mut(feature) = Some(value);
    }

    pub fn clear(&mut self, feature: Feature) {
        *self.slot_mut(feature) = None;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// Build a sample from `(name, value)` pairs. Names may use any spelling
    /// accepted by [`Feature::from_name`]; features not mentioned stay unset.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut sample = RawSample::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let feature =
                Feature::from_name(name).ok_or_else(|| SampleError::UnknownFeature(name.into()))?;
            if sample.get(feature).is_some() {
                return Err(SampleError::DuplicateFeature(feature));
            }
            sample.set(feature, value);
        }
        Ok(sample)
    }

    /// Features that count as unset under `policy`, in canonical order.
    pub fn missing(&self, policy: UnsetPolicy) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| policy.is_unset(self.get(*f)))
            .collect()
    }

    /// Validate this sample into a [`FeatureVector`]. See [`crate::collect`].
    pub fn collect(&self, policy: UnsetPolicy) -> Result<FeatureVector, SampleError> {
        crate::collect(self, policy)
    }

    fn slot(&self, feature: Feature) -> &Option<f64> {
        match feature {
            Feature::FixedAcidity => &self.fixed_acidity,
            Feature::VolatileAcidity => &self.volatile_acidity,
            Feature::CitricAcid => &self.citric_acid,
            Feature::ResidualSugar => &self.residual_sugar,
            Feature::Chlorides => &self.chlorides,
            Feature::FreeSulfurDioxide => &self.free_sulfur_dioxide,
            Feature::TotalSulfurDioxide => &self.total_sulfur_dioxide,
            Feature::Density => &self.density,
            Feature::Ph => &self.ph,
            Feature::Sulphates => &self.sulphates,
            Feature::Alcohol => &self.alcohol,
        }
    }

    fn slot_mut(&mut self, feature: Feature) -> &mut Option<f64> {
        match feature {
            Feature::FixedAcidity => &mut self.fixed_acidity,
            Feature::VolatileAcidity => &mut self.volatile_acidity,
            Feature::CitricAcid => &mut self.citric_acid,
            Feature::ResidualSugar => &mut self.residual_sugar,
            Feature::Chlorides => &mut self.chlorides,
            Feature::FreeSulfurDioxide => &mut self.free_sulfur_dioxide,
            Feature::TotalSulfurDioxide => &mut self.total_sulfur_dioxide,
            Feature::Density => &mut self.density,
            Feature::Ph => &mut self.ph,
            Feature::Sulphates => &mut self.sulphates,
            Feature::Alcohol => &mut self.alcohol,
        }
    }
}

/// A complete, finite wine sample in canonical feature order.
///
/// Only constructible through validation, so holding one means all eleven
/// measurements are present and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build from values in canonical order.
    pub fn from_values(values: &[f64]) -> Result<Self, SampleError> {
        if values.len() != FEATURE_COUNT {
            return Err(SampleError::Arity {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }
        let mut out = [0.0; FEATURE_COUNT];
        for (feature, (slot, value)) in Feature::ALL.iter().zip(out.iter_mut().zip(values)) {
            if !value.is_finite() {
                return Err(SampleError::NonFinite {
                    feature: *feature,
                    value: *value,
                });
            }
            *slot = *value;
        }
        Ok(Self { values: out })
    }

    /// Build from a name → value mapping. Every feature must appear exactly
    /// once; presence is explicit so `0.0` is accepted here.
    pub fn from_map<I, K>(pairs: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let sample = RawSample::from_pairs(pairs)?;
        sample.collect(UnsetPolicy::ExplicitPresence)
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    /// Column names describing the order of [`as_slice`](Self::as_slice).
    pub fn schema(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    /// `(feature, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().zip(self.values.iter().copied())
    }
}

impl From<FeatureVector> for RawSample {
    fn from(vector: FeatureVector) -> Self {
        let mut sample = RawSample::new();
        for (feature, value) in vector.iter() {
            sample.set(feature, value);
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: [f64; FEATURE_COUNT] = [
        7.4, 0.7, 0.1, 1.9, 0.076, 11.0, 34.0, 0.9978, 3.51, 0.56, 9.4,
    ];

    #[test]
    fn zero_is_unset_policy() {
        assert!(UnsetPolicy::ZeroIsUnset.is_unset(None));
        assert!(UnsetPolicy::ZeroIsUnset.is_unset(Some(0.0)));
        assert!(UnsetPolicy::ZeroIsUnset.is_unset(Some(-0.0)));
        assert!(!UnsetPolicy::ZeroIsUnset.is_unset(Some(0.1)));
    }

    #[test]
    fn explicit_presence_policy() {
        assert!(UnsetPolicy::ExplicitPresence.is_unset(None));
        assert!(!UnsetPolicy::ExplicitPresence.is_unset(Some(0.0)));
    }

    #[test]
    fn set_get_clear_round_trip_every_field() {
        let mut sample = RawSample::new();
        for (idx, feature) in Feature::ALL.into_iter().enumerate() {
            sample.set(feature, idx as f64 + 1.0);
        }
        for (idx, feature) in Feature::ALL.into_iter().enumerate() {
            assert_eq!(sample.get(feature), Some(idx as f64 + 1.0));
        }
        sample.clear(Feature::Density);
        assert_eq!(sample.get(Feature::Density), None);
    }

    #[test]
    fn from_pairs_rejects_duplicates_and_unknowns() {
        let dup = RawSample::from_pairs([("ph", 3.2), ("pH", 3.3)]);
        assert_eq!(dup, Err(SampleError::DuplicateFeature(Feature::Ph)));

        let unknown = RawSample::from_pairs([("quality", 5.0)]);
        assert_eq!(unknown, Err(SampleError::UnknownFeature("quality".into())));
    }

    #[test]
    fn missing_lists_in_canonical_order() {
        let sample = RawSample::new()
            .with(Feature::Alcohol, 9.4)
            .with(Feature::CitricAcid, 0.0);
        let missing = sample.missing(UnsetPolicy::ZeroIsUnset);
        assert_eq!(missing.len(), 10);
        assert_eq!(missing[0], Feature::FixedAcidity);
        assert!(missing.contains(&Feature::CitricAcid));
        assert!(!missing.contains(&Feature::Alcohol));

        let explicit = sample.missing(UnsetPolicy::ExplicitPresence);
        assert!(!explicit.contains(&Feature::CitricAcid));
    }

    #[test]
    fn deserialize_accepts_keys_and_column_names() {
        let json = r#"{
            "fixed acidity": 7.4, "volatile_acidity": 0.7, "citric_acid": 0.1,
            "residual sugar": 1.9, "chlorides": 0.076, "free_sulfur_dioxide": 11,
            "total sulfur dioxide": 34, "density": 0.9978, "pH": 3.51,
            "sulphates": 0.56, "alcohol": null
        }"#;
        let sample: RawSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.get(Feature::FixedAcidity), Some(7.4));
        assert_eq!(sample.get(Feature::Ph), Some(3.51));
        assert_eq!(sample.get(Feature::Alcohol), None);
    }

    #[test]
    fn deserialize_rejects_unknown_keys() {
        let result: Result<RawSample, _> = serde_json::from_str(r#"{"quality": 6}"#);
        assert!(result.is_err());
    }

    #[test]
    fn from_values_checks_arity_and_finiteness() {
        assert_eq!(
            FeatureVector::from_values(&VALUES[..10]),
            Err(SampleError::Arity {
                expected: 11,
                actual: 10
            })
        );

        let mut bad = VALUES;
        bad[4] = f64::INFINITY;
        assert!(matches!(
            FeatureVector::from_values(&bad),
            Err(SampleError::NonFinite {
                feature: Feature::Chlorides,
                ..
            })
        ));

        let vector = FeatureVector::from_values(&VALUES).unwrap();
        assert_eq!(vector.as_slice(), &VALUES);
        assert_eq!(vector.get(Feature::Sulphates), 0.56);
        assert_eq!(vector.schema(), &FEATURE_NAMES);
    }

    #[test]
    fn from_map_requires_every_feature() {
        let pairs: Vec<(&str, f64)> = FEATURE_NAMES.iter().copied().zip(VALUES).collect();
        let vector = FeatureVector::from_map(pairs.clone()).unwrap();
        assert_eq!(vector.as_slice(), &VALUES);

        let short = &pairs[1..];
        assert_eq!(
            FeatureVector::from_map(short.iter().copied()),
            Err(SampleError::Incomplete {
                missing: vec![Feature::FixedAcidity]
            })
        );
    }

    #[test]
    fn from_map_accepts_zero() {
        let pairs = FEATURE_NAMES
            .iter()
            .copied()
            .zip(VALUES)
            .map(|(name, value)| if name == "citric acid" { (name, 0.0) } else { (name, value) });
        let vector = FeatureVector::from_map(pairs).unwrap();
        assert_eq!(vector.get(Feature::CitricAcid), 0.0);
    }

    #[test]
    fn vector_converts_back_to_complete_sample() {
        let vector = FeatureVector::from_values(&VALUES).unwrap();
        let sample = RawSample::from(vector);
        assert!(sample.missing(UnsetPolicy::ZeroIsUnset).is_empty());
    }
}
