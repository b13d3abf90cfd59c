//! The fixed feature schema of a wine sample.
//!
//! Every sample carries exactly eleven physicochemical measurements. The
//! order of [`Feature::ALL`] is the canonical order: it is the column order
//! the scaler and clustering model were fit with, and it is the order in
//! which a [`FeatureVector`](crate::FeatureVector) stores its values.
//!
//! Each feature has three spellings:
//!
//! | Spelling | Example | Used by |
//! |----------|---------|---------|
//! | column name | `"free sulfur dioxide"` | fitted artifact schema |
//! | key | `"free_sulfur_dioxide"` | JSON input, CLI flags |
//! | label | `"Free Sulfur Dioxide"` | prompts and reports |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of measurements in a wine sample.
pub const FEATURE_COUNT: usize = 11;

/// Column names in canonical order, as stored in the fitted artifact.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "fixed acidity",
    "volatile acidity",
    "citric acid",
    "residual sugar",
    "chlorides",
    "free sulfur dioxide",
    "total sulfur dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// One of the eleven wine measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    FixedAcidity,
    VolatileAcidity,
    CitricAcid,
    ResidualSugar,
    Chlorides,
    FreeSulfurDioxide,
    TotalSulfurDioxide,
    Density,
    Ph,
    Sulphates,
    Alcohol,
}

impl Feature {
    /// All features in canonical order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::FixedAcidity,
        Feature::VolatileAcidity,
        Feature::CitricAcid,
        Feature::ResidualSugar,
        Feature::Chlorides,
        Feature::FreeSulfurDioxide,
        Feature::TotalSulfurDioxide,
        Feature::Density,
        Feature::Ph,
        Feature::Sulphates,
        Feature::Alcohol,
    ];

    /// Position of this feature in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used by the fitted artifact (e.g. `"citric acid"`).
    pub fn column_name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// snake_case key used for JSON input and CLI flags.
    pub fn key(self) -> &'static str {
        match self {
            Feature::FixedAcidity => "fixed_acidity",
            Feature::VolatileAcidity => "volatile_acidity",
            Feature::CitricAcid => "citric_acid",
            Feature::ResidualSugar => "residual_sugar",
            Feature::Chlorides => "chlorides",
            Feature::FreeSulfurDioxide => "free_sulfur_dioxide",
            Feature::TotalSulfurDioxide => "total_sulfur_dioxide",
            Feature::Density => "density",
            Feature::Ph => "ph",
            Feature::Sulphates => "sulphates",
            Feature::Alcohol => "alcohol",
        }
    }

    /// Human-readable label shown next to input prompts.
    pub fn label(self) -> &'static str {
        match self {
            Feature::FixedAcidity => "Fixed Acidity",
            Feature::VolatileAcidity => "Volatile Acidity",
            Feature::CitricAcid => "Citric Acid",
            Feature::ResidualSugar => "Residual Sugar",
            Feature::Chlorides => "Chlorides",
            Feature::FreeSulfurDioxide => "Free Sulfur Dioxide",
            Feature::TotalSulfurDioxide => "Total Sulfur Dioxide",
            Feature::Density => "Density",
            Feature::Ph => "pH",
            Feature::Sulphates => "Sulphates",
            Feature::Alcohol => "Alcohol",
        }
    }

    /// Resolve a feature from any of its spellings, ignoring ASCII case.
    ///
    /// Column names, snake_case keys, kebab-case keys and labels are all
    /// accepted, so `"pH"`, `"ph"` and `"PH"` resolve to [`Feature::Ph`].
    pub fn from_name(name: &str) -> Option<Feature> {
        let wanted = name.trim();
        Feature::ALL.into_iter().find(|feature| {
            wanted.eq_ignore_ascii_case(feature.column_name())
                || wanted.eq_ignore_ascii_case(feature.key())
                || wanted.eq_ignore_ascii_case(feature.label())
                || wanted.replace('-', "_").eq_ignore_ascii_case(feature.key())
        })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_column_names() {
        for (idx, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), idx);
            assert_eq!(feature.column_name(), FEATURE_NAMES[idx]);
        }
    }

    #[test]
    fn from_name_accepts_every_spelling() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_name(feature.column_name()), Some(feature));
            assert_eq!(Feature::from_name(feature.key()), Some(feature));
            assert_eq!(Feature::from_name(feature.label()), Some(feature));
        }
        assert_eq!(Feature::from_name("PH"), Some(Feature::Ph));
        assert_eq!(Feature::from_name("free-sulfur-dioxide"), Some(Feature::FreeSulfurDioxide));
        assert_eq!(Feature::from_name("  alcohol "), Some(Feature::Alcohol));
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert_eq!(Feature::from_name("quality"), None);
        assert_eq!(Feature::from_name(""), None);
    }

    #[test]
    fn serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&Feature::TotalSulfurDioxide).unwrap();
        assert_eq!(json, "\"total_sulfur_dioxide\"");
        let back: Feature = serde_json::from_str("\"ph\"").unwrap();
        assert_eq!(back, Feature::Ph);
    }

    #[test]
    fn display_uses_column_name() {
        assert_eq!(Feature::CitricAcid.to_string(), "citric acid");
    }
}
