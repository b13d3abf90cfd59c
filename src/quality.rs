//! Cluster label → human-readable quality description.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Prediction;

/// Number of cluster labels that carry a dedicated description.
pub const DESCRIBED_CLUSTERS: usize = 2;

/// Language used for descriptions and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Indonesian.
    #[default]
    Id,
    /// English.
    En,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::Id => "id",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "indonesian" => Ok(Locale::Id),
            "en" | "english" => Ok(Locale::En),
            other => Err(format!("unknown locale '{other}', expected 'id' or 'en'")),
        }
    }
}

const ID_DESCRIPTIONS: [&str; DESCRIBED_CLUSTERS] = [
    "kualitas sedang 🍇\nAnggur ini memiliki karakteristik rata-rata. Anggur ini mungkin lebih baik jika disempurnakan lebih lanjut.",
    "Kualitas Baik 🏆\nAnggur yang sangat baik dengan sifat kimia yang unggul dan karakteristik yang seimbang!",
];

const EN_DESCRIPTIONS: [&str; DESCRIBED_CLUSTERS] = [
    "Medium quality 🍇\nThis wine has average characteristics. It might improve with further refinement.",
    "Good Quality 🏆\nAn excellent wine with superior chemical properties and balanced characteristics!",
];

/// Shown for any label without a dedicated description, in every locale.
pub const FALLBACK_DESCRIPTION: &str = "Unknown Wine Quality";

/// Static description table for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTable {
    locale: Locale,
    descriptions: &'static [&'static str],
}

impl QualityTable {
    pub fn for_locale(locale: Locale) -> Self {
        let descriptions: &'static [&'static str] = match locale {
            Locale::Id => &ID_DESCRIPTIONS,
            Locale::En => &EN_DESCRIPTIONS,
        };
        Self {
            locale,
            descriptions,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Full description for `label`; unmapped labels get [`FALLBACK_DESCRIPTION`].
    pub fn describe(&self, label: usize) -> &'static str {
        self.descriptions
            .get(label)
            .copied()
            .unwrap_or(FALLBACK_DESCRIPTION)
    }

    /// First line of the description.
    pub fn headline(&self, label: usize) -> &'static str {
        let text = self.describe(label);
        text.lines().next().unwrap_or(text)
    }

    pub fn is_described(&self, label: usize) -> bool {
        label < self.descriptions.len()
    }

    /// Warning shown when a sample is submitted with unset fields.
    pub fn incomplete_warning(&self) -> &'static str {
        match self.locale {
            Locale::Id => "⚠️ Harap lengkapi semua field sebelum melakukan analisis!",
            Locale::En => "⚠️ Please fill in every field before running the analysis!",
        }
    }

    /// Title line above a rendered result.
    pub fn title(&self) -> &'static str {
        match self.locale {
            Locale::Id => "🍷 Prediksi Kualitas Anggur",
            Locale::En => "🍷 Wine Quality Prediction",
        }
    }
}

impl Default for QualityTable {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

/// A prediction paired with its description, ready to print or serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub label: usize,
    pub headline: String,
    pub description: String,
    pub distance: f64,
    pub locale: Locale,
}

impl ClusterReport {
    pub fn new(prediction: &Prediction, table: &QualityTable) -> Self {
        Self {
            label: prediction.label,
            headline: table.headline(prediction.label).to_string(),
            description: table.describe(prediction.label).to_string(),
            distance: prediction.distance,
            locale: table.locale(),
        }
    }

    /// Multi-line plain text rendering.
    pub fn render_text(&self, table: &QualityTable) -> String {
        format!(
            "{}\nCluster {}\n{}\n(distance {:.4})",
            table.title(),
            self.label,
            self.description,
            self.distance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: usize) -> Prediction {
        Prediction {
            label,
            distance: 0.25,
            scaled: vec![],
        }
    }

    #[test]
    fn indonesian_is_default() {
        let table = QualityTable::default();
        assert_eq!(table.locale(), Locale::Id);
        assert!(table.describe(0).starts_with("kualitas sedang"));
        assert!(table.describe(1).starts_with("Kualitas Baik"));
    }

    #[test]
    fn unmapped_labels_fall_back() {
        for locale in [Locale::Id, Locale::En] {
            let table = QualityTable::for_locale(locale);
            assert_eq!(table.describe(2), FALLBACK_DESCRIPTION);
            assert_eq!(table.describe(usize::MAX), FALLBACK_DESCRIPTION);
            assert!(!table.is_described(2));
        }
    }

    #[test]
    fn headline_is_first_line() {
        let table = QualityTable::for_locale(Locale::En);
        assert_eq!(table.headline(1), "Good Quality 🏆");
        assert_eq!(table.headline(7), FALLBACK_DESCRIPTION);
    }

    #[test]
    fn every_described_label_is_non_empty() {
        for locale in [Locale::Id, Locale::En] {
            let table = QualityTable::for_locale(locale);
            for label in 0..DESCRIBED_CLUSTERS {
                assert!(!table.describe(label).trim().is_empty());
            }
        }
    }

    #[test]
    fn locale_parses_codes_and_names() {
        assert_eq!("ID".parse::<Locale>(), Ok(Locale::Id));
        assert_eq!("english".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn report_carries_label_and_text() {
        let table = QualityTable::for_locale(Locale::En);
        let report = ClusterReport::new(&prediction(0), &table);
        assert_eq!(report.label, 0);
        assert_eq!(report.headline, "Medium quality 🍇");

        let text = report.render_text(&table);
        assert!(text.contains("Cluster 0"));
        assert!(text.contains("distance 0.2500"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["locale"], "en");
        assert_eq!(json["label"], 0);
    }
}
