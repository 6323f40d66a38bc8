use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default cut-off for treating two labels as the same category.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// String similarity ratio used to decide cluster membership.
///
/// Every metric returns a score in `[0, 1]`, is symmetric, and scores
/// identical strings at `1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in chars.
    #[default]
    Levenshtein,
    JaroWinkler,
}

impl SimilarityMetric {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Levenshtein => "levenshtein",
            Self::JaroWinkler => "jaro_winkler",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "levenshtein" => Ok(Self::Levenshtein),
            "jaro_winkler" | "jarowinkler" => Ok(Self::JaroWinkler),
            other => Err(format!(
                "unknown similarity metric '{other}' (expected levenshtein or jaro_winkler)"
            )),
        }
    }
}

/// A similarity cut-off validated to lie in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimilarityThreshold(f64);

impl SimilarityThreshold {
    pub fn new(value: f64) -> Result<Self, InvalidThreshold> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(InvalidThreshold(value))
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("similarity threshold must be in (0, 1], got {0}")]
pub struct InvalidThreshold(pub f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        for metric in [SimilarityMetric::Levenshtein, SimilarityMetric::JaroWinkler] {
            assert_eq!(metric.score("Dent", "Dent"), 1.0);
            assert_eq!(metric.score("", ""), 1.0);
        }
    }

    #[test]
    fn levenshtein_ratio_counts_chars() {
        let score = SimilarityMetric::Levenshtein.score("Scratch", "Scrach");
        assert!((score - 6.0 / 7.0).abs() < 1e-9);

        let accented = SimilarityMetric::Levenshtein.score("Rayé", "Raye");
        assert!((accented - 0.75).abs() < 1e-9);
    }

    #[test]
    fn levenshtein_is_symmetric() {
        let pairs = [("Paint Scratch", "Paint Scrach"), ("Dent", "Bent"), ("", "x")];
        for (a, b) in pairs {
            let metric = SimilarityMetric::Levenshtein;
            assert_eq!(metric.score(a, b), metric.score(b, a));
        }
    }

    #[test]
    fn metric_parses_from_user_input() {
        assert_eq!(
            "Jaro-Winkler".parse::<SimilarityMetric>(),
            Ok(SimilarityMetric::JaroWinkler)
        );
        assert_eq!(
            " levenshtein ".parse::<SimilarityMetric>(),
            Ok(SimilarityMetric::Levenshtein)
        );
        assert!("cosine".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn threshold_rejects_values_outside_unit_interval() {
        assert!(SimilarityThreshold::new(0.0).is_err());
        assert!(SimilarityThreshold::new(-0.2).is_err());
        assert!(SimilarityThreshold::new(1.01).is_err());
        assert!(SimilarityThreshold::new(f64::NAN).is_err());
        assert_eq!(SimilarityThreshold::new(1.0).map(|t| t.value()), Ok(1.0));
        assert_eq!(SimilarityThreshold::default().value(), 0.8);
        assert_eq!(
            SimilarityThreshold::new(1.5).map_err(|err| err.to_string()),
            Err("similarity threshold must be in (0, 1], got 1.5".to_string())
        );
    }
}
