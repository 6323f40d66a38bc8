use chrono::NaiveDate;
use line_insight::analysis::machine::MachineParameters;
use line_insight::analysis::AnalysisError;
use line_insight::labels::SimilarityThreshold;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Per-request overrides layered on top of the configured machine defaults.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub(crate) struct MachineOverrides {
    #[serde(default)]
    pub(crate) expected_cycle_time_secs: Option<u32>,
    #[serde(default)]
    pub(crate) break_minutes: Option<u32>,
    #[serde(default)]
    pub(crate) lunch_minutes: Option<u32>,
    #[serde(default)]
    pub(crate) utilization_pct: Option<u8>,
}

impl MachineOverrides {
    pub(crate) fn apply(self, defaults: MachineParameters) -> MachineParameters {
        MachineParameters {
            expected_cycle_time_secs: self
                .expected_cycle_time_secs
                .unwrap_or(defaults.expected_cycle_time_secs),
            break_minutes: self.break_minutes.unwrap_or(defaults.break_minutes),
            lunch_minutes: self.lunch_minutes.unwrap_or(defaults.lunch_minutes),
            utilization_pct: self.utilization_pct.unwrap_or(defaults.utilization_pct),
        }
    }
}

pub(crate) fn resolve_threshold(
    requested: Option<f64>,
    default: SimilarityThreshold,
) -> Result<SimilarityThreshold, AnalysisError> {
    match requested {
        Some(value) => {
            SimilarityThreshold::new(value).map_err(|err| AnalysisError::InvalidParameter {
                name: "similarity threshold",
                reason: err.to_string(),
            })
        }
        None => Ok(default),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a number ({err})"))?;
    SimilarityThreshold::new(value)
        .map(SimilarityThreshold::value)
        .map_err(|err| err.to_string())
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_replace_provided_fields() {
        let overrides = MachineOverrides {
            utilization_pct: Some(95),
            ..MachineOverrides::default()
        };
        let params = overrides.apply(MachineParameters::default());
        assert_eq!(params.utilization_pct, 95);
        assert_eq!(params.expected_cycle_time_secs, 30);
    }

    #[test]
    fn threshold_resolution_validates_requests() {
        let default = SimilarityThreshold::default();
        assert_eq!(resolve_threshold(None, default).map(|t| t.value()).ok(), Some(0.8));
        assert_eq!(
            resolve_threshold(Some(0.9), default).map(|t| t.value()).ok(),
            Some(0.9)
        );
        assert!(matches!(
            resolve_threshold(Some(0.0), default),
            Err(AnalysisError::InvalidParameter { .. })
        ));
        assert!(parse_threshold("abc").is_err());
        assert_eq!(parse_threshold(" 0.75 "), Ok(0.75));
    }
}
