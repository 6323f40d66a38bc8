use super::ReworkOptions;
use crate::analysis::DateRange;
use crate::labels::{CanonicalMapping, MappingEntry, SimilarityMetric};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoEntry {
    pub defect: String,
    pub count: usize,
    pub percent: f64,
    pub cumulative_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDefectCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReworkReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub threshold: f64,
    pub metric: SimilarityMetric,
    pub total_records: usize,
    pub blank_defects: usize,
    pub unparsed_dates: usize,
    pub distinct_labels: usize,
    pub canonical_labels: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_defect: Option<ParetoEntry>,
    /// Only labels that were folded into another representative.
    pub corrections: Vec<MappingEntry>,
    pub pareto: Vec<ParetoEntry>,
    pub daily: Vec<DailyDefectCount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Filtered rework rows ready for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReworkSubset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReworkSubset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `rows` carry canonical labels in file order.
pub(super) fn build(
    options: &ReworkOptions,
    rows: &[(Option<NaiveDate>, &str)],
    mapping: &CanonicalMapping,
    blank_defects: usize,
    unparsed_dates: usize,
) -> ReworkReport {
    let pareto = pareto(rows.iter().map(|(_, defect)| *defect));

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in rows.iter().filter_map(|(date, _)| *date) {
        *per_day.entry(date).or_default() += 1;
    }
    let daily = per_day
        .into_iter()
        .map(|(date, count)| DailyDefectCount { date, count })
        .collect();

    let corrections = mapping
        .corrections()
        .map(|(label, canonical)| MappingEntry {
            label: label.to_string(),
            canonical: canonical.to_string(),
        })
        .collect();

    let mut warnings = Vec::new();
    if rows.is_empty() {
        warnings.push("no rework records in the selected date range".to_string());
    }
    if unparsed_dates > 0 {
        warnings.push(format!(
            "{unparsed_dates} rows had an unparseable date and are excluded from dated views"
        ));
    }

    ReworkReport {
        range: options.range,
        threshold: options.threshold.value(),
        metric: options.metric,
        total_records: rows.len(),
        blank_defects,
        unparsed_dates,
        distinct_labels: mapping.len(),
        canonical_labels: mapping.cluster_count(),
        top_defect: pareto.first().cloned(),
        corrections,
        pareto,
        daily,
        warnings,
    }
}

/// Counts ordered by frequency; equal counts keep first-appearance order.
fn pareto<'a, I>(defects: I) -> Vec<ParetoEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for defect in defects {
        let count = counts.entry(defect).or_insert_with(|| {
            order.push(defect);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(&str, usize)> = order
        .into_iter()
        .map(|defect| (defect, counts[defect]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let total: usize = ranked.iter().map(|(_, count)| count).sum();
    let mut running = 0;
    ranked
        .into_iter()
        .map(|(defect, count)| {
            running += count;
            ParetoEntry {
                defect: defect.to_string(),
                count,
                percent: count as f64 / total as f64 * 100.0,
                cumulative_percent: running as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}
