mod report;

pub use report::{DailyThroughput, HourlyPerformance, MachineReport};

use super::parser::{csv_reader, parse_datetime, require_column};
use super::{AnalysisError, DateRange};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub const INSPECTION_DATE_COLUMN: &str = "Inspection Date";

const SECONDS_PER_HOUR: f64 = 3600.0;
const MIN_UTILIZATION_PCT: u8 = 50;
const MAX_UTILIZATION_PCT: u8 = 100;

/// Shift inputs used to derive utilization-adjusted targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineParameters {
    pub expected_cycle_time_secs: u32,
    pub break_minutes: u32,
    pub lunch_minutes: u32,
    pub utilization_pct: u8,
}

impl Default for MachineParameters {
    fn default() -> Self {
        Self {
            expected_cycle_time_secs: 30,
            break_minutes: 15,
            lunch_minutes: 30,
            utilization_pct: 85,
        }
    }
}

impl MachineParameters {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.expected_cycle_time_secs == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "expected cycle time",
                reason: "must be at least 1 second".to_string(),
            });
        }

        if !(MIN_UTILIZATION_PCT..=MAX_UTILIZATION_PCT).contains(&self.utilization_pct) {
            return Err(AnalysisError::InvalidParameter {
                name: "utilization",
                reason: format!(
                    "must be between {MIN_UTILIZATION_PCT} and {MAX_UTILIZATION_PCT} percent, got {}",
                    self.utilization_pct
                ),
            });
        }

        Ok(())
    }

    /// Nominal cycle time stretched by the share of time the machine runs.
    pub fn effective_cycle_time_secs(&self) -> f64 {
        f64::from(self.expected_cycle_time_secs) / (f64::from(self.utilization_pct) / 100.0)
    }

    pub fn target_parts_per_hour(&self) -> f64 {
        SECONDS_PER_HOUR / self.effective_cycle_time_secs()
    }

    pub fn unplanned_minutes(&self) -> u32 {
        self.break_minutes.saturating_add(self.lunch_minutes)
    }
}

/// Inspection timestamps loaded from a machine data export.
#[derive(Debug, Clone, Default)]
pub struct MachineDataset {
    inspections: Vec<NaiveDateTime>,
    unparsed_dates: usize,
}

impl MachineDataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalysisError> {
        let mut csv_reader = csv_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let date_index = require_column(&headers, INSPECTION_DATE_COLUMN)?;

        let mut inspections = Vec::new();
        let mut unparsed_dates = 0;
        for record in csv_reader.records() {
            let record = record?;
            match record.get(date_index).and_then(parse_datetime) {
                Some(timestamp) => inspections.push(timestamp),
                None => unparsed_dates += 1,
            }
        }

        inspections.sort_unstable();
        if unparsed_dates > 0 {
            warn!(unparsed_dates, "skipped machine rows with unparseable inspection dates");
        }
        info!(
            inspections = inspections.len(),
            "loaded machine inspection data"
        );

        Ok(Self {
            inspections,
            unparsed_dates,
        })
    }

    /// Inspection timestamps in ascending order.
    pub fn inspections(&self) -> &[NaiveDateTime] {
        &self.inspections
    }

    pub fn unparsed_dates(&self) -> usize {
        self.unparsed_dates
    }

    pub fn date_bounds(&self) -> Option<DateRange> {
        DateRange::spanning(self.inspections.iter().map(NaiveDateTime::date))
    }

    /// Builds the throughput report; `range = None` covers the whole export.
    pub fn report(
        &self,
        params: &MachineParameters,
        range: Option<DateRange>,
    ) -> Result<MachineReport, AnalysisError> {
        params.validate()?;

        let selected: Vec<NaiveDateTime> = self
            .inspections
            .iter()
            .copied()
            .filter(|timestamp| range.map_or(true, |range| range.contains(timestamp.date())))
            .collect();

        Ok(report::build(params, range, &selected, self.unparsed_dates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn default_parameters_yield_utilization_adjusted_target() {
        let params = MachineParameters::default();
        assert!((params.effective_cycle_time_secs() - 30.0 / 0.85).abs() < 1e-9);
        assert!((params.target_parts_per_hour() - 102.0).abs() < 1e-9);
        assert_eq!(params.unplanned_minutes(), 45);
    }

    #[test]
    fn full_utilization_matches_nominal_cycle() {
        let params = MachineParameters {
            expected_cycle_time_secs: 36,
            utilization_pct: 100,
            ..MachineParameters::default()
        };
        assert!((params.target_parts_per_hour() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_out_of_range_inputs() {
        let zero_cycle = MachineParameters {
            expected_cycle_time_secs: 0,
            ..MachineParameters::default()
        };
        assert!(matches!(
            zero_cycle.validate(),
            Err(AnalysisError::InvalidParameter {
                name: "expected cycle time",
                ..
            })
        ));

        let low_utilization = MachineParameters {
            utilization_pct: 40,
            ..MachineParameters::default()
        };
        assert!(matches!(
            low_utilization.validate(),
            Err(AnalysisError::InvalidParameter {
                name: "utilization",
                ..
            })
        ));
    }

    #[test]
    fn loader_requires_inspection_date_column() {
        let error = MachineDataset::from_reader(Cursor::new("Serial,Result\nA1,PASS\n"))
            .expect_err("missing column");
        match error {
            AnalysisError::MissingColumn { column } => assert_eq!(column, INSPECTION_DATE_COLUMN),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn loader_sorts_and_counts_unparsed_dates() {
        let csv = "Serial,Inspection Date\n\
A3,2025-03-04 09:30:00\n\
A1,2025-03-03 14:00:00\n\
A2,garbage\n\
A4,\n";
        let dataset = MachineDataset::from_reader(Cursor::new(csv)).expect("loads");
        assert_eq!(dataset.inspections().len(), 2);
        assert!(dataset.inspections()[0] < dataset.inspections()[1]);
        assert_eq!(dataset.unparsed_dates(), 2);

        let bounds = dataset.date_bounds().expect("bounds");
        assert_eq!(bounds.start.to_string(), "2025-03-03");
        assert_eq!(bounds.end.to_string(), "2025-03-04");
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = MachineDataset::from_path("./does-not-exist.csv").expect_err("io error");
        assert!(matches!(error, AnalysisError::Io(_)));
    }
}
