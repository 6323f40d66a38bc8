pub mod machine;
mod parser;
pub mod rework;
mod stats;

pub use parser::parse_datetime;
pub use stats::DescriptiveStats;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to read CSV export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("'{column}' column not found in uploaded file")]
    MissingColumn { column: String },
    #[error("date range start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalysisError> {
        if start > end {
            return Err(AnalysisError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Fills whichever end the caller left open from the dataset's own bounds.
    ///
    /// Returns `None` when neither end was requested, meaning no filter. Only
    /// a range with both ends supplied can be rejected as inverted; a borrowed
    /// end is widened to the requested one so the selection is simply empty.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        bounds: Option<DateRange>,
    ) -> Result<Option<Self>, AnalysisError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            (Some(start), None) => {
                let end = bounds.map_or(start, |range| range.end.max(start));
                Ok(Some(Self { start, end }))
            }
            (None, Some(end)) => {
                let start = bounds.map_or(end, |range| range.start.min(end));
                Ok(Some(Self { start, end }))
            }
        }
    }

    pub(crate) fn spanning<I>(dates: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        dates.into_iter().fold(None, |range, date| match range {
            None => Some(Self {
                start: date,
                end: date,
            }),
            Some(Self { start, end }) => Some(Self {
                start: start.min(date),
                end: end.max(date),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let error = DateRange::new(day(5), day(4)).expect_err("inverted range");
        assert!(matches!(error, AnalysisError::InvalidDateRange { .. }));
        assert!(DateRange::new(day(4), day(4)).is_ok());
    }

    #[test]
    fn resolve_fills_open_end_from_bounds() {
        let bounds = Some(DateRange::new(day(1), day(10)).expect("range"));

        assert_eq!(DateRange::resolve(None, None, bounds).expect("resolves"), None);

        let range = DateRange::resolve(Some(day(3)), None, bounds)
            .expect("resolves")
            .expect("range present");
        assert_eq!((range.start, range.end), (day(3), day(10)));

        let range = DateRange::resolve(None, Some(day(6)), bounds)
            .expect("resolves")
            .expect("range present");
        assert_eq!((range.start, range.end), (day(1), day(6)));

        assert!(DateRange::resolve(Some(day(9)), Some(day(2)), bounds).is_err());
    }

    #[test]
    fn resolve_outside_the_data_yields_an_empty_selection() {
        let bounds = Some(DateRange::new(day(3), day(10)).expect("range"));

        let after = DateRange::resolve(Some(day(20)), None, bounds)
            .expect("open end never inverts")
            .expect("range present");
        assert_eq!((after.start, after.end), (day(20), day(20)));
        assert!(!after.contains(day(10)));

        let before = DateRange::resolve(None, Some(day(1)), bounds)
            .expect("open start never inverts")
            .expect("range present");
        assert_eq!((before.start, before.end), (day(1), day(1)));
        assert!(!before.contains(day(3)));

        let no_data = DateRange::resolve(Some(day(4)), None, None)
            .expect("resolves")
            .expect("range present");
        assert_eq!((no_data.start, no_data.end), (day(4), day(4)));
        let no_data = DateRange::resolve(None, Some(day(4)), None)
            .expect("resolves")
            .expect("range present");
        assert_eq!((no_data.start, no_data.end), (day(4), day(4)));
    }

    #[test]
    fn errors_describe_the_failure_and_keep_their_source() {
        use std::error::Error;

        let missing = AnalysisError::MissingColumn {
            column: "Defect".to_string(),
        };
        assert_eq!(missing.to_string(), "'Defect' column not found in uploaded file");
        assert!(missing.source().is_none());

        let inverted = DateRange::new(day(5), day(4)).expect_err("inverted range");
        assert_eq!(
            inverted.to_string(),
            "date range start 2025-03-05 is after end 2025-03-04"
        );

        let io = AnalysisError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.to_string(), "failed to read CSV export: gone");
        assert!(io.source().is_some());
    }

    #[test]
    fn spanning_covers_all_dates() {
        let range = DateRange::spanning([day(7), day(2), day(5)]).expect("non-empty");
        assert_eq!((range.start, range.end), (day(2), day(7)));
        assert!(range.contains(day(2)) && range.contains(day(7)));
        assert!(!range.contains(day(8)));
        assert!(DateRange::spanning(std::iter::empty()).is_none());
    }
}
