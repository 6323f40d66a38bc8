mod report;

pub use report::{DailyDefectCount, ParetoEntry, ReworkReport, ReworkSubset};

use super::parser::{csv_reader, locate_column, parse_datetime, require_column};
use super::{AnalysisError, DateRange};
use crate::labels::{
    normalize_label, CanonicalMapping, LabelCanonicalizer, SimilarityMetric, SimilarityThreshold,
};
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_DEFECT_COLUMN: &str = "Defect";
pub const DEFAULT_DATE_COLUMN: &str = "Date";

/// Column names expected in a rework export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReworkSchema {
    pub defect_column: String,
    /// Optional unless the caller asks for a date range.
    pub date_column: Option<String>,
}

impl Default for ReworkSchema {
    fn default() -> Self {
        Self {
            defect_column: DEFAULT_DEFECT_COLUMN.to_string(),
            date_column: Some(DEFAULT_DATE_COLUMN.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReworkOptions {
    pub threshold: SimilarityThreshold,
    pub metric: SimilarityMetric,
    pub range: Option<DateRange>,
    /// Trim and collapse whitespace in defect names before matching.
    pub normalize_labels: bool,
}

impl Default for ReworkOptions {
    fn default() -> Self {
        Self {
            threshold: SimilarityThreshold::default(),
            metric: SimilarityMetric::default(),
            range: None,
            normalize_labels: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ReworkRecord {
    date: Option<NaiveDate>,
    defect: String,
    fields: StringRecord,
}

/// Rows of a rework log with a non-blank defect description.
#[derive(Debug, Clone)]
pub struct ReworkDataset {
    headers: StringRecord,
    defect_index: usize,
    date_column: Option<String>,
    date_index: Option<usize>,
    records: Vec<ReworkRecord>,
    blank_defects: usize,
    unparsed_dates: usize,
}

/// Filtered rows paired with their defect label, plus the mapping built over them.
struct Selection<'a> {
    rows: Vec<(&'a ReworkRecord, String)>,
    mapping: CanonicalMapping,
}

impl ReworkDataset {
    pub fn from_path<P: AsRef<Path>>(path: P, schema: &ReworkSchema) -> Result<Self, AnalysisError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, schema)
    }

    pub fn from_reader<R: Read>(reader: R, schema: &ReworkSchema) -> Result<Self, AnalysisError> {
        let mut csv_reader = csv_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let defect_index = require_column(&headers, &schema.defect_column)?;
        let date_index = schema
            .date_column
            .as_deref()
            .and_then(|name| locate_column(&headers, name));

        if let (Some(name), None) = (schema.date_column.as_deref(), date_index) {
            warn!(column = name, "rework export has no date column; date filters unavailable");
        }

        let mut records = Vec::new();
        let mut blank_defects = 0;
        let mut unparsed_dates = 0;
        for record in csv_reader.records() {
            let fields = record?;
            let defect = fields.get(defect_index).unwrap_or_default();
            if defect.trim().is_empty() {
                blank_defects += 1;
                continue;
            }

            let date = match date_index {
                Some(index) => {
                    let parsed = fields
                        .get(index)
                        .and_then(parse_datetime)
                        .map(|timestamp| timestamp.date());
                    if parsed.is_none() {
                        unparsed_dates += 1;
                    }
                    parsed
                }
                None => None,
            };

            records.push(ReworkRecord {
                date,
                defect: defect.to_string(),
                fields,
            });
        }

        info!(
            records = records.len(),
            blank_defects, unparsed_dates, "loaded rework data"
        );

        Ok(Self {
            headers,
            defect_index,
            date_column: schema.date_column.clone(),
            date_index,
            records,
            blank_defects,
            unparsed_dates,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_dates(&self) -> bool {
        self.date_index.is_some()
    }

    pub fn blank_defects(&self) -> usize {
        self.blank_defects
    }

    pub fn unparsed_dates(&self) -> usize {
        self.unparsed_dates
    }

    pub fn date_bounds(&self) -> Option<DateRange> {
        DateRange::spanning(self.records.iter().filter_map(|record| record.date))
    }

    pub fn report(&self, options: &ReworkOptions) -> Result<ReworkReport, AnalysisError> {
        let selection = self.select(options)?;
        let rows: Vec<(Option<NaiveDate>, &str)> = selection
            .rows
            .iter()
            .map(|(record, label)| (record.date, selection.mapping.resolve(label)))
            .collect();

        Ok(report::build(
            options,
            &rows,
            &selection.mapping,
            self.blank_defects,
            self.unparsed_dates,
        ))
    }

    /// Selected rows with the defect cell replaced by its canonical label.
    pub fn filtered_rows(&self, options: &ReworkOptions) -> Result<ReworkSubset, AnalysisError> {
        let selection = self.select(options)?;
        let headers = self.headers.iter().map(str::to_string).collect();
        let rows = selection
            .rows
            .iter()
            .map(|(record, label)| {
                let canonical = selection.mapping.resolve(label);
                record
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        if index == self.defect_index {
                            canonical.to_string()
                        } else {
                            value.to_string()
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(ReworkSubset { headers, rows })
    }

    fn select(&self, options: &ReworkOptions) -> Result<Selection<'_>, AnalysisError> {
        if options.range.is_some() && self.date_index.is_none() {
            return Err(AnalysisError::MissingColumn {
                column: self
                    .date_column
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATE_COLUMN.to_string()),
            });
        }

        let rows: Vec<(&ReworkRecord, String)> = self
            .records
            .iter()
            .filter(|record| match options.range {
                Some(range) => record.date.is_some_and(|date| range.contains(date)),
                None => true,
            })
            .map(|record| {
                let label = if options.normalize_labels {
                    normalize_label(&record.defect)
                } else {
                    record.defect.clone()
                };
                (record, label)
            })
            .collect();

        let mut seen = HashSet::new();
        let unique: Vec<&str> = rows
            .iter()
            .map(|(_, label)| label.as_str())
            .filter(|label| seen.insert(*label))
            .collect();

        let mapping = LabelCanonicalizer::from_threshold(options.threshold)
            .with_metric(options.metric)
            .canonicalize(unique);

        Ok(Selection { rows, mapping })
    }
}
