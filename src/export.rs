use crate::analysis::machine::MachineReport;
use crate::analysis::rework::{ReworkReport, ReworkSubset};
use crate::analysis::AnalysisError;
use serde::Serialize;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A table serialized for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CsvExport {
    fn new(file_name: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type: CSV_CONTENT_TYPE,
            bytes,
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

#[derive(Serialize)]
struct HourlyRow {
    #[serde(rename = "Date")]
    date: chrono::NaiveDate,
    #[serde(rename = "Hour")]
    hour: u32,
    #[serde(rename = "Actual Parts")]
    actual_parts: usize,
    #[serde(rename = "Target Parts")]
    target_parts: f64,
    #[serde(rename = "Difference")]
    difference: f64,
}

#[derive(Serialize)]
struct ParetoRow<'a> {
    #[serde(rename = "Defect")]
    defect: &'a str,
    #[serde(rename = "Count")]
    count: usize,
    #[serde(rename = "Percent")]
    percent: f64,
    #[serde(rename = "Cumulative Percent")]
    cumulative_percent: f64,
}

pub fn hourly_performance_csv(report: &MachineReport) -> Result<CsvExport, AnalysisError> {
    let rows = report.hourly.iter().map(|entry| HourlyRow {
        date: entry.date,
        hour: entry.hour,
        actual_parts: entry.actual_parts,
        target_parts: round2(entry.target_parts),
        difference: round2(entry.difference),
    });
    let bytes = serialize_rows(
        &["Date", "Hour", "Actual Parts", "Target Parts", "Difference"],
        rows,
    )?;
    Ok(CsvExport::new("hourly_performance.csv", bytes))
}

pub fn defect_pareto_csv(report: &ReworkReport) -> Result<CsvExport, AnalysisError> {
    let rows = report.pareto.iter().map(|entry| ParetoRow {
        defect: &entry.defect,
        count: entry.count,
        percent: round2(entry.percent),
        cumulative_percent: round2(entry.cumulative_percent),
    });
    let bytes = serialize_rows(&["Defect", "Count", "Percent", "Cumulative Percent"], rows)?;
    Ok(CsvExport::new("defect_pareto.csv", bytes))
}

pub fn rework_subset_csv(subset: &ReworkSubset) -> Result<CsvExport, AnalysisError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&subset.headers)?;
    for row in &subset.rows {
        writer.write_record(row)?;
    }
    Ok(CsvExport::new("rework_filtered.csv", finish(writer)?))
}

/// Writes the header explicitly so empty tables still export their columns.
fn serialize_rows<I, T>(headers: &[&str], rows: I) -> Result<Vec<u8>, AnalysisError>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, AnalysisError> {
    writer
        .into_inner()
        .map_err(|err| AnalysisError::Io(err.into_error()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
