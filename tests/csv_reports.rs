use chrono::NaiveDate;
use line_insight::analysis::machine::{MachineDataset, MachineParameters};
use line_insight::analysis::rework::{ReworkDataset, ReworkOptions, ReworkSchema};
use line_insight::analysis::{AnalysisError, DateRange};
use line_insight::export;
use std::io::Write;
use tempfile::NamedTempFile;

const MACHINE_EXPORT: &str = "Inspection Date,Station\n\
2025-03-03 08:00:00,A\n\
2025-03-03 08:00:40,A\n\
2025-03-03 08:01:40,A\n\
2025-03-03 09:15:00,A\n\
2025-03-04 10:00:00,B\n\
not a date,B\n";

const REWORK_LOG: &str = "Date,Part,Defect\n\
2025-03-03,P-1,Paint Scratch\n\
2025-03-03,P-2,Dent\n\
2025-03-04,P-3,Paint Scrach\n\
2025-03-04,P-4,Dents\n\
2025-03-05,P-5,Paint Scratch\n\
2025-03-05,P-6,\n\
bad-date,P-7,Burr\n";

fn write_fixture(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write fixture");
    file
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
}

fn text(export: &export::CsvExport) -> String {
    String::from_utf8(export.bytes.clone()).expect("utf8 csv")
}

#[test]
fn machine_export_from_disk_reports_selected_day() {
    let file = write_fixture(MACHINE_EXPORT);
    let dataset = MachineDataset::from_path(file.path()).expect("machine export loads");
    assert_eq!(dataset.inspections().len(), 5);
    assert_eq!(dataset.unparsed_dates(), 1);
    assert_eq!(
        dataset.date_bounds(),
        Some(DateRange::new(day(3), day(4)).expect("ordered range"))
    );

    let params = MachineParameters {
        expected_cycle_time_secs: 36,
        utilization_pct: 100,
        ..MachineParameters::default()
    };
    let range = DateRange::resolve(Some(day(3)), Some(day(3)), dataset.date_bounds())
        .expect("valid range");
    let report = dataset.report(&params, range).expect("report builds");

    assert_eq!(report.total_parts, 4);
    assert_eq!(report.hourly.len(), 2);
    assert_eq!(report.best_hour.as_ref().map(|hour| hour.hour), Some(8));
    assert_eq!(report.worst_hour.as_ref().map(|hour| hour.hour), Some(9));

    let daily = &report.daily[0];
    assert_eq!(daily.planned_minutes, 75);
    assert!((daily.target_parts - 125.0).abs() < 1e-9);
    assert!((daily.attainment_pct.expect("positive target") - 3.2).abs() < 1e-9);

    let stats = report.cycle_times.as_ref().expect("gaps within the day");
    assert_eq!(stats.count, 3);
    assert!((stats.p50 - 60.0).abs() < 1e-9);

    let csv = export::hourly_performance_csv(&report).expect("export");
    assert_eq!(
        text(&csv),
        "Date,Hour,Actual Parts,Target Parts,Difference\n\
2025-03-03,8,3,100.0,-97.0\n\
2025-03-03,9,1,100.0,-99.0\n"
    );
}

#[test]
fn open_ended_range_is_closed_by_the_data() {
    let file = write_fixture(MACHINE_EXPORT);
    let dataset = MachineDataset::from_path(file.path()).expect("machine export loads");

    let range = DateRange::resolve(Some(day(4)), None, dataset.date_bounds())
        .expect("valid range")
        .expect("filter requested");
    assert_eq!(range, DateRange::new(day(4), day(4)).expect("ordered range"));

    let report = dataset
        .report(&MachineParameters::default(), Some(range))
        .expect("report builds");
    assert_eq!(report.total_parts, 1);

    assert!(matches!(
        DateRange::resolve(Some(day(5)), Some(day(3)), None),
        Err(AnalysisError::InvalidDateRange { .. })
    ));
}

#[test]
fn rework_log_from_disk_builds_pareto_and_exports() {
    let file = write_fixture(REWORK_LOG);
    let dataset =
        ReworkDataset::from_path(file.path(), &ReworkSchema::default()).expect("rework log loads");
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.blank_defects(), 1);
    assert_eq!(dataset.unparsed_dates(), 1);

    let report = dataset
        .report(&ReworkOptions::default())
        .expect("report builds");
    let pareto: Vec<(&str, usize)> = report
        .pareto
        .iter()
        .map(|entry| (entry.defect.as_str(), entry.count))
        .collect();
    assert_eq!(pareto, vec![("Paint Scratch", 3), ("Dent", 2), ("Burr", 1)]);

    let daily: Vec<(NaiveDate, usize)> = report
        .daily
        .iter()
        .map(|entry| (entry.date, entry.count))
        .collect();
    assert_eq!(daily, vec![(day(3), 2), (day(4), 2), (day(5), 1)]);
    assert!(report
        .warnings
        .iter()
        .any(|warning| warning.contains("unparseable date")));

    let csv = export::defect_pareto_csv(&report).expect("export");
    assert_eq!(
        text(&csv),
        "Defect,Count,Percent,Cumulative Percent\n\
Paint Scratch,3,50.0,50.0\n\
Dent,2,33.33,83.33\n\
Burr,1,16.67,100.0\n"
    );
}

#[test]
fn rework_range_rebuilds_clusters_from_the_selected_rows() {
    let file = write_fixture(REWORK_LOG);
    let dataset =
        ReworkDataset::from_path(file.path(), &ReworkSchema::default()).expect("rework log loads");
    let options = ReworkOptions {
        range: Some(DateRange::new(day(4), day(5)).expect("ordered range")),
        ..ReworkOptions::default()
    };

    // Within the range the misspelling is seen first, so it becomes the representative.
    let subset = dataset.filtered_rows(&options).expect("subset builds");
    let csv = export::rework_subset_csv(&subset).expect("export");
    assert_eq!(
        text(&csv),
        "Date,Part,Defect\n\
2025-03-04,P-3,Paint Scrach\n\
2025-03-04,P-4,Dents\n\
2025-03-05,P-5,Paint Scrach\n"
    );

    let report = dataset.report(&options).expect("report builds");
    assert_eq!(report.total_records, 3);
    assert_eq!(report.corrections.len(), 1);
    assert_eq!(report.corrections[0].label, "Paint Scratch");
    assert_eq!(report.corrections[0].canonical, "Paint Scrach");
}

#[test]
fn open_range_beyond_the_data_selects_nothing() {
    let file = write_fixture(REWORK_LOG);
    let dataset =
        ReworkDataset::from_path(file.path(), &ReworkSchema::default()).expect("rework log loads");

    let late = NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date");
    let options = ReworkOptions {
        range: DateRange::resolve(Some(late), None, dataset.date_bounds())
            .expect("open end is widened, not inverted"),
        ..ReworkOptions::default()
    };
    let report = dataset.report(&options).expect("report builds");
    assert_eq!(report.total_records, 0);
    assert!(report.pareto.is_empty());
    assert!(report
        .warnings
        .iter()
        .any(|warning| warning.contains("no rework records")));

    let early = NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid date");
    let range = DateRange::resolve(None, Some(early), dataset.date_bounds())
        .expect("open start is widened, not inverted");
    let machine = MachineDataset::from_path(write_fixture(MACHINE_EXPORT).path())
        .expect("machine export loads");
    let report = machine
        .report(&MachineParameters::default(), range)
        .expect("report builds");
    assert!(report.is_empty());
}
