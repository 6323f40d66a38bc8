use crate::infra::{parse_date, parse_threshold, resolve_threshold, MachineOverrides};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use line_insight::analysis::machine::{MachineDataset, MachineReport};
use line_insight::analysis::rework::{ReworkDataset, ReworkOptions, ReworkReport, ReworkSchema};
use line_insight::analysis::DateRange;
use line_insight::config::AppConfig;
use line_insight::error::AppError;
use line_insight::export::{self, CsvExport};
use line_insight::labels::{LabelCanonicalizer, SimilarityMetric};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct CanonicalizeArgs {
    /// Labels in first-occurrence order
    #[arg(required = true)]
    pub(crate) labels: Vec<String>,
    /// Similarity threshold in (0, 1]
    #[arg(long, value_parser = parse_threshold)]
    pub(crate) threshold: Option<f64>,
    /// Similarity metric (levenshtein or jaro_winkler)
    #[arg(long)]
    pub(crate) metric: Option<SimilarityMetric>,
}

#[derive(Args, Debug)]
pub(crate) struct MachineReportArgs {
    /// Machine data CSV export with an "Inspection Date" column
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Expected cycle time in seconds
    #[arg(long)]
    pub(crate) cycle_time: Option<u32>,
    /// Total break time per day in minutes
    #[arg(long)]
    pub(crate) break_minutes: Option<u32>,
    /// Lunch break per day in minutes
    #[arg(long)]
    pub(crate) lunch_minutes: Option<u32>,
    /// Utilization percentage (50-100)
    #[arg(long)]
    pub(crate) utilization: Option<u8>,
    /// First date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: Option<NaiveDate>,
    /// Write the hourly performance table to this CSV file
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum ExportTable {
    Pareto,
    #[default]
    Subset,
}

#[derive(Args, Debug)]
pub(crate) struct ReworkReportArgs {
    /// Rework log CSV export
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Similarity threshold in (0, 1] for merging defect names
    #[arg(long, value_parser = parse_threshold)]
    pub(crate) threshold: Option<f64>,
    /// Similarity metric (levenshtein or jaro_winkler)
    #[arg(long)]
    pub(crate) metric: Option<SimilarityMetric>,
    /// First date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) end: Option<NaiveDate>,
    /// Column holding the defect description
    #[arg(long, default_value = "Defect")]
    pub(crate) defect_column: String,
    /// Column holding the rework date
    #[arg(long, default_value = "Date")]
    pub(crate) date_column: String,
    /// Match defect names exactly as written, without whitespace cleanup
    #[arg(long)]
    pub(crate) raw_labels: bool,
    /// Write a table to this CSV file
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
    /// Which table to export
    #[arg(long, value_enum, default_value_t = ExportTable::Subset)]
    pub(crate) table: ExportTable,
}

pub(crate) fn run_canonicalize(args: CanonicalizeArgs) -> Result<(), AppError> {
    let defaults = AppConfig::load()?.analysis;
    let threshold = resolve_threshold(args.threshold, defaults.similarity_threshold)?;
    let metric = args.metric.unwrap_or(defaults.similarity_metric);

    let canonicalizer = LabelCanonicalizer::from_threshold(threshold).with_metric(metric);
    let mapping = canonicalizer.canonicalize(&args.labels);

    println!(
        "Label clusters (threshold {:.2}, {})",
        canonicalizer.threshold(),
        canonicalizer.metric()
    );
    for (label, canonical) in mapping.iter() {
        if label == canonical {
            println!("- {label}");
        } else {
            println!("- {label} -> {canonical}");
        }
    }
    println!(
        "\n{} labels, {} clusters",
        mapping.len(),
        mapping.cluster_count()
    );

    Ok(())
}

pub(crate) fn run_machine_report(args: MachineReportArgs) -> Result<(), AppError> {
    let defaults = AppConfig::load()?.analysis;
    let params = MachineOverrides {
        expected_cycle_time_secs: args.cycle_time,
        break_minutes: args.break_minutes,
        lunch_minutes: args.lunch_minutes,
        utilization_pct: args.utilization,
    }
    .apply(defaults.machine);

    let dataset = MachineDataset::from_path(&args.csv)?;
    let range = DateRange::resolve(args.start, args.end, dataset.date_bounds())?;
    let report = dataset.report(&params, range)?;
    render_machine_report(&report);

    if let Some(path) = args.export {
        write_export(&path, export::hourly_performance_csv(&report)?)?;
    }

    Ok(())
}

pub(crate) fn run_rework_report(args: ReworkReportArgs) -> Result<(), AppError> {
    let defaults = AppConfig::load()?.analysis;
    let schema = ReworkSchema {
        defect_column: args.defect_column,
        date_column: Some(args.date_column),
    };

    let dataset = ReworkDataset::from_path(&args.csv, &schema)?;
    let options = ReworkOptions {
        threshold: resolve_threshold(args.threshold, defaults.similarity_threshold)?,
        metric: args.metric.unwrap_or(defaults.similarity_metric),
        range: DateRange::resolve(args.start, args.end, dataset.date_bounds())?,
        normalize_labels: !args.raw_labels,
    };

    let report = dataset.report(&options)?;
    render_rework_report(&report);

    if let Some(path) = args.export {
        let export = match args.table {
            ExportTable::Pareto => export::defect_pareto_csv(&report)?,
            ExportTable::Subset => export::rework_subset_csv(&dataset.filtered_rows(&options)?)?,
        };
        write_export(&path, export)?;
    }

    Ok(())
}

fn write_export(path: &Path, export: CsvExport) -> Result<(), AppError> {
    std::fs::write(path, &export.bytes)?;
    println!("\nExported {} to {}", export.file_name, path.display());
    Ok(())
}

fn render_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("warning: {warning}");
    }
}

fn render_machine_report(report: &MachineReport) {
    println!("Machine data analysis");
    if let Some(range) = report.range {
        println!("Date range: {} -> {}", range.start, range.end);
    }
    render_warnings(&report.warnings);

    println!("\nSummary statistics");
    println!("- Utilization: {}%", report.parameters.utilization_pct);
    println!(
        "- Effective cycle time: {:.2}s",
        report.effective_cycle_time_secs
    );
    println!(
        "- Target parts per hour: {:.2}",
        report.target_parts_per_hour
    );
    println!("- Parts inspected: {}", report.total_parts);

    if let Some(best) = &report.best_hour {
        println!(
            "- Best hour: {} {:02}:00 ({} parts)",
            best.date, best.hour, best.actual_parts
        );
    }
    if let Some(worst) = &report.worst_hour {
        println!(
            "- Worst hour: {} {:02}:00 ({} parts)",
            worst.date, worst.hour, worst.actual_parts
        );
    }
    if let Some(stats) = &report.cycle_times {
        println!(
            "- Time between parts: mean {:.1}s, median {:.1}s, p90 {:.1}s",
            stats.mean, stats.p50, stats.p90
        );
    }

    if !report.hourly.is_empty() {
        println!("\nHourly performance: actual vs. target");
        for entry in &report.hourly {
            println!(
                "- {} {:02}:00 | {} actual | {:.2} target | {:+.2}",
                entry.date, entry.hour, entry.actual_parts, entry.target_parts, entry.difference
            );
        }
    }

    if !report.daily.is_empty() {
        println!("\nDaily throughput");
        for day in &report.daily {
            let attainment = match day.attainment_pct {
                Some(pct) => format!("{pct:.1}%"),
                None => "n/a".to_string(),
            };
            println!(
                "- {}: {} parts over {} active hours, target {:.1}, attainment {}",
                day.date, day.parts, day.active_hours, day.target_parts, attainment
            );
        }
    }
}

fn render_rework_report(report: &ReworkReport) {
    println!("Rework data analysis");
    if let Some(range) = report.range {
        println!("Date range: {} -> {}", range.start, range.end);
    }
    render_warnings(&report.warnings);

    println!(
        "\n{} records, {} distinct defect names, {} after cleanup (threshold {:.2})",
        report.total_records, report.distinct_labels, report.canonical_labels, report.threshold
    );

    if report.corrections.is_empty() {
        println!("\nName corrections: none");
    } else {
        println!("\nName corrections");
        for entry in &report.corrections {
            println!("- {} -> {}", entry.label, entry.canonical);
        }
    }

    if !report.pareto.is_empty() {
        println!("\nDefect Pareto");
        for entry in &report.pareto {
            println!(
                "- {}: {} ({:.1}%, cumulative {:.1}%)",
                entry.defect, entry.count, entry.percent, entry.cumulative_percent
            );
        }
    }

    if !report.daily.is_empty() {
        println!("\nDefects per day");
        for day in &report.daily {
            println!("- {}: {}", day.date, day.count);
        }
    }
}
