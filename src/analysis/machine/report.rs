use super::MachineParameters;
use crate::analysis::{DateRange, DescriptiveStats};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPerformance {
    pub date: NaiveDate,
    pub hour: u32,
    pub actual_parts: usize,
    pub target_parts: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyThroughput {
    pub date: NaiveDate,
    pub parts: usize,
    pub active_hours: usize,
    pub planned_minutes: u32,
    pub target_parts: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attainment_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineReport {
    pub parameters: MachineParameters,
    pub effective_cycle_time_secs: f64,
    pub target_parts_per_hour: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub total_parts: usize,
    pub unparsed_dates: usize,
    pub hourly: Vec<HourlyPerformance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_hour: Option<HourlyPerformance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_hour: Option<HourlyPerformance>,
    pub daily: Vec<DailyThroughput>,
    /// Seconds between consecutive inspections on the same day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_times: Option<DescriptiveStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MachineReport {
    pub fn is_empty(&self) -> bool {
        self.total_parts == 0
    }
}

/// `inspections` must already be filtered and sorted ascending.
pub(super) fn build(
    params: &MachineParameters,
    range: Option<DateRange>,
    inspections: &[NaiveDateTime],
    unparsed_dates: usize,
) -> MachineReport {
    let target_per_hour = params.target_parts_per_hour();
    let effective_cycle = params.effective_cycle_time_secs();

    let mut per_hour: BTreeMap<(NaiveDate, u32), usize> = BTreeMap::new();
    for timestamp in inspections {
        *per_hour
            .entry((timestamp.date(), timestamp.hour()))
            .or_default() += 1;
    }

    let hourly: Vec<HourlyPerformance> = per_hour
        .iter()
        .map(|(&(date, hour), &actual_parts)| HourlyPerformance {
            date,
            hour,
            actual_parts,
            target_parts: target_per_hour,
            difference: actual_parts as f64 - target_per_hour,
        })
        .collect();

    // Iteration is chronological, so strict comparisons keep the earliest hour on ties.
    let best_hour = hourly
        .iter()
        .fold(None::<&HourlyPerformance>, |best, entry| match best {
            Some(current) if current.actual_parts >= entry.actual_parts => Some(current),
            _ => Some(entry),
        })
        .cloned();
    let worst_hour = hourly
        .iter()
        .fold(None::<&HourlyPerformance>, |worst, entry| match worst {
            Some(current) if current.actual_parts <= entry.actual_parts => Some(current),
            _ => Some(entry),
        })
        .cloned();

    let daily = daily_throughput(&hourly, params, effective_cycle);
    let cycle_times = DescriptiveStats::from_values(&same_day_gaps(inspections));

    let mut warnings = Vec::new();
    if inspections.is_empty() {
        warnings.push("no inspections in the selected date range".to_string());
    }
    if unparsed_dates > 0 {
        warnings.push(format!(
            "{unparsed_dates} rows had an unparseable inspection date and were skipped"
        ));
    }

    MachineReport {
        parameters: *params,
        effective_cycle_time_secs: effective_cycle,
        target_parts_per_hour: target_per_hour,
        range,
        total_parts: inspections.len(),
        unparsed_dates,
        hourly,
        best_hour,
        worst_hour,
        daily,
        cycle_times,
        warnings,
    }
}

fn daily_throughput(
    hourly: &[HourlyPerformance],
    params: &MachineParameters,
    effective_cycle: f64,
) -> Vec<DailyThroughput> {
    let mut per_day: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for entry in hourly {
        let (parts, hours) = per_day.entry(entry.date).or_default();
        *parts += entry.actual_parts;
        *hours += 1;
    }

    per_day
        .into_iter()
        .map(|(date, (parts, active_hours))| {
            let scheduled = u32::try_from(active_hours * 60).unwrap_or(u32::MAX);
            let planned_minutes = scheduled.saturating_sub(params.unplanned_minutes());
            let target_parts = f64::from(planned_minutes) * 60.0 / effective_cycle;
            let attainment_pct =
                (target_parts > 0.0).then(|| parts as f64 / target_parts * 100.0);

            DailyThroughput {
                date,
                parts,
                active_hours,
                planned_minutes,
                target_parts,
                attainment_pct,
            }
        })
        .collect()
}

fn same_day_gaps(inspections: &[NaiveDateTime]) -> Vec<f64> {
    inspections
        .windows(2)
        .filter(|pair| pair[0].date() == pair[1].date())
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .collect()
}
