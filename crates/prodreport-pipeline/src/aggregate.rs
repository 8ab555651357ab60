//! Rollups over the extracted process tables
//!
//! All functions take the process tables in report order (Key, QC, Final)
//! and tolerate empty tables: an empty process simply contributes nothing.
//!
//! Ordering rules:
//! - Personnel overall: groups appear in first-seen order, then a stable
//!   sort by total descending; ties keep first-seen order.
//! - Personnel periodic: per process grouped by (period, name), concatenated
//!   in process order, then stably sorted by period ascending and total
//!   descending.
//! - Process periodic: one row per period present in any process, ascending.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use thiserror::Error;

use prodreport_core::{
    Granularity, PeriodPersonnelSummary, PeriodProcessReport, PeriodProcessSummary,
    PersonnelSummary, Process, ProcessPeriodMetrics, ProcessTable,
};

/// Intermediate data that cannot be summarized
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregateError {
    #[error("Total records for {name} ({process}) is not a finite number")]
    NonFiniteTotal { name: String, process: Process },

    #[error("{process} total for period {period} is not a finite number")]
    NonFinitePeriod { process: Process, period: NaiveDate },

    #[error("{process} appears more than once in the period tables")]
    DuplicateProcess { process: Process },
}

/// Per-period metrics of a single process
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessPeriodTable {
    pub process: Process,
    pub periods: BTreeMap<NaiveDate, ProcessPeriodMetrics>,
}

/// Sum totals per (name, process) and rank them.
pub fn personnel_overall(tables: &[ProcessTable]) -> Result<Vec<PersonnelSummary>, AggregateError> {
    let mut groups: IndexMap<(String, Process), f64> = IndexMap::new();
    for table in tables {
        for record in &table.records {
            *groups.entry((record.name.clone(), table.process)).or_insert(0.0) +=
                record.total_records;
        }
    }

    let mut rows: Vec<PersonnelSummary> = Vec::with_capacity(groups.len());
    for ((name, process), total_records) in groups {
        if !total_records.is_finite() {
            return Err(AggregateError::NonFiniteTotal { name, process });
        }
        rows.push(PersonnelSummary {
            rank: 0,
            name,
            process,
            total_records,
        });
    }

    rows.sort_by(|a, b| b.total_records.total_cmp(&a.total_records));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    Ok(rows)
}

/// Sum totals per (period, name) for every process.
pub fn personnel_periodic(
    tables: &[ProcessTable],
    granularity: Granularity,
) -> Result<Vec<PeriodPersonnelSummary>, AggregateError> {
    let mut rows = Vec::new();
    for table in tables {
        let mut groups: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
        for record in &table.records {
            if let Some(period) = record.period(granularity) {
                *groups.entry((period, record.name.clone())).or_insert(0.0) +=
                    record.total_records;
            }
        }

        for ((period, name), total_records) in groups {
            if !total_records.is_finite() {
                return Err(AggregateError::NonFiniteTotal {
                    name,
                    process: table.process,
                });
            }
            rows.push(PeriodPersonnelSummary {
                period,
                name,
                process: table.process,
                total_records,
            });
        }
    }

    rows.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| b.total_records.total_cmp(&a.total_records))
    });
    Ok(rows)
}

/// Sum totals and average processing days per period for one process.
pub fn process_period_table(
    table: &ProcessTable,
    granularity: Granularity,
) -> Result<ProcessPeriodTable, AggregateError> {
    #[derive(Default)]
    struct Acc {
        total: f64,
        days_sum: f64,
        days_count: u32,
    }

    let mut accs: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for record in &table.records {
        let Some(period) = record.period(granularity) else {
            continue;
        };
        let acc = accs.entry(period).or_default();
        acc.total += record.total_records;
        if let Some(days) = record.processing_days {
            acc.days_sum += days as f64;
            acc.days_count += 1;
        }
    }

    let mut periods = BTreeMap::new();
    for (period, acc) in accs {
        if !acc.total.is_finite() {
            return Err(AggregateError::NonFinitePeriod {
                process: table.process,
                period,
            });
        }
        let avg_processing_days = if acc.days_count == 0 {
            0.0
        } else {
            acc.days_sum / f64::from(acc.days_count)
        };
        periods.insert(
            period,
            ProcessPeriodMetrics {
                total_records: acc.total,
                avg_processing_days,
            },
        );
    }

    Ok(ProcessPeriodTable {
        process: table.process,
        periods,
    })
}

/// Pivot per-process period tables into one row per period.
///
/// Only processes with at least one period get columns; a process with no
/// activity in a given period reads as zero there.
pub fn pivot_periods(
    tables: &[ProcessPeriodTable],
    granularity: Granularity,
) -> Result<PeriodProcessReport, AggregateError> {
    let mut present: Vec<&ProcessPeriodTable> = Vec::new();
    for table in tables.iter().filter(|t| !t.periods.is_empty()) {
        if present.iter().any(|p| p.process == table.process) {
            return Err(AggregateError::DuplicateProcess {
                process: table.process,
            });
        }
        present.push(table);
    }
    present.sort_by_key(|t| t.process);

    let all_periods: BTreeSet<NaiveDate> = present
        .iter()
        .flat_map(|t| t.periods.keys().copied())
        .collect();

    let rows = all_periods
        .into_iter()
        .map(|period| PeriodProcessSummary {
            period,
            metrics: present
                .iter()
                .map(|t| t.periods.get(&period).copied().unwrap_or_default())
                .collect(),
        })
        .collect();

    Ok(PeriodProcessReport {
        granularity,
        processes: present.iter().map(|t| t.process).collect(),
        rows,
    })
}

/// Names with the largest summed totals across a periodic personnel table.
///
/// Ties are broken alphabetically so the selection is deterministic.
pub fn top_names(rows: &[PeriodPersonnelSummary], n: usize) -> Vec<String> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.name.as_str()).or_insert(0.0) += row.total_records;
    }
    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(n)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Period × name pivot of totals for the given names; absent cells are zero.
///
/// Returns one `(period, values)` pair per period where any of `names` has
/// activity, with `values` aligned to `names`.
pub fn trend_pivot(
    rows: &[PeriodPersonnelSummary],
    names: &[String],
) -> Vec<(NaiveDate, Vec<f64>)> {
    let mut pivot: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let Some(idx) = names.iter().position(|n| *n == row.name) {
            pivot.entry(row.period).or_insert_with(|| vec![0.0; names.len()])[idx] +=
                row.total_records;
        }
    }
    pivot.into_iter().collect()
}
