use std::collections::HashMap;

use crate::calendar::{self, SOLAR_MONTHS};
use crate::models::{AggregatedPoint, EvaluationRecord, SeriesPoint};

/// Replacement rule for two records competing for the same month.
///
/// Only a strictly newer period key wins, so among equal keys the first
/// record seen is kept.
pub fn supersedes(incoming: i64, existing: i64) -> bool {
    incoming > existing
}

pub fn aggregate(records: &[EvaluationRecord]) -> HashMap<String, AggregatedPoint> {
    let mut points: HashMap<String, AggregatedPoint> = HashMap::new();

    for record in records {
        let label = calendar::translate(&record.source_period_label);
        match points.get_mut(label) {
            Some(existing) => {
                if supersedes(record.period_key, existing.period_key) {
                    existing.percentage = record.percentage;
                    existing.period_key = record.period_key;
                }
            }
            None => {
                points.insert(
                    label.to_string(),
                    AggregatedPoint {
                        label: label.to_string(),
                        percentage: record.percentage,
                        period_key: record.period_key,
                    },
                );
            }
        }
    }

    points
}

/// Projects aggregated points onto `calendar`, zero-filling empty months.
/// Labels outside the calendar never reach the series.
pub fn build_series(
    aggregated: &HashMap<String, AggregatedPoint>,
    calendar: &[&str],
) -> Vec<SeriesPoint> {
    calendar
        .iter()
        .map(|label| SeriesPoint {
            label: label.to_string(),
            percentage: aggregated
                .get(*label)
                .map(|point| point.percentage)
                .unwrap_or(0.0),
        })
        .collect()
}

pub fn progress_series(records: &[EvaluationRecord]) -> Vec<SeriesPoint> {
    let aggregated = aggregate(records);
    let unplaced = aggregated
        .values()
        .filter(|point| !SOLAR_MONTHS.contains(&point.label.as_str()))
        .count();
    if unplaced > 0 {
        tracing::warn!(unplaced, "records with unrecognized month labels were left out");
    }
    tracing::debug!(
        records = records.len(),
        months = aggregated.len(),
        "aggregated evaluation records"
    );
    build_series(&aggregated, &SOLAR_MONTHS)
}
