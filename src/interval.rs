use std::collections::HashSet;

use chrono::Duration;

use crate::config::{BoundaryMode, ScoringConfig};
use crate::error::{Result, ScoringError};
use crate::models::{Interval, IntervalCount, WorkItemRecord};

/// Splits `[R - H, R)` into `H / L` consecutive intervals, oldest first.
/// The last interval is the current one.
pub fn build_intervals(config: &ScoringConfig) -> Result<Vec<Interval>> {
    let count = config.interval_count()?;
    let step = Duration::days(config.interval_days);
    let span_end = match config.boundary {
        BoundaryMode::HalfOpen => Duration::days(config.interval_days - 1),
        BoundaryMode::Inclusive => step,
    };

    let mut start = config.first_date()?;
    let mut intervals = Vec::with_capacity(count);
    for index in 0..count {
        intervals.push(Interval {
            start,
            end: start + span_end,
            is_current: index + 1 == count,
        });
        start += step;
    }

    Ok(intervals)
}

/// Counts distinct ticket ids per interval by their `updated` date.
pub fn count_per_interval(
    records: &[&WorkItemRecord],
    intervals: &[Interval],
) -> Vec<IntervalCount> {
    intervals
        .iter()
        .map(|interval| {
            let ids: HashSet<i64> = records
                .iter()
                .filter(|record| interval.contains(record.updated))
                .map(|record| record.id)
                .collect();
            IntervalCount {
                interval: *interval,
                count: ids.len(),
            }
        })
        .collect()
}

pub fn partition(
    records: &[&WorkItemRecord],
    config: &ScoringConfig,
) -> Result<Vec<IntervalCount>> {
    let intervals = build_intervals(config)?;
    Ok(count_per_interval(records, &intervals))
}

/// Separates historical counts from the current interval's count.
pub fn split_current(counts: &[IntervalCount]) -> Result<(Vec<usize>, usize)> {
    match counts.split_last() {
        Some((current, history)) if current.interval.is_current => Ok((
            history.iter().map(|entry| entry.count).collect(),
            current.count,
        )),
        Some(_) => Err(ScoringError::InvalidInput(
            "last interval is not flagged as current".to_string(),
        )),
        None => Err(ScoringError::InsufficientHistory(
            "no intervals to score".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketStatus;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ticket(id: i64, updated: NaiveDate) -> WorkItemRecord {
        WorkItemRecord {
            id,
            created: updated,
            updated,
            status: TicketStatus::Closed,
            channel: "email".to_string(),
            assignee_id: 1,
        }
    }

    #[test]
    fn produces_contiguous_intervals_with_one_current() {
        let config = ScoringConfig::default();
        let intervals = build_intervals(&config).unwrap();

        assert_eq!(intervals.len(), 9);
        assert_eq!(intervals[0].start, config.first_date().unwrap());
        assert_eq!(intervals[8].end, date(2018, 8, 31));
        assert_eq!(intervals.iter().filter(|i| i.is_current).count(), 1);
        assert!(intervals[8].is_current);
        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
    }

    #[test]
    fn inclusive_intervals_share_boundary_dates() {
        let config = ScoringConfig {
            boundary: BoundaryMode::Inclusive,
            ..ScoringConfig::default()
        };
        let intervals = build_intervals(&config).unwrap();

        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(intervals[8].end, config.reference_date);
    }

    #[test]
    fn boundary_day_is_counted_once_in_half_open_mode() {
        let config = ScoringConfig::default();
        let boundary = date(2018, 7, 7);
        let tickets = [ticket(1, boundary)];
        let refs: Vec<&WorkItemRecord> = tickets.iter().collect();

        let counts = partition(&refs, &config).unwrap();
        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 1);
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn boundary_day_is_counted_twice_in_inclusive_mode() {
        let config = ScoringConfig {
            boundary: BoundaryMode::Inclusive,
            ..ScoringConfig::default()
        };
        let boundary = date(2018, 7, 7);
        let tickets = [ticket(1, boundary)];
        let refs: Vec<&WorkItemRecord> = tickets.iter().collect();

        let counts = partition(&refs, &config).unwrap();
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn counts_distinct_ids_and_ignores_out_of_window_records() {
        let config = ScoringConfig::default();
        let tickets = [
            ticket(1, date(2018, 8, 27)),
            ticket(1, date(2018, 8, 28)),
            ticket(2, date(2018, 8, 28)),
            ticket(3, date(2018, 9, 1)),
            ticket(4, date(2018, 6, 29)),
        ];
        let refs: Vec<&WorkItemRecord> = tickets.iter().collect();

        let counts = partition(&refs, &config).unwrap();
        let (history, current) = split_current(&counts).unwrap();
        assert_eq!(current, 2);
        assert_eq!(history.len(), 8);
        assert!(history.iter().all(|count| *count == 0));
    }

    #[test]
    fn rejects_non_divisible_configuration() {
        let config = ScoringConfig {
            history_days: 50,
            ..ScoringConfig::default()
        };
        let err = build_intervals(&config).unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
    }

    #[test]
    fn rejects_window_reaching_before_the_calendar() {
        let config = ScoringConfig {
            history_days: 1_000_000_000,
            interval_days: 1_000_000_000,
            ..ScoringConfig::default()
        };
        let err = build_intervals(&config).unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
    }

    #[test]
    fn split_requires_a_current_interval() {
        assert!(matches!(
            split_current(&[]).unwrap_err(),
            ScoringError::InsufficientHistory(_)
        ));
    }
}
