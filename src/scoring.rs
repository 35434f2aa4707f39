use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::baseline;
use crate::classify;
use crate::config::{ScoringConfig, SlicePolicy};
use crate::error::{Result, ScoringError};
use crate::interval;
use crate::models::{ScoreRow, SliceKey, TicketStatus, WorkItemRecord};
use crate::total::{self, TotalBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    ByStatus,
    ByStatusAndChannel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSlice {
    pub key: SliceKey,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBatch {
    /// Every agent present in the scored record set, ascending.
    pub agents: Vec<i64>,
    pub rows: Vec<ScoreRow>,
    pub skipped: Vec<SkippedSlice>,
}

/// The three result tables of one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRun {
    pub by_status: ScoreBatch,
    pub totals: TotalBatch,
    pub by_channel: ScoreBatch,
}

/// Groups records into slices once, ordered by agent, status, channel.
///
/// In channel mode every status of an agent is paired with every channel of
/// that agent, so combinations without records get an empty slice.
pub fn group_slices(
    records: &[WorkItemRecord],
    mode: GroupingMode,
) -> BTreeMap<SliceKey, Vec<&WorkItemRecord>> {
    let mut slices: BTreeMap<SliceKey, Vec<&WorkItemRecord>> = BTreeMap::new();

    match mode {
        GroupingMode::ByStatus => {
            for record in records {
                slices
                    .entry(SliceKey::new(record.assignee_id, record.status, None))
                    .or_default()
                    .push(record);
            }
        }
        GroupingMode::ByStatusAndChannel => {
            let mut seen: BTreeMap<i64, (BTreeSet<TicketStatus>, BTreeSet<&str>)> =
                BTreeMap::new();
            for record in records {
                let (statuses, channels) = seen.entry(record.assignee_id).or_default();
                statuses.insert(record.status);
                channels.insert(record.channel.as_str());

                slices
                    .entry(SliceKey::new(
                        record.assignee_id,
                        record.status,
                        Some(record.channel.clone()),
                    ))
                    .or_default()
                    .push(record);
            }

            for (assignee_id, (statuses, channels)) in &seen {
                for status in statuses {
                    for channel in channels {
                        slices
                            .entry(SliceKey::new(
                                *assignee_id,
                                *status,
                                Some((*channel).to_string()),
                            ))
                            .or_default();
                    }
                }
            }
        }
    }

    slices
}

/// Validates, partitions, estimates and classifies one slice.
pub fn score_slice(
    key: &SliceKey,
    records: &[&WorkItemRecord],
    config: &ScoringConfig,
) -> Result<ScoreRow> {
    for record in records {
        record.validate()?;
    }

    let counts = interval::partition(records, config)?;
    let (history, current) = interval::split_current(&counts)?;
    let stats = baseline::estimate(&history, counts.len())?;

    let current = i64::try_from(current).map_err(|_| {
        ScoringError::InvalidInput(format!("current count {current} does not fit in i64"))
    })?;
    let score = classify::classify(stats.mean, stats.standard_error, current)?;

    debug!(
        slice = %key,
        current,
        mean = stats.mean,
        dispersion = stats.dispersion,
        standard_deviation = stats.standard_deviation,
        standard_error = stats.standard_error,
        score = score.value(),
        "scored slice"
    );

    Ok(ScoreRow {
        assignee_id: key.assignee_id,
        status: key.status,
        channel: key.channel.clone(),
        count_last_period: current,
        count_mean_calc_period: stats.mean,
        count_sem_calc_period: stats.standard_error,
        score_value: score.value(),
    })
}

pub fn score_by_status(records: &[WorkItemRecord], config: &ScoringConfig) -> Result<ScoreBatch> {
    score_batch(records, config, GroupingMode::ByStatus)
}

pub fn score_by_status_and_channel(
    records: &[WorkItemRecord],
    config: &ScoringConfig,
) -> Result<ScoreBatch> {
    score_batch(records, config, GroupingMode::ByStatusAndChannel)
}

pub fn score_batch(
    records: &[WorkItemRecord],
    config: &ScoringConfig,
    mode: GroupingMode,
) -> Result<ScoreBatch> {
    config.validate()?;

    let slices = group_slices(records, mode);
    let agents: BTreeSet<i64> = records.iter().map(|record| record.assignee_id).collect();
    let mut batch = ScoreBatch {
        agents: agents.into_iter().collect(),
        rows: Vec::with_capacity(slices.len()),
        skipped: Vec::new(),
    };

    for (key, slice) in &slices {
        match score_slice(key, slice, config) {
            Ok(row) => batch.rows.push(row),
            Err(err) => match config.slice_policy {
                SlicePolicy::Abort => return Err(err.in_slice(key)),
                SlicePolicy::SkipAndReport => {
                    warn!(slice = %key, kind = err.kind(), error = %err, "skipping slice");
                    batch.skipped.push(SkippedSlice {
                        key: key.clone(),
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    info!(
        mode = ?mode,
        agents = batch.agents.len(),
        rows = batch.rows.len(),
        skipped = batch.skipped.len(),
        "scored batch"
    );
    Ok(batch)
}

/// Scores a record set into the per-status, total and per-channel tables.
pub fn run(records: &[WorkItemRecord], config: &ScoringConfig) -> Result<ScoringRun> {
    let by_status = score_by_status(records, config)?;
    let totals = total::total_scores(&by_status, config.slice_policy)?;
    let by_channel = score_by_status_and_channel(records, config)?;

    Ok(ScoringRun {
        by_status,
        totals,
        by_channel,
    })
}
