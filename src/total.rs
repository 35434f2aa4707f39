use std::collections::BTreeMap;

use tracing::warn;

use crate::config::SlicePolicy;
use crate::error::{Result, ScoringError};
use crate::models::{ScoreRow, TotalScoreRow};
use crate::scoring::ScoreBatch;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAgent {
    pub assignee_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalBatch {
    pub rows: Vec<TotalScoreRow>,
    pub skipped: Vec<SkippedAgent>,
}

/// Unweighted mean of one agent's status scores.
pub fn total_for_agent(assignee_id: i64, rows: &[&ScoreRow]) -> Result<TotalScoreRow> {
    if rows.is_empty() {
        return Err(ScoringError::InsufficientHistory(format!(
            "assignee {assignee_id} has no scored statuses"
        )));
    }

    let sum: i32 = rows.iter().map(|row| row.score_value).sum();
    Ok(TotalScoreRow {
        assignee_id,
        score_value: f64::from(sum) / rows.len() as f64,
    })
}

/// One total per agent of the batch, including agents whose slices were all skipped.
pub fn total_scores(batch: &ScoreBatch, policy: SlicePolicy) -> Result<TotalBatch> {
    let mut by_agent: BTreeMap<i64, Vec<&ScoreRow>> = batch
        .agents
        .iter()
        .map(|assignee_id| (*assignee_id, Vec::new()))
        .collect();
    for row in &batch.rows {
        by_agent.entry(row.assignee_id).or_default().push(row);
    }

    let mut totals = TotalBatch::default();
    for (assignee_id, rows) in by_agent {
        match total_for_agent(assignee_id, &rows) {
            Ok(total) => totals.rows.push(total),
            Err(err) => match policy {
                SlicePolicy::Abort => return Err(err),
                SlicePolicy::SkipAndReport => {
                    warn!(assignee_id, error = %err, "skipping total score");
                    totals.skipped.push(SkippedAgent {
                        assignee_id,
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketStatus;

    fn row(assignee_id: i64, status: TicketStatus, score_value: i32) -> ScoreRow {
        ScoreRow {
            assignee_id,
            status,
            channel: None,
            count_last_period: 0,
            count_mean_calc_period: 0.0,
            count_sem_calc_period: 0.0,
            score_value,
        }
    }

    #[test]
    fn total_is_unweighted_mean() {
        let rows = [
            row(1, TicketStatus::Closed, 0),
            row(1, TicketStatus::Solved, 1),
            row(1, TicketStatus::Closed, 2),
        ];
        let refs: Vec<&ScoreRow> = rows.iter().collect();
        let total = total_for_agent(1, &refs).unwrap();
        assert!((total.score_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn agent_without_rows_is_insufficient() {
        let err = total_for_agent(4, &[]).unwrap_err();
        assert!(matches!(err, ScoringError::InsufficientHistory(_)));
    }

    #[test]
    fn one_total_per_agent_in_order() {
        let batch = ScoreBatch {
            agents: vec![2, 8],
            rows: vec![
                row(2, TicketStatus::Closed, 2),
                row(2, TicketStatus::Solved, 1),
                row(8, TicketStatus::Closed, 0),
            ],
            skipped: Vec::new(),
        };

        let totals = total_scores(&batch, SlicePolicy::Abort).unwrap();
        assert_eq!(
            totals.rows,
            vec![
                TotalScoreRow {
                    assignee_id: 2,
                    score_value: 1.5
                },
                TotalScoreRow {
                    assignee_id: 8,
                    score_value: 0.0
                },
            ]
        );
    }

    #[test]
    fn agent_with_all_slices_skipped_follows_policy() {
        let batch = ScoreBatch {
            agents: vec![2, 3],
            rows: vec![row(2, TicketStatus::Closed, 1)],
            skipped: Vec::new(),
        };

        let err = total_scores(&batch, SlicePolicy::Abort).unwrap_err();
        assert!(matches!(err, ScoringError::InsufficientHistory(_)));

        let totals = total_scores(&batch, SlicePolicy::SkipAndReport).unwrap();
        assert_eq!(totals.rows.len(), 1);
        assert_eq!(totals.skipped.len(), 1);
        assert_eq!(totals.skipped[0].assignee_id, 3);
    }
}
