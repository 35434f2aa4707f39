use std::fmt::Write;

use crate::config::{BoundaryMode, ScoringConfig};
use crate::error::Result;
use crate::models::{ScoreRow, StatusSummary, TotalScoreRow, WorkloadScore};
use crate::scoring::ScoringRun;

const HOT_SPOT_LIMIT: usize = 10;

pub fn summarize_by_status(rows: &[ScoreRow]) -> Vec<StatusSummary> {
    let mut map: std::collections::BTreeMap<_, (usize, [usize; 3], i64)> =
        std::collections::BTreeMap::new();

    for row in rows {
        let entry = map.entry(row.status).or_insert((0, [0; 3], 0));
        entry.0 += 1;
        match row.score_value {
            0 => entry.1[0] += 1,
            1 => entry.1[1] += 1,
            _ => entry.1[2] += 1,
        }
        entry.2 += row.count_last_period;
    }

    map.into_iter()
        .map(|(status, (agents, buckets, total_last))| StatusSummary {
            status,
            agents,
            under_loaded: buckets[0],
            normal: buckets[1],
            over_loaded: buckets[2],
            avg_last_period: if agents == 0 {
                0.0
            } else {
                total_last as f64 / agents as f64
            },
        })
        .collect()
}

fn load_label(score_value: f64) -> &'static str {
    if score_value >= 1.5 {
        WorkloadScore::OverLoaded.label()
    } else if score_value >= 0.5 {
        WorkloadScore::Normal.label()
    } else {
        WorkloadScore::UnderLoaded.label()
    }
}

pub fn build_report(config: &ScoringConfig, run: &ScoringRun) -> Result<String> {
    let mut output = String::new();
    let boundary = match config.boundary {
        BoundaryMode::HalfOpen => "half-open",
        BoundaryMode::Inclusive => "inclusive",
    };

    let _ = writeln!(output, "# Workload Scoring Report");
    let _ = writeln!(
        output,
        "Reference date {} covering {} to {} in {}-day intervals ({} boundaries)",
        config.reference_date,
        config.first_date()?,
        config.last_date()?,
        config.interval_days,
        boundary
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");

    let summaries = summarize_by_status(&run.by_status.rows);
    if summaries.is_empty() {
        let _ = writeln!(output, "No agents scored for this window.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} agents ({} under, {} normal, {} over), avg {:.1} tickets last period",
                summary.status,
                summary.agents,
                summary.under_loaded,
                summary.normal,
                summary.over_loaded,
                summary.avg_last_period
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Agents by Total Score");

    let mut totals: Vec<&TotalScoreRow> = run.totals.rows.iter().collect();
    totals.sort_by(|a, b| {
        b.score_value
            .partial_cmp(&a.score_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.assignee_id.cmp(&b.assignee_id))
    });

    if totals.is_empty() {
        let _ = writeln!(output, "No total scores for this window.");
    } else {
        for total in totals {
            let _ = writeln!(
                output,
                "- {} total {:.2} ({})",
                total.assignee_id,
                total.score_value,
                load_label(total.score_value)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Breakdown");

    if run.by_status.rows.is_empty() {
        let _ = writeln!(output, "No status rows for this window.");
    } else {
        let _ = writeln!(output, "| agent | status | last period | mean | sem | score |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for row in run.by_status.rows.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.2} | {:.2} | {} |",
                row.assignee_id,
                row.status,
                row.count_last_period,
                row.count_mean_calc_period,
                row.count_sem_calc_period,
                row.score_value
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Channel Hot Spots");

    let hot_spots: Vec<&ScoreRow> = run
        .by_channel
        .rows
        .iter()
        .filter(|row| row.score_value == WorkloadScore::OverLoaded.value())
        .collect();

    if hot_spots.is_empty() {
        let _ = writeln!(output, "No over-loaded channels in this window.");
    } else {
        for row in hot_spots.iter().take(HOT_SPOT_LIMIT) {
            let _ = writeln!(
                output,
                "- {} {} via {}: {} tickets vs mean {:.2}",
                row.assignee_id,
                row.status,
                row.channel.as_deref().unwrap_or("none"),
                row.count_last_period,
                row.count_mean_calc_period
            );
        }
    }

    let skipped_slices = run
        .by_status
        .skipped
        .iter()
        .chain(run.by_channel.skipped.iter());
    let mut skipped_lines: Vec<String> = skipped_slices
        .map(|skipped| format!("- {}: {}", skipped.key, skipped.reason))
        .collect();
    skipped_lines.extend(
        run.totals
            .skipped
            .iter()
            .map(|skipped| format!("- assignee {} total: {}", skipped.assignee_id, skipped.reason)),
    );

    if !skipped_lines.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped");
        for line in skipped_lines {
            let _ = writeln!(output, "{line}");
        }
    }

    Ok(output)
}
