use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

pub const DEFAULT_CHANNEL: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Closed,
    Solved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Closed => "closed",
            TicketStatus::Solved => "solved",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ScoringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(TicketStatus::Closed),
            "solved" => Ok(TicketStatus::Solved),
            other => Err(ScoringError::InvalidInput(format!(
                "unsupported ticket status '{other}', expected closed or solved"
            ))),
        }
    }
}

/// Missing or blank channels collapse to [`DEFAULT_CHANNEL`].
pub fn channel_or_default(channel: Option<&str>) -> String {
    match channel.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_CHANNEL.to_string(),
    }
}

/// One resolved support ticket as delivered by the record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemRecord {
    pub id: i64,
    pub created: NaiveDate,
    pub updated: NaiveDate,
    pub status: TicketStatus,
    pub channel: String,
    pub assignee_id: i64,
}

impl WorkItemRecord {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.updated < self.created {
            return Err(ScoringError::InvalidInput(format!(
                "ticket {} updated on {} before it was created on {}",
                self.id, self.updated, self.created
            )));
        }
        if self.channel.trim().is_empty() {
            return Err(ScoringError::InvalidInput(format!(
                "ticket {} has a blank channel",
                self.id
            )));
        }
        Ok(())
    }
}

/// A scoring interval; `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_current: bool,
}

impl Interval {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalCount {
    pub interval: Interval,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineStats {
    pub mean: f64,
    pub dispersion: f64,
    pub standard_deviation: f64,
    pub standard_error: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WorkloadScore {
    UnderLoaded,
    Normal,
    OverLoaded,
}

impl WorkloadScore {
    pub fn value(&self) -> i32 {
        match self {
            WorkloadScore::UnderLoaded => 0,
            WorkloadScore::Normal => 1,
            WorkloadScore::OverLoaded => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkloadScore::UnderLoaded => "under-loaded",
            WorkloadScore::Normal => "normal",
            WorkloadScore::OverLoaded => "over-loaded",
        }
    }
}

/// Identifies one (agent, status[, channel]) slice of the record set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SliceKey {
    pub assignee_id: i64,
    pub status: TicketStatus,
    pub channel: Option<String>,
}

impl SliceKey {
    pub fn new(assignee_id: i64, status: TicketStatus, channel: Option<String>) -> Self {
        Self {
            assignee_id,
            status,
            channel,
        }
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assignee {} / {}", self.assignee_id, self.status)?;
        if let Some(channel) = &self.channel {
            write!(f, " / {channel}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub assignee_id: i64,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub count_last_period: i64,
    pub count_mean_calc_period: f64,
    pub count_sem_calc_period: f64,
    pub score_value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalScoreRow {
    pub assignee_id: i64,
    pub score_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub status: TicketStatus,
    pub agents: usize,
    pub under_loaded: usize,
    pub normal: usize,
    pub over_loaded: usize,
    pub avg_last_period: f64,
}
