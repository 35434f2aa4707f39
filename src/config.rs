use chrono::{Duration, NaiveDate};
use clap::{Args, ValueEnum};

use crate::error::{Result, ScoringError};

pub const DEFAULT_REFERENCE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2018, 9, 1) {
    Some(date) => date,
    None => panic!("default reference date is not a calendar date"),
};
pub const DEFAULT_HISTORY_DAYS: i64 = 63;
pub const DEFAULT_INTERVAL_DAYS: i64 = 7;

/// How interval edges are assigned to days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoundaryMode {
    /// Every day lands in exactly one interval.
    #[default]
    HalfOpen,
    /// Intervals end on the next interval's start date, so boundary days count twice.
    Inclusive,
}

/// What the batch does when a single slice cannot be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlicePolicy {
    #[default]
    Abort,
    SkipAndReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub reference_date: NaiveDate,
    pub history_days: i64,
    pub interval_days: i64,
    pub boundary: BoundaryMode,
    pub slice_policy: SlicePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reference_date: DEFAULT_REFERENCE_DATE,
            history_days: DEFAULT_HISTORY_DAYS,
            interval_days: DEFAULT_INTERVAL_DAYS,
            boundary: BoundaryMode::default(),
            slice_policy: SlicePolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_days <= 0 || self.interval_days <= 0 {
            return Err(ScoringError::Configuration(format!(
                "history span ({}) and interval length ({}) must be positive",
                self.history_days, self.interval_days
            )));
        }
        if self.history_days % self.interval_days != 0 {
            return Err(ScoringError::Configuration(format!(
                "history span of {} days is not divisible into {}-day intervals",
                self.history_days, self.interval_days
            )));
        }
        self.first_date()?;
        self.last_date()?;
        Ok(())
    }

    /// Number of intervals, current one included.
    pub fn interval_count(&self) -> Result<usize> {
        self.validate()?;
        usize::try_from(self.history_days / self.interval_days).map_err(|_| {
            ScoringError::Configuration(format!(
                "interval count for {} / {} does not fit in usize",
                self.history_days, self.interval_days
            ))
        })
    }

    /// First day of the oldest interval, `R - H`.
    pub fn first_date(&self) -> Result<NaiveDate> {
        Duration::try_days(self.history_days)
            .and_then(|span| self.reference_date.checked_sub_signed(span))
            .ok_or_else(|| {
                ScoringError::Configuration(format!(
                    "history span of {} days before {} is outside the calendar range",
                    self.history_days, self.reference_date
                ))
            })
    }

    /// Last `updated` date any interval can contain.
    pub fn last_date(&self) -> Result<NaiveDate> {
        match self.boundary {
            BoundaryMode::HalfOpen => self.reference_date.pred_opt().ok_or_else(|| {
                ScoringError::Configuration(format!(
                    "no day precedes reference date {}",
                    self.reference_date
                ))
            }),
            BoundaryMode::Inclusive => Ok(self.reference_date),
        }
    }
}

/// Scoring flags shared by the `score` and `report` commands.
#[derive(Debug, Clone, Args)]
pub struct ScoringArgs {
    /// Date the scoring window ends at (exclusive in half-open mode)
    #[arg(long, default_value_t = DEFAULT_REFERENCE_DATE)]
    pub reference_date: NaiveDate,
    /// Total history span in days
    #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
    pub history_days: i64,
    /// Interval length in days
    #[arg(long, default_value_t = DEFAULT_INTERVAL_DAYS)]
    pub interval_days: i64,
    #[arg(long, value_enum, default_value_t = BoundaryMode::HalfOpen)]
    pub boundaries: BoundaryMode,
    /// Skip and report slices that cannot be scored instead of aborting
    #[arg(long)]
    pub skip_failed: bool,
}

impl From<&ScoringArgs> for ScoringConfig {
    fn from(args: &ScoringArgs) -> Self {
        Self {
            reference_date: args.reference_date,
            history_days: args.history_days,
            interval_days: args.interval_days,
            boundary: args.boundaries,
            slice_policy: if args.skip_failed {
                SlicePolicy::SkipAndReport
            } else {
                SlicePolicy::Abort
            },
        }
    }
}
