use chrono::Datelike;

use crate::config::{roster_schedule, POOL_STAT_DAYS};
use crate::error::Result;
use crate::types::SnapshotDate;

/// Decides whether a collector should run for a target date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRule {
    /// Run only on these days of the month.
    FixedDays(Vec<u32>),
    /// Run on any allow-listed date, or on a date strictly after `anchor`
    /// whose day distance from it is a multiple of `interval_days`.
    SpecificDatesOrInterval {
        dates: Vec<SnapshotDate>,
        anchor: SnapshotDate,
        interval_days: i64,
    },
}

impl ScheduleRule {
    pub fn pool_stats() -> Self {
        ScheduleRule::FixedDays(POOL_STAT_DAYS.to_vec())
    }

    pub fn roster() -> Result<Self> {
        let dates = roster_schedule::SPECIFIC_DATES
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<SnapshotDate>>>()?;
        Ok(ScheduleRule::SpecificDatesOrInterval {
            dates,
            anchor: roster_schedule::ANCHOR.parse()?,
            interval_days: roster_schedule::INTERVAL_DAYS,
        })
    }
}

pub fn should_run(target: SnapshotDate, rule: &ScheduleRule) -> bool {
    match rule {
        ScheduleRule::FixedDays(days) => days.contains(&target.date().day()),
        ScheduleRule::SpecificDatesOrInterval { dates, anchor, interval_days } => {
            if dates.contains(&target) {
                return true;
            }
            let diff = (target.date() - anchor.date()).num_days();
            *interval_days > 0 && diff > 0 && diff % interval_days == 0
        }
    }
}
