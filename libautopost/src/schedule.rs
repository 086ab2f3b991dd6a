//! Daily posting schedule
//!
//! Posts go out at fixed UTC times of day. The daemon polls
//! [`DailySchedule::take_due`] once per poll interval and runs one post cycle
//! for every slot that came due since the previous poll.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

pub const MIN_POSTS_PER_DAY: u32 = 4;
pub const MAX_POSTS_PER_DAY: usize = 10;

/// Candidate UTC slots, best first. They target US audiences: ET morning,
/// ET lunch, ET evening, PT evening, then two filler slots.
pub const DEFAULT_SLOTS: [&str; MAX_POSTS_PER_DAY] = [
    "13:30", "14:30", "17:00", "18:00", "23:00", "00:00", "02:00", "03:00", "19:30", "04:30",
];

/// Clamp a requested posts-per-day value into 4..=10
pub fn clamp_posts_per_day(requested: u32) -> usize {
    requested.clamp(MIN_POSTS_PER_DAY, MAX_POSTS_PER_DAY as u32) as usize
}

/// A UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// First instant strictly after `after` that falls on this slot
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = Utc.from_utc_datetime(&after.date_naive().and_time(self.0));
        if candidate > after {
            candidate
        } else {
            candidate + Duration::days(1)
        }
    }
}

impl FromStr for TimeSlot {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeSlot)
            .map_err(|e| ConfigError::InvalidValue {
                field: "schedule.slots".to_string(),
                reason: format!("'{}' is not a valid HH:MM time ({})", s, e),
            })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Pick the first `clamp(posts_per_day)` slots from the candidate list
pub fn select_slots(candidates: &[String], posts_per_day: u32) -> Result<Vec<TimeSlot>> {
    let count = clamp_posts_per_day(posts_per_day);
    if candidates.len() < count {
        return Err(ConfigError::InvalidValue {
            field: "schedule.slots".to_string(),
            reason: format!("need {} slots, only {} configured", count, candidates.len()),
        }
        .into());
    }

    candidates[..count]
        .iter()
        .map(|s| s.parse::<TimeSlot>().map_err(Into::into))
        .collect()
}

#[derive(Debug, Clone)]
struct ScheduledSlot {
    slot: TimeSlot,
    next_run: DateTime<Utc>,
}

/// A set of daily jobs, each tracking its own next run
#[derive(Debug, Clone)]
pub struct DailySchedule {
    jobs: Vec<ScheduledSlot>,
}

impl DailySchedule {
    /// Arm every slot for its first occurrence after `now`
    pub fn new(slots: Vec<TimeSlot>, now: DateTime<Utc>) -> Self {
        let jobs = slots
            .into_iter()
            .map(|slot| ScheduledSlot {
                slot,
                next_run: slot.next_after(now),
            })
            .collect();
        Self { jobs }
    }

    pub fn slots(&self) -> Vec<TimeSlot> {
        self.jobs.iter().map(|j| j.slot).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Earliest pending run
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().map(|j| j.next_run).min()
    }

    /// Return every slot due at `now`, in next-run order, and re-arm them
    ///
    /// A slot that was missed for several days fires once, not once per
    /// missed day.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TimeSlot> {
        let mut due: Vec<(DateTime<Utc>, TimeSlot)> = Vec::new();
        for job in self.jobs.iter_mut().filter(|j| j.next_run <= now) {
            due.push((job.next_run, job.slot));
            job.next_run = job.slot.next_after(now);
        }
        due.sort();
        due.into_iter().map(|(_, slot)| slot).collect()
    }
}
