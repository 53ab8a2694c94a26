use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Deserialize;

/// A wall-clock time of day (local time zone) at which the broadcast fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct DailyTime {
    hour: u32,
    minute: u32,
}

impl DailyTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Six-field cron expression (with seconds) firing once a day at this time.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }

    fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for DailyTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .with_context(|| format!("Expected HH:MM, got '{s}'"))?;
        let hour: u32 = hour
            .parse()
            .with_context(|| format!("Invalid hour in '{s}'"))?;
        let minute: u32 = minute
            .parse()
            .with_context(|| format!("Invalid minute in '{s}'"))?;
        if hour > 23 || minute > 59 {
            anyhow::bail!("Time out of range: '{s}'");
        }
        Ok(Self::new(hour, minute))
    }
}

impl TryFrom<String> for DailyTime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// The set of distinct daily firing times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    times: BTreeSet<DailyTime>,
}

impl DailySchedule {
    pub fn new(times: impl IntoIterator<Item = DailyTime>) -> Self {
        Self {
            times: times.into_iter().collect(),
        }
    }

    pub fn times(&self) -> impl Iterator<Item = &DailyTime> {
        self.times.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Next firing strictly after `now`, rolling over to the following day.
    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        self.times
            .iter()
            .map(|t| today.and_time(t.as_naive_time()))
            .find(|candidate| *candidate > now)
            .or_else(|| {
                let first = self.times.iter().next()?;
                Some((today + Duration::days(1)).and_time(first.as_naive_time()))
            })
    }
}
