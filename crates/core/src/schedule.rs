// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repeating-interval retry cycles
//!
//! A retry cycle is written as `R<count>/<ISO-8601 duration>`, e.g. `R5/PT5M`:
//! retry five times, five minutes apart. Calendar units (years, months) are
//! rejected because their length depends on the date they are applied to.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

#[allow(clippy::expect_used)]
static CYCLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^R([0-9]+)/(\S+)$").expect("constant regex pattern is valid"));

// P[nW][nD][T[nH][nM][n[.f]S]]
#[allow(clippy::expect_used)]
static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:([0-9]+)W)?(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)(?:[.,]([0-9]{1,9}))?S)?)?$")
        .expect("constant regex pattern is valid")
});

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// Errors from parsing a retry cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid retry cycle '{expression}': {reason}")]
    InvalidScheduleFormat {
        expression: String,
        reason: &'static str,
    },
}

impl ScheduleError {
    fn invalid(expression: &str, reason: &'static str) -> Self {
        ScheduleError::InvalidScheduleFormat {
            expression: expression.to_string(),
            reason,
        }
    }
}

/// A parsed retry cycle: how many retries, and how far apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    pub repeat_count: u32,
    pub cycle: Duration,
}

impl Schedule {
    pub fn new(repeat_count: u32, cycle: Duration) -> Result<Self, ScheduleError> {
        let schedule = Self {
            repeat_count,
            cycle,
        };
        if repeat_count == 0 {
            return Err(ScheduleError::invalid(
                &schedule.to_string(),
                "repeat count must be positive",
            ));
        }
        if cycle.is_zero() {
            return Err(ScheduleError::invalid(
                &schedule.to_string(),
                "cycle duration must be positive",
            ));
        }
        Ok(schedule)
    }
}

/// Parse a `R<count>/<duration>` expression
pub fn parse(expression: &str) -> Result<Schedule, ScheduleError> {
    let trimmed = expression.trim();
    let caps = CYCLE_PATTERN
        .captures(trimmed)
        .ok_or_else(|| ScheduleError::invalid(expression, "expected R<count>/<duration>"))?;

    let repeat_count: u32 = caps[1]
        .parse()
        .map_err(|_| ScheduleError::invalid(expression, "repeat count out of range"))?;
    if repeat_count == 0 {
        return Err(ScheduleError::invalid(
            expression,
            "repeat count must be positive",
        ));
    }

    let cycle = parse_duration(&caps[2]).map_err(|reason| ScheduleError::invalid(expression, reason))?;
    if cycle.is_zero() {
        return Err(ScheduleError::invalid(
            expression,
            "cycle duration must be positive",
        ));
    }

    Ok(Schedule {
        repeat_count,
        cycle,
    })
}

fn parse_duration(text: &str) -> Result<Duration, &'static str> {
    if text.ends_with('T') {
        return Err("time designator without components");
    }
    let Some(caps) = DURATION_PATTERN.captures(text) else {
        if text.contains('Y') || text.split('T').next().is_some_and(|date| date.contains('M')) {
            return Err("calendar units (years, months) are not supported");
        }
        return Err("expected ISO-8601 duration like PT5M");
    };

    let unit = |index: usize, secs_per_unit: u64| -> Result<u64, &'static str> {
        match caps.get(index) {
            None => Ok(0),
            Some(m) => m
                .as_str()
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_mul(secs_per_unit))
                .ok_or("duration out of range"),
        }
    };

    let secs = [
        unit(1, SECS_PER_WEEK)?,
        unit(2, SECS_PER_DAY)?,
        unit(3, SECS_PER_HOUR)?,
        unit(4, SECS_PER_MINUTE)?,
        unit(5, 1)?,
    ]
    .into_iter()
    .try_fold(0u64, u64::checked_add)
    .ok_or("duration out of range")?;

    let nanos = match caps.get(6) {
        None => 0,
        Some(m) => {
            let digits = m.as_str();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().map_err(|_| "invalid fractional seconds")? * scale
        }
    };

    Ok(Duration::new(secs, nanos))
}

/// Render a duration as a canonical ISO-8601 duration (days and below)
fn format_duration(duration: Duration, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    write!(f, "P")?;
    if days > 0 {
        write!(f, "{}D", days)?;
    }
    if hours == 0 && minutes == 0 && seconds == 0 && nanos == 0 {
        if days == 0 {
            write!(f, "T0S")?;
        }
        return Ok(());
    }
    write!(f, "T")?;
    if hours > 0 {
        write!(f, "{}H", hours)?;
    }
    if minutes > 0 {
        write!(f, "{}M", minutes)?;
    }
    if seconds > 0 || nanos > 0 {
        if nanos > 0 {
            let frac = format!("{:09}", nanos);
            write!(f, "{}.{}S", seconds, frac.trim_end_matches('0'))?;
        } else {
            write!(f, "{}S", seconds)?;
        }
    }
    Ok(())
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}/", self.repeat_count)?;
        format_duration(self.cycle, f)
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl Serialize for Schedule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let expression = String::deserialize(deserializer)?;
        parse(&expression).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
