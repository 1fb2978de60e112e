//! Timestamp and time-range parsing.
//!
//! Phase boundaries are given as `MM:SS` (or `HH:MM:SS`) offsets into the
//! synced recordings, and ranges as `START-END`. Minutes may exceed 59 in
//! the two-component form (`75:00` is 1h15m).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing timestamps and ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Empty timestamp")]
    Empty,

    #[error("Malformed timestamp '{input}': {reason}")]
    Malformed { input: String, reason: String },

    #[error("Timestamp '{input}' has {field} = {value} (must be below 60)")]
    OutOfRange {
        input: String,
        field: &'static str,
        value: u64,
    },

    #[error("Malformed range '{0}': expected START-END")]
    MalformedRange(String),

    #[error("Range '{0}' does not end after it starts")]
    NotIncreasing(String),
}

/// Offset into a recording with whole-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: u64,
}

impl Timestamp {
    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> u64 {
        self.seconds
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        if hours > 0 {
            write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            write!(f, "{:02}:{:02}", minutes, seconds)
        }
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(TimestampError::Empty);
        }

        let parts = input
            .split(':')
            .map(|part| parse_component(part, input))
            .collect::<Result<Vec<u64>, _>>()?;

        let seconds = match parts.as_slice() {
            [minutes, seconds] => {
                check_below_60(input, "seconds", *seconds)?;
                minutes
                    .checked_mul(60)
                    .and_then(|m| m.checked_add(*seconds))
            }
            [hours, minutes, seconds] => {
                check_below_60(input, "minutes", *minutes)?;
                check_below_60(input, "seconds", *seconds)?;
                hours
                    .checked_mul(3600)
                    .and_then(|h| h.checked_add(minutes * 60 + seconds))
            }
            _ => {
                return Err(TimestampError::Malformed {
                    input: input.to_string(),
                    reason: "expected MM:SS or HH:MM:SS".to_string(),
                })
            }
        };

        seconds
            .map(Timestamp::from_seconds)
            .ok_or_else(|| TimestampError::Malformed {
                input: input.to_string(),
                reason: "value too large".to_string(),
            })
    }
}

fn parse_component(part: &str, input: &str) -> Result<u64, TimestampError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::Malformed {
            input: input.to_string(),
            reason: format!("'{}' is not a number", part),
        });
    }
    part.parse().map_err(|_| TimestampError::Malformed {
        input: input.to_string(),
        reason: format!("'{}' is too large", part),
    })
}

fn check_below_60(input: &str, field: &'static str, value: u64) -> Result<(), TimestampError> {
    if value >= 60 {
        return Err(TimestampError::OutOfRange {
            input: input.to_string(),
            field,
            value,
        });
    }
    Ok(())
}

/// Half-open `[start, end)` window of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    /// Create a range; `end` must come after `start`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, TimestampError> {
        if end <= start {
            return Err(TimestampError::NotIncreasing(format!("{}-{}", start, end)));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Length of the range in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.end.as_seconds() - self.start.as_seconds()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TimeRange {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (start, end) = input
            .split_once('-')
            .ok_or_else(|| TimestampError::MalformedRange(input.to_string()))?;
        if end.contains('-') {
            return Err(TimestampError::MalformedRange(input.to_string()));
        }

        let start: Timestamp = start.parse()?;
        let end: Timestamp = end.parse()?;
        if end <= start {
            return Err(TimestampError::NotIncreasing(input.to_string()));
        }
        Ok(Self { start, end })
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.to_string()
    }
}
