//! Threshold ranges in the monitoring plugins syntax `[@][start:][end]`.
//!
//! | range     | alerts when the value is   |
//! |-----------|----------------------------|
//! | `10`      | `< 0` or `> 10`            |
//! | `10:`     | `< 10`                     |
//! | `~:10`    | `> 10`                     |
//! | `10:20`   | `< 10` or `> 20`           |
//! | `@10:20`  | `>= 10` and `<= 20`        |
//!
//! An empty range has no bounds and never alerts.

use std::fmt;
use std::str::FromStr;

use crate::{State, ToPerfString};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("invalid number '{0}' in range")]
    InvalidNumber(String),
    #[error("range start {start} is greater than its end {end}")]
    StartAfterEnd { start: f64, end: f64 },
}

/// A threshold range. `None` bounds stand for negative and positive infinity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    start: Option<f64>,
    end: Option<f64>,
    inside: bool,
}

impl Range {
    /// A range without bounds, it never alerts.
    pub fn unbounded() -> Self {
        Range::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none() && !self.inside
    }

    /// Returns `true` if `value` should raise an alert for this range.
    pub fn alerts(&self, value: f64) -> bool {
        let within = self.start.map_or(true, |start| value >= start)
            && self.end.map_or(true, |end| value <= end);

        if self.inside {
            within
        } else {
            !within
        }
    }
}

fn parse_bound(s: &str) -> Result<f64, RangeError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| RangeError::InvalidNumber(s.to_owned()))
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Range::unbounded());
        }

        let (inside, s) = match s.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (start, end) = match s.split_once(':') {
            Some((start, end)) => {
                let start = match start {
                    "~" => None,
                    "" => Some(0.0),
                    start => Some(parse_bound(start)?),
                };
                let end = match end {
                    "" => None,
                    end => Some(parse_bound(end)?),
                };
                (start, end)
            }
            None => (Some(0.0), Some(parse_bound(s)?)),
        };

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(RangeError::StartAfterEnd { start, end });
            }
        }

        Ok(Range { start, end, inside })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            return Ok(());
        }

        if self.inside {
            f.write_str("@")?;
        }

        match (self.start, self.end) {
            (Some(start), Some(end)) if start == 0.0 => write!(f, "{}", end),
            (Some(start), end) => write!(f, "{}:{}", start, end.to_perf_string()),
            (None, end) => write!(f, "~:{}", end.to_perf_string()),
        }
    }
}

impl ToPerfString for Range {
    fn to_perf_string(&self) -> String {
        self.to_string()
    }
}

/// A warning and a critical range for one numeric metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    pub warning: Range,
    pub critical: Range,
}

impl Thresholds {
    pub fn new(warning: Range, critical: Range) -> Self {
        Thresholds { warning, critical }
    }

    /// CRITICAL if the critical range alerts, WARNING if the warning range does, OK otherwise.
    pub fn evaluate(&self, value: f64) -> State {
        if self.critical.alerts(value) {
            State::Critical
        } else if self.warning.alerts(value) {
            State::Warning
        } else {
            State::Ok
        }
    }
}
