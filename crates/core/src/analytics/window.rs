use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// Half-open time range `[start, end)`. A missing bound is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Every timestamp, including records that carry none.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: None }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self { start: None, end: Some(end) }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn validate(&self) -> EngineResult<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(EngineError::invalid(format!(
                    "window start {start} is after window end {end}"
                )));
            }
        }
        Ok(())
    }

    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }

    /// An absent timestamp only falls inside the fully unbounded window.
    pub fn contains(&self, at: Option<DateTime<Utc>>) -> bool {
        match at {
            Some(at) => self.contains_instant(at),
            None => self.is_unbounded(),
        }
    }
}
