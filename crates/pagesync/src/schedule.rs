//! Cron schedule evaluation for sync configs.
//!
//! Schedules are evaluated opportunistically: a trigger asks whether a config
//! is due at the moment an external event arrives. Nothing here sleeps or
//! spawns.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ScheduleError(String);

/// A parsed cron expression.
///
/// Accepts the classic five-field form (`min hour dom month dow`) as well as
/// the six/seven-field form with a leading seconds field.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    inner: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let normalized = normalize(expr);
        let inner = cron::Schedule::from_str(&normalized).map_err(|e| ScheduleError(e.to_string()))?;
        Ok(Self {
            expr: expr.trim().to_string(),
            inner,
        })
    }

    /// The expression as given.
    #[must_use]
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First fire time strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&after).next()
    }

    /// Whether the schedule fired between `last_sync` and `now`.
    ///
    /// A config that never synced is always due.
    #[must_use]
    pub fn is_due(&self, last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_sync {
            None => true,
            Some(last) => self.next_after(last).is_some_and(|next| next <= now),
        }
    }
}

fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}
