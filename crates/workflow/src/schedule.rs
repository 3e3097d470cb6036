// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule definitions for cron-triggered workflows

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Errors from schedule configuration
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidExpr { expr: String, message: String },
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// A schedule that submits a workflow on a cron timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDef {
    /// Schedule name (injected from map key)
    #[serde(skip)]
    pub name: String,
    /// Standard 5-field cron expression (minute hour dom month dow)
    pub cron: String,
    /// Workflow to submit: a name resolved in the workflows directory
    pub workflow: String,
    /// Inputs passed to every run this schedule fires
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// IANA timezone the expression is evaluated in (default UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Normalize a standard 5-field expression to the 6-field (with seconds)
/// form the cron parser expects. Expressions already carrying a seconds
/// field pass through unchanged.
pub fn normalize_cron_expr(expr: &str) -> String {
    let fields = expr.split_whitespace().count();
    if fields == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

impl ScheduleDef {
    /// Parse the cron expression.
    pub fn parse_cron(&self) -> Result<Schedule, ScheduleError> {
        Schedule::from_str(&normalize_cron_expr(&self.cron)).map_err(|e| {
            ScheduleError::InvalidExpr {
                expr: self.cron.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Resolve the configured timezone (default UTC).
    pub fn tz(&self) -> Result<Tz, ScheduleError> {
        match &self.timezone {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ScheduleError::UnknownTimezone(name.clone())),
        }
    }

    /// The next fire time strictly after `after`, evaluated in the
    /// schedule's timezone and returned in UTC.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let schedule = self.parse_cron()?;
        let tz = self.tz()?;
        let local = after.with_timezone(&tz);
        Ok(schedule.after(&local).next().map(|t| t.with_timezone(&Utc)))
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
