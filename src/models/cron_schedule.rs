use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::errors::AppError;
use crate::models::scheduled_task::{JobName, JobSchedule};

/// A job schedule that has been parsed and bound to its time zone.
#[derive(Debug, Clone)]
pub struct CompiledSchedule {
    pub job_name: JobName,
    pub expression: String,
    pub time_zone: Tz,
    schedule: Schedule,
}

impl CompiledSchedule {
    /// Parse a stored schedule.
    ///
    /// Expressions use the six-field form with seconds
    /// (`sec min hour day-of-month month day-of-week`), optionally followed by a year.
    pub fn compile(job_name: JobName, schedule: &JobSchedule) -> Result<Self, AppError> {
        let expression = schedule.cron_expression.trim().to_string();
        let parsed = Schedule::from_str(&expression).map_err(|e| {
            AppError::Configuration(format!(
                "Invalid cron expression '{}' for {}: {}",
                expression, job_name, e
            ))
        })?;

        let time_zone: Tz = schedule.time_zone.trim().parse().map_err(|_| {
            AppError::Configuration(format!(
                "Unknown time zone '{}' for {}",
                schedule.time_zone, job_name
            ))
        })?;

        Ok(Self {
            job_name,
            expression,
            time_zone,
            schedule: parsed,
        })
    }

    /// Next fire time strictly after `now`, in the schedule's own zone.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let local = now.with_timezone(&self.time_zone);
        self.schedule.after(&local).next()
    }

    pub fn upcoming(&self, now: DateTime<Utc>, count: usize) -> Vec<DateTime<Tz>> {
        let local = now.with_timezone(&self.time_zone);
        self.schedule.after(&local).take(count).collect()
    }
}
