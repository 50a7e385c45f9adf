use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// Job identity
// ==============================================================================

/// Every background job the scheduler knows how to run.
///
/// Persisted as SCREAMING_SNAKE_CASE text in `scheduled_task.scheduler_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobName {
    ReloadInstruments,
    ReloadWatchlist,
    ClearMfNavCache,
    UpdateMfNavCache,
    CaptureAccountSnapshot,
    WeeklyPfReport,
    MonthlySipReport,
    MonthlyPfReport,
    QuarterlyPfReport,
    YearlyPfReport,
    RestartApplication,
    SchedulerErrorNotification,
    RetrieveIpoDetails,
    OpenIpoNotification,
}

impl JobName {
    pub const ALL: [JobName; 14] = [
        JobName::ReloadInstruments,
        JobName::ReloadWatchlist,
        JobName::ClearMfNavCache,
        JobName::UpdateMfNavCache,
        JobName::CaptureAccountSnapshot,
        JobName::WeeklyPfReport,
        JobName::MonthlySipReport,
        JobName::MonthlyPfReport,
        JobName::QuarterlyPfReport,
        JobName::YearlyPfReport,
        JobName::RestartApplication,
        JobName::SchedulerErrorNotification,
        JobName::RetrieveIpoDetails,
        JobName::OpenIpoNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::ReloadInstruments => "RELOAD_INSTRUMENTS",
            JobName::ReloadWatchlist => "RELOAD_WATCHLIST",
            JobName::ClearMfNavCache => "CLEAR_MF_NAV_CACHE",
            JobName::UpdateMfNavCache => "UPDATE_MF_NAV_CACHE",
            JobName::CaptureAccountSnapshot => "CAPTURE_ACCOUNT_SNAPSHOT",
            JobName::WeeklyPfReport => "WEEKLY_PF_REPORT",
            JobName::MonthlySipReport => "MONTHLY_SIP_REPORT",
            JobName::MonthlyPfReport => "MONTHLY_PF_REPORT",
            JobName::QuarterlyPfReport => "QUARTERLY_PF_REPORT",
            JobName::YearlyPfReport => "YEARLY_PF_REPORT",
            JobName::RestartApplication => "RESTART_APPLICATION",
            JobName::SchedulerErrorNotification => "SCHEDULER_ERROR_NOTIFICATION",
            JobName::RetrieveIpoDetails => "RETRIEVE_IPO_DETAILS",
            JobName::OpenIpoNotification => "OPEN_IPO_NOTIFICATION",
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        JobName::ALL
            .iter()
            .copied()
            .find(|job| job.as_str() == wanted)
            .ok_or_else(|| format!("Unknown job name: {}", s))
    }
}

// ==============================================================================
// Execution status
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Skipped => "SKIPPED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "SKIPPED" => Ok(TaskStatus::Skipped),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

// ==============================================================================
// Execution record
// ==============================================================================

/// Persisted schedule and last-run state for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub job_name: JobName,
    pub description: Option<String>,
    pub cron_expression: String,
    pub time_zone: String,
    pub is_active: bool,
    pub status: Option<TaskStatus>,
    pub last_execution_date: Option<NaiveDate>,
    pub execution_start_time: Option<DateTime<Utc>>,
    pub execution_end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ScheduledTask {
    /// A freshly seeded record that has never been fired.
    pub fn new(id: i64, job_name: JobName, cron_expression: &str, time_zone: &str) -> Self {
        Self {
            id,
            job_name,
            description: None,
            cron_expression: cron_expression.to_string(),
            time_zone: time_zone.to_string(),
            is_active: true,
            status: None,
            last_execution_date: None,
            execution_start_time: None,
            execution_end_time: None,
            error_message: None,
        }
    }

    pub fn schedule(&self) -> JobSchedule {
        JobSchedule {
            cron_expression: self.cron_expression.clone(),
            time_zone: self.time_zone.clone(),
        }
    }

    /// Wall-clock duration of the last finished run.
    pub fn last_duration(&self) -> Option<chrono::Duration> {
        match (self.execution_start_time, self.execution_end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// The lifecycle columns of this record.
    pub fn execution(&self) -> ExecutionUpdate {
        ExecutionUpdate {
            status: self.status,
            last_execution_date: self.last_execution_date,
            execution_start_time: self.execution_start_time,
            execution_end_time: self.execution_end_time,
            error_message: self.error_message.clone(),
        }
    }

    pub fn apply_execution(&mut self, update: &ExecutionUpdate) {
        self.status = update.status;
        self.last_execution_date = update.last_execution_date;
        self.execution_start_time = update.execution_start_time;
        self.execution_end_time = update.execution_end_time;
        self.error_message = update.error_message.clone();
    }
}

/// Lifecycle columns written by the execution wrapper. Schedule and
/// `is_active` are never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionUpdate {
    pub status: Option<TaskStatus>,
    pub last_execution_date: Option<NaiveDate>,
    pub execution_start_time: Option<DateTime<Utc>>,
    pub execution_end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Cron expression and IANA zone a job fires on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSchedule {
    pub cron_expression: String,
    pub time_zone: String,
}

/// Requested change to a task's active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusChange {
    Activate,
    Deactivate,
}

impl FromStr for StatusChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ACTIVATE") {
            Ok(StatusChange::Activate)
        } else if s.trim().eq_ignore_ascii_case("DEACTIVATE") {
            Ok(StatusChange::Deactivate)
        } else {
            Err(format!("Invalid status change: {}", s))
        }
    }
}
