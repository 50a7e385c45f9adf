use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;

use crate::models::{ExecutionUpdate, JobName, ScheduledTask, TaskStatus};

const SELECT_COLUMNS: &str = "
    SELECT id, scheduler_name, description, cron_expression, time_zone, is_active,
           status, last_execution_date, execution_start_time, execution_end_time, error_message
    FROM scheduled_task";

#[derive(Debug, FromRow)]
struct ScheduledTaskRow {
    id: i64,
    scheduler_name: String,
    description: Option<String>,
    cron_expression: String,
    time_zone: String,
    is_active: bool,
    status: Option<String>,
    last_execution_date: Option<NaiveDate>,
    execution_start_time: Option<DateTime<Utc>>,
    execution_end_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<ScheduledTaskRow> for ScheduledTask {
    type Error = sqlx::Error;

    fn try_from(row: ScheduledTaskRow) -> Result<Self, Self::Error> {
        let job_name = row
            .scheduler_name
            .parse::<JobName>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        // An unrecognised status is treated as "never run" rather than failing the read
        let status = row.status.as_deref().and_then(|s| match s.parse::<TaskStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Ignoring stored status for {}: {}", job_name, e);
                None
            }
        });

        Ok(ScheduledTask {
            id: row.id,
            job_name,
            description: row.description,
            cron_expression: row.cron_expression,
            time_zone: row.time_zone,
            is_active: row.is_active,
            status,
            last_execution_date: row.last_execution_date,
            execution_start_time: row.execution_start_time,
            execution_end_time: row.execution_end_time,
            error_message: row.error_message,
        })
    }
}

pub async fn find_by_name(
    pool: &PgPool,
    job_name: JobName,
) -> Result<Option<ScheduledTask>, sqlx::Error> {
    let row = sqlx::query_as::<_, ScheduledTaskRow>(&format!(
        "{} WHERE scheduler_name = $1",
        SELECT_COLUMNS
    ))
    .bind(job_name.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(ScheduledTask::try_from).transpose()
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ScheduledTask>, sqlx::Error> {
    let row = sqlx::query_as::<_, ScheduledTaskRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(ScheduledTask::try_from).transpose()
}

/// All tasks ordered by name. Rows naming a job this build does not know are skipped.
pub async fn find_all(pool: &PgPool) -> Result<Vec<ScheduledTask>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ScheduledTaskRow>(&format!(
        "{} ORDER BY scheduler_name ASC",
        SELECT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        let name = row.scheduler_name.clone();
        match ScheduledTask::try_from(row) {
            Ok(task) => tasks.push(task),
            Err(e) => warn!("Skipping scheduled_task row '{}': {}", name, e),
        }
    }

    Ok(tasks)
}

/// Insert or fully replace the row for `task.job_name`, returning its id.
/// Only for seeding; running jobs go through [`update_execution`] and
/// [`set_active`].
pub async fn upsert(pool: &PgPool, task: &ScheduledTask) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "
        INSERT INTO scheduled_task
            (scheduler_name, description, cron_expression, time_zone, is_active,
             status, last_execution_date, execution_start_time, execution_end_time, error_message)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (scheduler_name) DO UPDATE SET
            description = EXCLUDED.description,
            cron_expression = EXCLUDED.cron_expression,
            time_zone = EXCLUDED.time_zone,
            is_active = EXCLUDED.is_active,
            status = EXCLUDED.status,
            last_execution_date = EXCLUDED.last_execution_date,
            execution_start_time = EXCLUDED.execution_start_time,
            execution_end_time = EXCLUDED.execution_end_time,
            error_message = EXCLUDED.error_message
        RETURNING id
        ",
    )
    .bind(task.job_name.as_str())
    .bind(task.description.as_deref())
    .bind(&task.cron_expression)
    .bind(&task.time_zone)
    .bind(task.is_active)
    .bind(task.status.map(|s| s.as_str()))
    .bind(task.last_execution_date)
    .bind(task.execution_start_time)
    .bind(task.execution_end_time)
    .bind(task.error_message.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Write the lifecycle columns of one job. Returns the number of rows touched.
pub async fn update_execution(
    pool: &PgPool,
    job_name: JobName,
    update: &ExecutionUpdate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "
        UPDATE scheduled_task SET
            status = $2,
            last_execution_date = $3,
            execution_start_time = $4,
            execution_end_time = $5,
            error_message = $6
        WHERE scheduler_name = $1
        ",
    )
    .bind(job_name.as_str())
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.last_execution_date)
    .bind(update.execution_start_time)
    .bind(update.execution_end_time)
    .bind(update.error_message.as_deref())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Flip `is_active` for one job. Returns the number of rows touched.
pub async fn set_active(pool: &PgPool, job_name: JobName, active: bool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE scheduled_task SET is_active = $2 WHERE scheduler_name = $1")
        .bind(job_name.as_str())
        .bind(active)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
