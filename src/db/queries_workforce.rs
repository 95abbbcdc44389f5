use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Timesheet, Worker, WorkerGroup};

pub async fn get_worker(pool: &PgPool, id: Uuid) -> Result<Option<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(
        r#"
        SELECT id, name, role, hourly_rate, status, group_id
        FROM workers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_group(pool: &PgPool, id: Uuid) -> Result<Option<WorkerGroup>, sqlx::Error> {
    sqlx::query_as::<_, WorkerGroup>(
        r#"
        SELECT id, name
        FROM worker_groups
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn workers_in_group(
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Vec<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(
        r#"
        SELECT id, name, role, hourly_rate, status, group_id
        FROM workers
        WHERE group_id = $1 AND status = 'active'
        ORDER BY name
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

/// Single-valued membership: assigning a group is one column update, no
/// cleanup of prior rows needed.
pub async fn assign_group(
    pool: &PgPool,
    worker_id: Uuid,
    group_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE workers SET group_id = $2 WHERE id = $1")
        .bind(worker_id)
        .bind(group_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All rows logged by a worker on one day, the input of the constraint
/// checker.
pub async fn timesheets_for_day(
    pool: &PgPool,
    worker_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<Timesheet>, sqlx::Error> {
    sqlx::query_as::<_, Timesheet>(
        r#"
        SELECT id, worker_id, project_id, date, hours, description,
               calculated_cost, batch_id, group_name, created_at
        FROM timesheets
        WHERE worker_id = $1 AND date = $2
        "#,
    )
    .bind(worker_id)
    .bind(date)
    .fetch_all(pool)
    .await
}

pub struct NewTimesheet {
    pub worker_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: BigDecimal,
    pub description: Option<String>,
    pub calculated_cost: BigDecimal,
    pub batch_id: Option<Uuid>,
    pub group_name: Option<String>,
}

pub async fn insert_timesheet<'e>(
    executor: impl PgExecutor<'e>,
    entry: &NewTimesheet,
) -> Result<Timesheet, sqlx::Error> {
    sqlx::query_as::<_, Timesheet>(
        r#"
        INSERT INTO timesheets
            (worker_id, project_id, date, hours, description,
             calculated_cost, batch_id, group_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, worker_id, project_id, date, hours, description,
                  calculated_cost, batch_id, group_name, created_at
        "#,
    )
    .bind(entry.worker_id)
    .bind(entry.project_id)
    .bind(entry.date)
    .bind(entry.hours.clone())
    .bind(&entry.description)
    .bind(entry.calculated_cost.clone())
    .bind(entry.batch_id)
    .bind(&entry.group_name)
    .fetch_one(executor)
    .await
}
