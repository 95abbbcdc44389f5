//! Time logging with per-day constraints. Two rules, checked on every
//! write path: a worker logs at most once per project per day, and at
//! most 12 hours across all projects on one day.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::queries_workforce::{self, NewTimesheet};
use crate::error::AppError;
use crate::models::{Timesheet, Worker};

pub const MAX_DAILY_HOURS: u32 = 12;

/// An already-logged entry for the day under validation.
#[derive(Debug, Clone)]
pub struct DayEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub hours: BigDecimal,
}

impl From<&Timesheet> for DayEntry {
    fn from(t: &Timesheet) -> Self {
        Self {
            id: t.id,
            project_id: t.project_id,
            hours: t.hours.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkLogViolation {
    #[error("hours must be greater than zero")]
    NonPositiveHours,

    #[error("hours are already logged for this project on this day")]
    DuplicateProject,

    #[error("{already_logged}h already logged plus {proposed}h proposed exceeds the 12h daily ceiling")]
    DailyCeilingExceeded {
        already_logged: BigDecimal,
        proposed: BigDecimal,
    },
}

/// Check a proposed entry against the worker's existing entries for that
/// day. `exclude` skips one entry id, for edits replacing an existing row.
/// Exactly 12 hours is allowed; the ceiling rejects only what exceeds it.
pub fn validate_entry(
    existing: &[DayEntry],
    project_id: Uuid,
    hours: &BigDecimal,
    exclude: Option<Uuid>,
) -> Result<(), WorkLogViolation> {
    if *hours <= BigDecimal::zero() {
        return Err(WorkLogViolation::NonPositiveHours);
    }

    let relevant: Vec<&DayEntry> = existing
        .iter()
        .filter(|e| Some(e.id) != exclude)
        .collect();

    if relevant.iter().any(|e| e.project_id == project_id) {
        return Err(WorkLogViolation::DuplicateProject);
    }

    let already_logged: BigDecimal = relevant.iter().map(|e| e.hours.clone()).sum();
    if &already_logged + hours > BigDecimal::from(MAX_DAILY_HOURS) {
        return Err(WorkLogViolation::DailyCeilingExceeded {
            already_logged,
            proposed: hours.clone(),
        });
    }

    Ok(())
}

pub struct LogTimeRequest {
    pub worker_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: BigDecimal,
    pub description: Option<String>,
}

pub struct WorkLogService {
    pool: PgPool,
}

impl WorkLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_worker(&self, worker_id: Uuid) -> Result<Worker, AppError> {
        queries_workforce::get_worker(&self.pool, worker_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "worker",
                id: worker_id,
            })
    }

    /// Log one worker's hours. Cost is frozen at the worker's current rate.
    pub async fn log_time(&self, req: LogTimeRequest) -> Result<Timesheet, AppError> {
        let worker = self.load_worker(req.worker_id).await?;

        let day = queries_workforce::timesheets_for_day(&self.pool, worker.id, req.date).await?;
        let existing: Vec<DayEntry> = day.iter().map(DayEntry::from).collect();
        validate_entry(&existing, req.project_id, &req.hours, None)
            .map_err(|v| AppError::Validation(v.to_string()))?;

        let entry = NewTimesheet {
            worker_id: worker.id,
            project_id: req.project_id,
            date: req.date,
            calculated_cost: &req.hours * &worker.hourly_rate,
            hours: req.hours,
            description: req.description,
            batch_id: None,
            group_name: None,
        };
        let saved = queries_workforce::insert_timesheet(&self.pool, &entry).await?;

        tracing::info!(
            "Logged {}h for worker {} on {}",
            saved.hours,
            worker.id,
            saved.date
        );
        Ok(saved)
    }

    /// Log the same hours for every active member of a group, all-or-nothing.
    /// Validation runs for every member before the first insert, so one
    /// member's full day rejects the whole batch.
    pub async fn log_crew(
        &self,
        group_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
        hours: BigDecimal,
        description: Option<String>,
    ) -> Result<Vec<Timesheet>, AppError> {
        let group = queries_workforce::get_group(&self.pool, group_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "worker group",
                id: group_id,
            })?;

        let members = queries_workforce::workers_in_group(&self.pool, group_id).await?;
        if members.is_empty() {
            return Err(AppError::Validation(format!(
                "Group '{}' has no active members",
                group.name
            )));
        }

        for member in &members {
            let day =
                queries_workforce::timesheets_for_day(&self.pool, member.id, date).await?;
            let existing: Vec<DayEntry> = day.iter().map(DayEntry::from).collect();
            validate_entry(&existing, project_id, &hours, None).map_err(|v| {
                AppError::Validation(format!("{}: {}", member.name, v))
            })?;
        }

        let batch_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(members.len());
        for member in &members {
            let entry = NewTimesheet {
                worker_id: member.id,
                project_id,
                date,
                hours: hours.clone(),
                description: description.clone(),
                calculated_cost: &hours * &member.hourly_rate,
                batch_id: Some(batch_id),
                group_name: Some(group.name.clone()),
            };
            saved.push(queries_workforce::insert_timesheet(&mut *tx, &entry).await?);
        }
        tx.commit().await?;

        tracing::info!(
            "Crew log: {} entries for group '{}' on {} (batch {})",
            saved.len(),
            group.name,
            date,
            batch_id
        );
        Ok(saved)
    }

    pub async fn assign_group(
        &self,
        worker_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        self.load_worker(worker_id).await?;
        if let Some(group_id) = group_id {
            queries_workforce::get_group(&self.pool, group_id)
                .await?
                .ok_or(AppError::NotFound {
                    entity: "worker group",
                    id: group_id,
                })?;
        }
        queries_workforce::assign_group(&self.pool, worker_id, group_id).await?;
        Ok(())
    }
}
