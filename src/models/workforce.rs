use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "worker_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Active,
    Inactive,
}

/// `group_id` is a nullable foreign key, so a worker has at most one
/// current group by construction.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub hourly_rate: BigDecimal,
    pub status: WorkerStatus,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkerGroup {
    pub id: Uuid,
    pub name: String,
}

/// `calculated_cost` is hours x hourly_rate at insert time and is not
/// recomputed when the rate later changes. `batch_id` groups the rows of
/// one crew log event; `group_name` is a snapshot of the group's name at
/// log time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Timesheet {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: BigDecimal,
    pub description: Option<String>,
    pub calculated_cost: BigDecimal,
    pub batch_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subcontractor {
    pub id: Uuid,
    pub name: String,
    pub trade: String,
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubcontractorJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub subcontractor_id: Uuid,
    pub description: String,
    pub agreed_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// Append-only; no invariant caps payments at `agreed_price`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubcontractorPayment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub amount: BigDecimal,
    pub created_at: DateTime<Utc>,
}
