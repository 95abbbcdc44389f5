use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ConfirmedItemRow, Project, ProjectCategory};

pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT id, name, budget, status, created_at
        FROM projects
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT id, name, budget, status, created_at
        FROM projects
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_categories(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ProjectCategory>, sqlx::Error> {
    sqlx::query_as::<_, ProjectCategory>(
        r#"
        SELECT id, project_id, name, kind, allocated_amount, color, created_at
        FROM project_categories
        WHERE project_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn get_category(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ProjectCategory>, sqlx::Error> {
    sqlx::query_as::<_, ProjectCategory>(
        r#"
        SELECT id, project_id, name, kind, allocated_amount, color, created_at
        FROM project_categories
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_category(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM project_categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Confirmed invoice lines for a project with the invoice's exchange rate
/// attached. Pending lines never reach the aggregation engine.
pub async fn confirmed_items(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ConfirmedItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ConfirmedItemRow>(
        r#"
        SELECT ii.raw_name, ii.raw_unit, ii.quantity, ii.unit_price,
               i.exchange_rate, ii.project_category_id
        FROM invoice_items ii
        INNER JOIN invoices i ON i.id = ii.invoice_id
        WHERE i.project_id = $1
          AND ii.status = 'confirmed'
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn labor_total(pool: &PgPool, project_id: Uuid) -> Result<BigDecimal, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT COALESCE(SUM(calculated_cost), 0)
        FROM timesheets
        WHERE project_id = $1
        "#,
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
}

pub async fn subcontractor_total(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<BigDecimal, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT COALESCE(SUM(sp.amount), 0)
        FROM subcontractor_payments sp
        INNER JOIN subcontractor_jobs sj ON sj.id = sp.job_id
        WHERE sj.project_id = $1
        "#,
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
}

/// RON-normalized confirmed materials spend per project, for the list
/// view. Uses the same exchange-rate rule as the per-project engine.
pub async fn materials_spent_by_project(
    pool: &PgPool,
) -> Result<Vec<(Uuid, BigDecimal)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, BigDecimal)>(
        r#"
        SELECT i.project_id, SUM(ii.quantity * ii.unit_price * i.exchange_rate)
        FROM invoice_items ii
        INNER JOIN invoices i ON i.id = ii.invoice_id
        WHERE ii.status = 'confirmed'
          AND i.project_id IS NOT NULL
        GROUP BY i.project_id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn labor_spent_by_project(
    pool: &PgPool,
) -> Result<Vec<(Uuid, BigDecimal)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, BigDecimal)>(
        r#"
        SELECT project_id, SUM(calculated_cost)
        FROM timesheets
        GROUP BY project_id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn subcontractor_spent_by_project(
    pool: &PgPool,
) -> Result<Vec<(Uuid, BigDecimal)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, BigDecimal)>(
        r#"
        SELECT sj.project_id, SUM(sp.amount)
        FROM subcontractor_payments sp
        INNER JOIN subcontractor_jobs sj ON sj.id = sp.job_id
        GROUP BY sj.project_id
        "#,
    )
    .fetch_all(pool)
    .await
}
