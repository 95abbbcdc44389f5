use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
}

/// Explicit category kind, set at creation time. Labor and subcontractor
/// totals fold into categories of the matching kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Material,
    Labor,
    Subcontractor,
    Other,
}

/// `budget` is the sum of category allocations at save time, not an
/// independent figure.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub budget: BigDecimal,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub allocated_amount: BigDecimal,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Confirmed invoice line joined with its invoice's exchange rate, the
/// unit the cost aggregation engine consumes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConfirmedItemRow {
    pub raw_name: String,
    pub raw_unit: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub project_category_id: Option<Uuid>,
}

/// Per-category spend with budget progress. `progress_pct` is absent when
/// nothing is allocated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpend {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub allocated_amount: BigDecimal,
    pub spent: BigDecimal,
    pub progress_pct: Option<BigDecimal>,
}

/// Confirmed items grouped by raw name. Differently spelled raw names for
/// the same material stay separate in this view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub raw_name: String,
    pub unit: String,
    pub quantity: BigDecimal,
    pub total_cost: BigDecimal,
}

/// Full per-project cost breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCosts {
    pub materials_spent: BigDecimal,
    pub labor_spent: BigDecimal,
    pub subcontractor_spent: BigDecimal,
    pub total_spent: BigDecimal,
    pub categories: Vec<CategorySpend>,
    pub material_usage: Vec<MaterialUsage>,
}

/// Row for the project list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCostSummary {
    pub id: Uuid,
    pub name: String,
    pub budget: BigDecimal,
    pub status: ProjectStatus,
    pub total_spent: BigDecimal,
}
