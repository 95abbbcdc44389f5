use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Material, ProjectCostSummary, ProjectCosts, Timesheet};
use crate::service::pricing::QuoteSummary;
use crate::service::reconciliation::{ConfirmRequest, ItemWithSuggestion};
use crate::service::worklog::LogTimeRequest;

use super::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub struct ExtractionResponse {
    pub success: bool,
    pub items_extracted: usize,
}

pub async fn extract_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtractionResponse>, AppError> {
    let items_extracted = state.reconciliation.ingest_extraction(id).await?;
    Ok(Json(ExtractionResponse {
        success: true,
        items_extracted,
    }))
}

pub async fn reconciliation_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ItemWithSuggestion>>, AppError> {
    Ok(Json(state.reconciliation.reconciliation_view(id).await?))
}

#[derive(Serialize)]
pub struct AiMatchResponse {
    pub success: bool,
    /// Item id -> suggested material id.
    pub matches: HashMap<Uuid, Uuid>,
}

pub async fn ai_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AiMatchResponse>, AppError> {
    let matches = state.reconciliation.ai_match(id).await?;
    Ok(Json(AiMatchResponse {
        success: true,
        matches,
    }))
}

#[derive(Deserialize)]
pub struct SupplierRequest {
    pub supplier_name: String,
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SupplierRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .reconciliation
        .update_supplier(id, &req.supplier_name)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn confirm_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<Value>, AppError> {
    state.reconciliation.confirm_item(id, req).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub unit: String,
    pub brand: Option<String>,
}

pub async fn create_material(
    State(state): State<AppState>,
    Json(req): Json<CreateMaterialRequest>,
) -> Result<Json<Material>, AppError> {
    let material = state
        .reconciliation
        .create_material(&req.name, &req.unit, req.brand.as_deref())
        .await?;
    Ok(Json(material))
}

pub async fn extract_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtractionResponse>, AppError> {
    let items_extracted = state.pricing.ingest_extraction(id).await?;
    Ok(Json(ExtractionResponse {
        success: true,
        items_extracted,
    }))
}

pub async fn price_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.pricing.run(id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn quote_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(state.pricing.summary(id).await?))
}

pub async fn project_summaries(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectCostSummary>>, AppError> {
    Ok(Json(state.costs.project_summaries().await?))
}

pub async fn project_costs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectCosts>, AppError> {
    Ok(Json(state.costs.project_costs(id).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.costs.delete_category(id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct LogTimeBody {
    pub worker_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: BigDecimal,
    pub description: Option<String>,
}

pub async fn log_time(
    State(state): State<AppState>,
    Json(req): Json<LogTimeBody>,
) -> Result<Json<Timesheet>, AppError> {
    let saved = state
        .worklog
        .log_time(LogTimeRequest {
            worker_id: req.worker_id,
            project_id: req.project_id,
            date: req.date,
            hours: req.hours,
            description: req.description,
        })
        .await?;
    Ok(Json(saved))
}

#[derive(Deserialize)]
pub struct LogCrewBody {
    pub group_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: BigDecimal,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct LogCrewResponse {
    pub success: bool,
    pub entries: Vec<Timesheet>,
}

pub async fn log_crew(
    State(state): State<AppState>,
    Json(req): Json<LogCrewBody>,
) -> Result<Json<LogCrewResponse>, AppError> {
    let entries = state
        .worklog
        .log_crew(
            req.group_id,
            req.project_id,
            req.date,
            req.hours,
            req.description,
        )
        .await?;
    Ok(Json(LogCrewResponse {
        success: true,
        entries,
    }))
}

#[derive(Deserialize)]
pub struct AssignGroupRequest {
    pub group_id: Option<Uuid>,
}

pub async fn assign_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignGroupRequest>,
) -> Result<Json<Value>, AppError> {
    state.worklog.assign_group(id, req.group_id).await?;
    Ok(Json(json!({ "success": true })))
}
