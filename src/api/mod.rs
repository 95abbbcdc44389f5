pub mod handlers;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::service::{CostService, PricingService, ReconciliationService, WorkLogService};

/// Shared state: one instance of each back-office service.
#[derive(Clone)]
pub struct AppState {
    pub reconciliation: Arc<ReconciliationService>,
    pub pricing: Arc<PricingService>,
    pub costs: Arc<CostService>,
    pub worklog: Arc<WorkLogService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/invoices/:id/extraction",
            post(handlers::extract_invoice),
        )
        .route(
            "/api/invoices/:id/reconciliation",
            get(handlers::reconciliation_view),
        )
        .route("/api/invoices/:id/ai-match", post(handlers::ai_match))
        .route("/api/invoices/:id/supplier", put(handlers::update_supplier))
        .route(
            "/api/invoice-items/:id/confirm",
            post(handlers::confirm_item),
        )
        .route("/api/materials", post(handlers::create_material))
        .route("/api/quotes/:id/extraction", post(handlers::extract_quote))
        .route("/api/quotes/:id/pricing", post(handlers::price_quote))
        .route("/api/quotes/:id/summary", get(handlers::quote_summary))
        .route("/api/projects/costs", get(handlers::project_summaries))
        .route("/api/projects/:id/costs", get(handlers::project_costs))
        .route(
            "/api/project-categories/:id",
            delete(handlers::delete_category),
        )
        .route("/api/timesheets", post(handlers::log_time))
        .route("/api/timesheets/batch", post(handlers::log_crew))
        .route("/api/workers/:id/group", put(handlers::assign_group))
        .with_state(state)
}
