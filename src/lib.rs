pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use ai::{AiGateway, HttpAiGateway};
pub use config::AppConfig;
pub use db::create_pool;
pub use error::AppError;
pub use service::{CostService, PricingService, ReconciliationService, WorkLogService};
