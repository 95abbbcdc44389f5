pub mod aggregation;
pub mod matching;
pub mod pricing;
pub mod reconciliation;
pub mod worklog;

pub use aggregation::CostService;
pub use pricing::PricingService;
pub use reconciliation::ReconciliationService;
pub use worklog::WorkLogService;
