pub mod catalog;
pub mod invoice;
pub mod project;
pub mod quote;
pub mod workforce;

pub use catalog::{Material, MaterialAlias, PricePoint, PricedMaterial};
pub use invoice::{Invoice, InvoiceItem, InvoiceItemStatus, InvoiceStatus};
pub use project::{
    CategoryKind, CategorySpend, ConfirmedItemRow, MaterialUsage, Project, ProjectCategory,
    ProjectCostSummary, ProjectCosts, ProjectStatus,
};
pub use quote::{PriceSource, Quote, QuoteItem, QuoteStatus};
pub use workforce::{
    Subcontractor, SubcontractorJob, SubcontractorPayment, Timesheet, Worker, WorkerGroup,
    WorkerStatus,
};
