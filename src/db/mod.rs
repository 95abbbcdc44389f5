pub mod pool;
pub mod queries_catalog;
pub mod queries_invoices;
pub mod queries_projects;
pub mod queries_quotes;
pub mod queries_workforce;

pub use pool::create_pool;
