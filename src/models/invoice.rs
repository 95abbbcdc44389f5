use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Processing,
    Processed,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_item_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceItemStatus {
    Pending,
    Confirmed,
}

/// Supplier invoice. Created on upload (processing), populated by AI
/// extraction (processed), then items are confirmed one by one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub supplier_name: String,
    pub storage_path: String,
    pub status: InvoiceStatus,
    pub project_id: Option<Uuid>,
    pub currency: String,
    pub exchange_rate: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// Extracted invoice line. Only confirmed items contribute to cost
/// aggregation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub raw_name: String,
    pub raw_unit: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub brand: Option<String>,
    pub confirmed_material_id: Option<Uuid>,
    pub project_category_id: Option<Uuid>,
    pub status: InvoiceItemStatus,
}
