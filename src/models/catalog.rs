use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Canonical catalog item. Never deleted in normal flow.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub brand: Option<String>,
}

/// Append-only price history point, one per confirmed invoice item.
/// Ordering by `created_at` defines "latest" and "previous".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PricePoint {
    pub material_id: Uuid,
    pub invoice_id: Uuid,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// Learned raw-name -> material mapping. Last write wins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaterialAlias {
    pub alias_name: String,
    pub material_id: Uuid,
}

/// Catalog entry joined with its most recent price point, as used by
/// internal quote pricing. Materials without any price never appear here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PricedMaterial {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub latest_price: BigDecimal,
    pub priced_at: DateTime<Utc>,
}
