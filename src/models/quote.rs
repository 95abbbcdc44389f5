use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quote_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Processing,
    Processed,
    Analyzed,
}

/// Which channel supplied an item's cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Internal,
    Market,
    Manual,
    None,
}

/// Client quote (deviz). Lifecycle: processing -> processed -> analyzed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub client_name: String,
    pub storage_path: String,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

/// Quote line. `deviz_unit_price` is the quoted sale price; the pricing
/// pipeline fills in exactly one of the cost columns per the selected
/// source.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub raw_text: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub deviz_unit_price: BigDecimal,
    pub internal_unit_price: Option<BigDecimal>,
    pub market_unit_price: Option<BigDecimal>,
    pub manual_price: Option<BigDecimal>,
    pub market_source_url: Option<String>,
    pub market_source_name: Option<String>,
    pub selected_price_source: PriceSource,
}

impl QuoteItem {
    /// Resolved unit cost for the selected source, if any.
    pub fn resolved_cost(&self) -> Option<&BigDecimal> {
        match self.selected_price_source {
            PriceSource::Internal => self.internal_unit_price.as_ref(),
            PriceSource::Market => self.market_unit_price.as_ref(),
            PriceSource::Manual => self.manual_price.as_ref(),
            PriceSource::None => None,
        }
    }
}
