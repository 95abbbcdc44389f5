use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PriceSource, Quote, QuoteItem, QuoteStatus};

pub async fn get_quote(pool: &PgPool, id: Uuid) -> Result<Option<Quote>, sqlx::Error> {
    sqlx::query_as::<_, Quote>(
        r#"
        SELECT id, client_name, storage_path, status, created_at
        FROM quotes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn set_quote_status(
    pool: &PgPool,
    id: Uuid,
    status: QuoteStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quotes SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

/// Compensating delete for failed extraction; items cascade.
pub async fn delete_quote(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM quotes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub struct NewQuoteItem {
    pub quote_id: Uuid,
    pub raw_text: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub deviz_unit_price: BigDecimal,
}

pub async fn insert_items(pool: &PgPool, items: &[NewQuoteItem]) -> Result<(), sqlx::Error> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO quote_items (quote_id, raw_text, quantity, unit, deviz_unit_price) ",
    );

    query_builder.push_values(items, |mut b, item| {
        b.push_bind(item.quote_id)
            .push_bind(&item.raw_text)
            .push_bind(item.quantity.clone())
            .push_bind(&item.unit)
            .push_bind(item.deviz_unit_price.clone());
    });

    query_builder.build().execute(pool).await?;
    Ok(())
}

/// Stable raw_text ordering keeps the dedup set, and with it the whole
/// pricing pass, deterministic across runs.
pub async fn list_items(pool: &PgPool, quote_id: Uuid) -> Result<Vec<QuoteItem>, sqlx::Error> {
    sqlx::query_as::<_, QuoteItem>(
        r#"
        SELECT id, quote_id, raw_text, quantity, unit, deviz_unit_price,
               internal_unit_price, market_unit_price, manual_price,
               market_source_url, market_source_name, selected_price_source
        FROM quote_items
        WHERE quote_id = $1
        ORDER BY raw_text, id
        "#,
    )
    .bind(quote_id)
    .fetch_all(pool)
    .await
}

/// Fan-out write of one resolved raw text back to a concrete item.
pub async fn update_item_pricing(
    pool: &PgPool,
    item_id: Uuid,
    internal_unit_price: Option<&BigDecimal>,
    market_unit_price: Option<&BigDecimal>,
    market_source_url: Option<&str>,
    market_source_name: Option<&str>,
    selected_price_source: PriceSource,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE quote_items
        SET internal_unit_price = $2,
            market_unit_price = $3,
            market_source_url = $4,
            market_source_name = $5,
            selected_price_source = $6
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .bind(internal_unit_price)
    .bind(market_unit_price)
    .bind(market_source_url)
    .bind(market_source_name)
    .bind(selected_price_source)
    .execute(pool)
    .await?;
    Ok(())
}
