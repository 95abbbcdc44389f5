use bigdecimal::BigDecimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Invoice, InvoiceItem, InvoiceStatus};

pub async fn get_invoice(pool: &PgPool, id: Uuid) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, supplier_name, storage_path, status, project_id,
               currency, exchange_rate, created_at
        FROM invoices
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn set_invoice_status(
    pool: &PgPool,
    id: Uuid,
    status: InvoiceStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invoices SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_supplier(pool: &PgPool, id: Uuid, supplier: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invoices SET supplier_name = $2 WHERE id = $1")
        .bind(id)
        .bind(supplier)
        .execute(pool)
        .await?;
    Ok(())
}

/// Compensating delete for failed extraction; items cascade.
pub async fn delete_invoice(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Staged row for batch item insertion after extraction.
pub struct NewInvoiceItem {
    pub invoice_id: Uuid,
    pub raw_name: String,
    pub raw_unit: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub brand: Option<String>,
}

pub async fn insert_items(pool: &PgPool, items: &[NewInvoiceItem]) -> Result<(), sqlx::Error> {
    if items.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO invoice_items (invoice_id, raw_name, raw_unit, quantity, unit_price, brand) ",
    );

    query_builder.push_values(items, |mut b, item| {
        b.push_bind(item.invoice_id)
            .push_bind(&item.raw_name)
            .push_bind(&item.raw_unit)
            .push_bind(item.quantity.clone())
            .push_bind(item.unit_price.clone())
            .push_bind(&item.brand);
    });

    query_builder.build().execute(pool).await?;
    Ok(())
}

pub async fn list_items(pool: &PgPool, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, raw_name, raw_unit, quantity, unit_price,
               brand, confirmed_material_id, project_category_id, status
        FROM invoice_items
        WHERE invoice_id = $1
        ORDER BY raw_name
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
}

pub async fn get_item(pool: &PgPool, id: Uuid) -> Result<Option<InvoiceItem>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, raw_name, raw_unit, quantity, unit_price,
               brand, confirmed_material_id, project_category_id, status
        FROM invoice_items
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn pending_item_count(pool: &PgPool, invoice_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM invoice_items
        WHERE invoice_id = $1 AND status = 'pending'
        "#,
    )
    .bind(invoice_id)
    .fetch_one(pool)
    .await
}

/// Marks the item confirmed. Runs inside the confirmation transaction.
pub async fn confirm_item<'e>(
    executor: impl PgExecutor<'e>,
    item_id: Uuid,
    material_id: Uuid,
    category_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE invoice_items
        SET confirmed_material_id = $2,
            project_category_id = $3,
            status = 'confirmed'
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .bind(material_id)
    .bind(category_id)
    .execute(executor)
    .await?;
    Ok(())
}
