use bigdecimal::BigDecimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Material, MaterialAlias, PricedMaterial};

/// Full catalog, alphabetical. Fetch order doubles as the substring
/// matcher's tie-break order.
pub async fn list_materials(pool: &PgPool) -> Result<Vec<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(
        r#"
        SELECT id, name, unit, brand
        FROM materials
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_material(pool: &PgPool, id: Uuid) -> Result<Option<Material>, sqlx::Error> {
    sqlx::query_as::<_, Material>(
        r#"
        SELECT id, name, unit, brand
        FROM materials
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Inline material creation. No duplicate-name check; operator discipline
/// is the only safeguard.
pub async fn insert_material(
    pool: &PgPool,
    name: &str,
    unit: &str,
    brand: Option<&str>,
) -> Result<Material, sqlx::Error> {
    sqlx::query_as::<_, Material>(
        r#"
        INSERT INTO materials (name, unit, brand)
        VALUES ($1, $2, $3)
        RETURNING id, name, unit, brand
        "#,
    )
    .bind(name)
    .bind(unit)
    .bind(brand)
    .fetch_one(pool)
    .await
}

/// One-way brand enrichment: only fills a hole, never overwrites.
pub async fn backfill_brand<'e>(
    executor: impl PgExecutor<'e>,
    material_id: Uuid,
    brand: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE materials
        SET brand = $2
        WHERE id = $1 AND brand IS NULL
        "#,
    )
    .bind(material_id)
    .bind(brand)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_aliases(
    pool: &PgPool,
    names: &[String],
) -> Result<Vec<MaterialAlias>, sqlx::Error> {
    sqlx::query_as::<_, MaterialAlias>(
        r#"
        SELECT alias_name, material_id
        FROM material_aliases
        WHERE alias_name = ANY($1)
        "#,
    )
    .bind(names)
    .fetch_all(pool)
    .await
}

/// Unconditional overwrite: a later confirmation for the same raw name
/// silently retargets the alias for all future matches.
pub async fn upsert_alias<'e>(
    executor: impl PgExecutor<'e>,
    alias_name: &str,
    material_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO material_aliases (alias_name, material_id)
        VALUES ($1, $2)
        ON CONFLICT (alias_name) DO UPDATE SET material_id = EXCLUDED.material_id
        "#,
    )
    .bind(alias_name)
    .bind(material_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_price_point<'e>(
    executor: impl PgExecutor<'e>,
    material_id: Uuid,
    invoice_id: Uuid,
    unit_price: &BigDecimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO prices (material_id, invoice_id, unit_price)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(material_id)
    .bind(invoice_id)
    .bind(unit_price)
    .execute(executor)
    .await?;
    Ok(())
}

/// Materials with their most recent price point, alphabetical. Materials
/// that never got a price are excluded on purpose.
pub async fn priced_materials(pool: &PgPool) -> Result<Vec<PricedMaterial>, sqlx::Error> {
    sqlx::query_as::<_, PricedMaterial>(
        r#"
        SELECT id, name, unit, latest_price, priced_at FROM (
            SELECT DISTINCT ON (m.id)
                   m.id,
                   m.name,
                   m.unit,
                   p.unit_price AS latest_price,
                   p.created_at AS priced_at
            FROM materials m
            INNER JOIN prices p ON p.material_id = m.id
            ORDER BY m.id, p.created_at DESC
        ) latest
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
}
