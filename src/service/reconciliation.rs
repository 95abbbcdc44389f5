//! Invoice reconciliation: extraction ingest, match suggestions and the
//! confirm operation. A confirmed item is final; there is no reverse
//! transition.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, One, Zero};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::{retry_ai, AiGateway, CatalogEntry, MatchCandidate};
use crate::config::AiConfig;
use crate::db::{queries_catalog, queries_invoices};
use crate::error::AppError;
use crate::models::{InvoiceItem, InvoiceItemStatus, InvoiceStatus, Material};
use crate::service::matching;

/// Placeholder when the extractor cannot read a supplier name.
const UNKNOWN_SUPPLIER: &str = "Furnizor necunoscut";

/// Everything the confirm transaction writes, computed up front.
#[derive(Debug, Clone)]
pub struct ConfirmationPlan {
    pub material_id: Uuid,
    pub category_id: Option<Uuid>,
    /// RON-normalized: unit_price x the invoice's exchange rate.
    pub price_in_ron: BigDecimal,
    pub alias_name: String,
    /// Present only when the item carries a brand and the material has
    /// none yet. Never overwrites.
    pub brand_backfill: Option<String>,
}

/// The item state machine only goes pending -> confirmed; a repeated
/// confirm (double-click, client retry) must not append a second price
/// point or retarget the alias.
pub fn ensure_confirmable(item: &InvoiceItem) -> Result<(), AppError> {
    if item.status == InvoiceItemStatus::Confirmed {
        return Err(AppError::Validation(
            "item is already confirmed".to_string(),
        ));
    }
    Ok(())
}

/// Compute the confirmation writes for an item against a chosen material.
pub fn plan_confirmation(
    item: &InvoiceItem,
    material: &Material,
    exchange_rate: &BigDecimal,
    category_id: Option<Uuid>,
) -> ConfirmationPlan {
    let brand_backfill = match (&item.brand, &material.brand) {
        (Some(brand), None) => Some(brand.clone()),
        _ => None,
    };

    ConfirmationPlan {
        material_id: material.id,
        category_id,
        price_in_ron: &item.unit_price * exchange_rate,
        alias_name: item.raw_name.clone(),
        brand_backfill,
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub material_id: Option<Uuid>,
    pub project_category_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ItemWithSuggestion {
    #[serde(flatten)]
    pub item: InvoiceItem,
    /// Substring-match default; a suggestion only, never auto-confirmed.
    pub suggested_material_id: Option<Uuid>,
}

pub struct ReconciliationService {
    pool: PgPool,
    ai: Arc<dyn AiGateway>,
    ai_config: AiConfig,
}

impl ReconciliationService {
    pub fn new(pool: PgPool, ai: Arc<dyn AiGateway>, ai_config: AiConfig) -> Self {
        Self {
            pool,
            ai,
            ai_config,
        }
    }

    /// Run document extraction for a freshly uploaded invoice and persist
    /// the raw items. On extraction failure the invoice row is deleted so
    /// no record is stuck in `processing` forever.
    pub async fn ingest_extraction(&self, invoice_id: Uuid) -> Result<usize, AppError> {
        let invoice = queries_invoices::get_invoice(&self.pool, invoice_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "invoice",
                id: invoice_id,
            })?;

        if !self.ai.is_configured() {
            return Err(AppError::Validation(
                "AI API key is not configured".to_string(),
            ));
        }

        let extracted = match retry_ai(self.ai_config.max_retries, self.ai_config.retry_base_ms, || {
            self.ai.extract_invoice(&invoice.storage_path)
        })
        .await
        {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::error!("Invoice {} extraction failed, deleting: {}", invoice_id, e);
                queries_invoices::delete_invoice(&self.pool, invoice_id).await?;
                return Err(AppError::Extraction(e.to_string()));
            }
        };

        let supplier = extracted
            .supplier_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string());
        queries_invoices::update_supplier(&self.pool, invoice_id, &supplier).await?;

        let items: Vec<queries_invoices::NewInvoiceItem> = extracted
            .items
            .into_iter()
            .map(|item| queries_invoices::NewInvoiceItem {
                invoice_id,
                raw_name: item.raw_name,
                raw_unit: item.raw_unit.unwrap_or_else(|| "buc".to_string()),
                quantity: item.quantity.unwrap_or_else(BigDecimal::one),
                unit_price: item.unit_price.unwrap_or_else(BigDecimal::zero),
                brand: None,
            })
            .collect();
        let count = items.len();
        queries_invoices::insert_items(&self.pool, &items).await?;

        queries_invoices::set_invoice_status(&self.pool, invoice_id, InvoiceStatus::Processed)
            .await?;

        tracing::info!("Invoice {}: {} items extracted from {}", invoice_id, count, supplier);
        Ok(count)
    }

    /// Items with their substring-match suggestions. Confirmed items are
    /// passed through untouched.
    pub async fn reconciliation_view(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<ItemWithSuggestion>, AppError> {
        let items = queries_invoices::list_items(&self.pool, invoice_id).await?;
        let catalog = queries_catalog::list_materials(&self.pool).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let suggested_material_id = if item.confirmed_material_id.is_some() {
                    None
                } else {
                    matching::suggest_material(&item.raw_name, &catalog)
                };
                ItemWithSuggestion {
                    item,
                    suggested_material_id,
                }
            })
            .collect())
    }

    /// On-demand alias + AI matching for an invoice's unconfirmed items.
    /// Returns item id -> material id suggestions.
    pub async fn ai_match(&self, invoice_id: Uuid) -> Result<HashMap<Uuid, Uuid>, AppError> {
        let items = queries_invoices::list_items(&self.pool, invoice_id).await?;
        let candidates: Vec<MatchCandidate> = items
            .into_iter()
            .filter(|i| i.status == InvoiceItemStatus::Pending && i.confirmed_material_id.is_none())
            .map(|i| MatchCandidate {
                id: i.id,
                raw_name: i.raw_name,
                raw_unit: i.raw_unit,
            })
            .collect();

        if candidates.is_empty() {
            return Ok(HashMap::new());
        }

        let names: Vec<String> = {
            let mut names: Vec<String> =
                candidates.iter().map(|c| c.raw_name.clone()).collect();
            names.sort();
            names.dedup();
            names
        };
        let aliases: HashMap<String, Uuid> = queries_catalog::find_aliases(&self.pool, &names)
            .await?
            .into_iter()
            .map(|a| (a.alias_name, a.material_id))
            .collect();

        let catalog: Vec<CatalogEntry> = queries_catalog::list_materials(&self.pool)
            .await?
            .into_iter()
            .map(|m| CatalogEntry {
                id: m.id,
                name: m.name,
                unit: m.unit,
            })
            .collect();

        matching::resolve_matches(
            self.ai.as_ref(),
            candidates,
            &aliases,
            &catalog,
            self.ai_config.max_retries,
            self.ai_config.retry_base_ms,
        )
        .await
    }

    /// Confirm one item against a material, in a single transaction:
    /// status flip, price-history point, alias upsert and optional brand
    /// back-fill land together or not at all.
    pub async fn confirm_item(&self, item_id: Uuid, req: ConfirmRequest) -> Result<(), AppError> {
        let item = queries_invoices::get_item(&self.pool, item_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "invoice item",
                id: item_id,
            })?;
        ensure_confirmable(&item)?;

        let material_id = req.material_id.ok_or_else(|| {
            AppError::Validation("select a material before confirming".to_string())
        })?;

        let invoice = queries_invoices::get_invoice(&self.pool, item.invoice_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "invoice",
                id: item.invoice_id,
            })?;
        let material = queries_catalog::get_material(&self.pool, material_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "material",
                id: material_id,
            })?;

        let plan = plan_confirmation(
            &item,
            &material,
            &invoice.exchange_rate,
            req.project_category_id,
        );

        let mut tx = self.pool.begin().await?;
        queries_invoices::confirm_item(&mut *tx, item.id, plan.material_id, plan.category_id)
            .await?;
        queries_catalog::insert_price_point(
            &mut *tx,
            plan.material_id,
            invoice.id,
            &plan.price_in_ron,
        )
        .await?;
        queries_catalog::upsert_alias(&mut *tx, &plan.alias_name, plan.material_id).await?;
        if let Some(brand) = &plan.brand_backfill {
            queries_catalog::backfill_brand(&mut *tx, plan.material_id, brand).await?;
        }
        tx.commit().await?;

        // Last pending item confirmed: the whole invoice is done.
        if queries_invoices::pending_item_count(&self.pool, invoice.id).await? == 0 {
            queries_invoices::set_invoice_status(&self.pool, invoice.id, InvoiceStatus::Confirmed)
                .await?;
        }

        tracing::info!(
            "Item {} confirmed against material {} at {} RON",
            item.id,
            material.name,
            plan.price_in_ron
        );
        Ok(())
    }

    /// Inline material creation from the reconciliation screen.
    pub async fn create_material(
        &self,
        name: &str,
        unit: &str,
        brand: Option<&str>,
    ) -> Result<Material, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("material name is required".to_string()));
        }
        Ok(queries_catalog::insert_material(&self.pool, name, unit, brand).await?)
    }

    pub async fn update_supplier(&self, invoice_id: Uuid, supplier: &str) -> Result<(), AppError> {
        queries_invoices::get_invoice(&self.pool, invoice_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "invoice",
                id: invoice_id,
            })?;
        queries_invoices::update_supplier(&self.pool, invoice_id, supplier).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(raw_name: &str, unit_price: i32, brand: Option<&str>) -> InvoiceItem {
        InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            raw_name: raw_name.to_string(),
            raw_unit: "buc".to_string(),
            quantity: BigDecimal::from(10),
            unit_price: BigDecimal::from(unit_price),
            brand: brand.map(|b| b.to_string()),
            confirmed_material_id: None,
            project_category_id: None,
            status: InvoiceItemStatus::Pending,
        }
    }

    fn material(brand: Option<&str>) -> Material {
        Material {
            id: Uuid::new_v4(),
            name: "Ciment".to_string(),
            unit: "sac".to_string(),
            brand: brand.map(|b| b.to_string()),
        }
    }

    #[test]
    fn confirmed_item_cannot_be_confirmed_again() {
        let mut item = item("Ciment Baumit 40kg", 25, None);
        assert!(ensure_confirmable(&item).is_ok());

        item.status = InvoiceItemStatus::Confirmed;
        item.confirmed_material_id = Some(Uuid::new_v4());
        assert!(matches!(
            ensure_confirmable(&item),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn plan_normalizes_price_to_ron() {
        let item = item("Ciment Baumit 40kg", 25, None);
        let material = material(None);
        let rate = BigDecimal::from(5);

        let plan = plan_confirmation(&item, &material, &rate, None);

        assert_eq!(plan.material_id, material.id);
        assert_eq!(plan.price_in_ron, BigDecimal::from(125));
        assert_eq!(plan.alias_name, "Ciment Baumit 40kg");
    }

    #[test]
    fn plan_matches_example_scenario_at_unit_rate() {
        // InvoiceItem{unit_price=25}, exchange_rate=1, no brand on either
        // side: price point 25, alias set, no brand back-fill.
        let item = item("Ciment Baumit 40kg", 25, None);
        let material = material(None);

        let plan = plan_confirmation(&item, &material, &BigDecimal::from(1), None);

        assert_eq!(plan.price_in_ron, BigDecimal::from(25));
        assert_eq!(plan.alias_name, "Ciment Baumit 40kg");
        assert!(plan.brand_backfill.is_none());
    }

    #[test]
    fn brand_backfill_fills_a_hole() {
        let item = item("Ciment Baumit 40kg", 25, Some("Baumit"));
        let material = material(None);

        let plan = plan_confirmation(&item, &material, &BigDecimal::from(1), None);
        assert_eq!(plan.brand_backfill.as_deref(), Some("Baumit"));
    }

    #[test]
    fn brand_backfill_never_overwrites() {
        let item = item("Ciment Baumit 40kg", 25, Some("Baumit"));
        let material = material(Some("Holcim"));

        let plan = plan_confirmation(&item, &material, &BigDecimal::from(1), None);
        assert!(plan.brand_backfill.is_none());
    }

    #[test]
    fn category_choice_is_carried_through() {
        let item = item("Ciment Baumit 40kg", 25, None);
        let material = material(None);
        let category = Uuid::new_v4();

        let plan = plan_confirmation(&item, &material, &BigDecimal::from(1), Some(category));
        assert_eq!(plan.category_id, Some(category));
    }
}
