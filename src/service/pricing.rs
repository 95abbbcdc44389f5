//! Quote pricing: a two-phase batch pipeline. Phase A cleans raw line
//! texts in chunks; phase B prices every distinct cleaned text against
//! the internal catalog first and the market search as a fallback, then
//! fans the resolutions back out to the concrete quote items.

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::{BigDecimal, One, Zero};
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::{retry_ai, AiGateway};
use crate::config::{AiConfig, PricingConfig};
use crate::db::{queries_catalog, queries_quotes};
use crate::error::AppError;
use crate::models::{PriceSource, PricedMaterial, Quote, QuoteItem, QuoteStatus};
use crate::service::matching;

/// Working state for one distinct raw text.
#[derive(Debug, Clone)]
pub struct TextResolution {
    pub clean_name: String,
    pub is_service_only: bool,
    pub source: PriceSource,
    pub final_price: Option<BigDecimal>,
    pub market_url: Option<String>,
    pub market_store: Option<String>,
}

impl TextResolution {
    /// Fallback state: the raw text itself, priced as a material.
    fn new(raw_text: &str) -> Self {
        Self {
            clean_name: raw_text.to_string(),
            is_service_only: false,
            source: PriceSource::None,
            final_price: None,
            market_url: None,
            market_store: None,
        }
    }
}

/// First substring hit among materials that have a price history.
pub fn internal_price<'a>(
    clean_name: &str,
    catalog: &'a [PricedMaterial],
) -> Option<&'a PricedMaterial> {
    catalog.iter().find(|m| matching::names_match(clean_name, &m.name))
}

/// Phase A: batch cleaning. Degrades instead of failing: any chunk error
/// leaves the remaining texts on their raw-name fallback and moves on.
pub async fn clean_phase(
    ai: &dyn AiGateway,
    resolutions: &mut IndexMap<String, TextResolution>,
    chunk_size: usize,
    chunk_pause: Duration,
    max_retries: u32,
    retry_base_ms: u64,
) {
    if !ai.is_configured() {
        return;
    }

    let texts: Vec<String> = resolutions.keys().cloned().collect();
    for chunk in texts.chunks(chunk_size.max(1)) {
        let cleaned = match retry_ai(max_retries, retry_base_ms, || ai.clean_items(chunk)).await {
            Ok(cleaned) => cleaned,
            Err(e) => {
                tracing::warn!("Batch cleaning failed, falling back to raw names: {}", e);
                break;
            }
        };

        for item in cleaned {
            if let Some(res) = resolutions.get_mut(&item.original_text) {
                res.clean_name = item.clean_name;
                res.is_service_only = item.is_service_only;
            }
        }

        // Short pause between chunks for the external rate limit.
        tokio::time::sleep(chunk_pause).await;
    }
}

/// Phase B: sequential pricing of every distinct text. Service-only lines
/// go straight to `manual`; internal catalog hits win over the market;
/// per-item market failures leave the line unpriced and do not abort the
/// batch.
pub async fn price_phase(
    ai: &dyn AiGateway,
    resolutions: &mut IndexMap<String, TextResolution>,
    catalog: &[PricedMaterial],
    market_delay: Duration,
    max_retries: u32,
    retry_base_ms: u64,
) {
    let market_enabled = ai.is_configured();

    for res in resolutions.values_mut() {
        if res.is_service_only {
            res.source = PriceSource::Manual;
            continue;
        }

        if let Some(material) = internal_price(&res.clean_name, catalog) {
            res.final_price = Some(material.latest_price.clone());
            res.source = PriceSource::Internal;
            continue;
        }

        if !market_enabled {
            continue;
        }

        // Fixed delay before every market lookup to stay under the
        // external rate ceiling.
        tokio::time::sleep(market_delay).await;

        let query = res.clean_name.clone();
        match retry_ai(max_retries, retry_base_ms, || ai.search_market_price(&query)).await {
            Ok(quote) => {
                let price = quote.price.filter(|p| *p > BigDecimal::zero());
                if quote.found {
                    if let Some(price) = price {
                        res.final_price = Some(price);
                        res.source = PriceSource::Market;
                        res.market_store = quote.store_name;
                        res.market_url = quote.source_url;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Market search failed for {}: {}", query, e);
            }
        }
    }
}

/// Read-time profitability of a quote line.
#[derive(Debug, Clone, Serialize)]
pub struct ItemMargin {
    pub cost: BigDecimal,
    pub profit: BigDecimal,
    pub margin_pct: BigDecimal,
}

/// Margin against the quoted sale price. `None` without a resolved cost
/// (or a zero sale price): never divide by what is not there.
pub fn item_margin(item: &QuoteItem) -> Option<ItemMargin> {
    let cost = item.resolved_cost()?;
    if cost.is_zero() || item.deviz_unit_price.is_zero() {
        return None;
    }

    let profit = &item.deviz_unit_price - cost;
    let margin_pct = &profit / &item.deviz_unit_price * BigDecimal::from(100);
    Some(ItemMargin {
        cost: cost.clone(),
        profit,
        margin_pct,
    })
}

/// Display-time grouping of quote lines that resolve to the same product:
/// same market URL, or same (internal price, raw text) pair. Purely a
/// presentation aggregation, nothing is merged in storage.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedLine {
    pub item: QuoteItem,
    pub total_quantity: BigDecimal,
    pub group_size: usize,
    pub margin: Option<ItemMargin>,
}

pub fn consolidate(items: &[QuoteItem]) -> Vec<ConsolidatedLine> {
    let mut groups: IndexMap<String, ConsolidatedLine> = IndexMap::new();

    for item in items {
        let key = match item.selected_price_source {
            PriceSource::Market => item
                .market_source_url
                .clone()
                .unwrap_or_else(|| item.raw_text.clone()),
            PriceSource::Internal => match &item.internal_unit_price {
                Some(price) => format!("INT_{}_{}", price, item.raw_text),
                None => item.raw_text.clone(),
            },
            _ => item.raw_text.clone(),
        };

        let entry = groups.entry(key).or_insert_with(|| ConsolidatedLine {
            item: item.clone(),
            total_quantity: BigDecimal::zero(),
            group_size: 0,
            margin: item_margin(item),
        });
        entry.total_quantity += &item.quantity;
        entry.group_size += 1;
    }

    let mut lines: Vec<ConsolidatedLine> = groups.into_values().collect();
    lines.sort_by(|a, b| b.item.deviz_unit_price.cmp(&a.item.deviz_unit_price));
    lines
}

#[derive(Debug, Serialize)]
pub struct QuoteSummary {
    pub quote: Quote,
    pub lines: Vec<ConsolidatedLine>,
    pub total_revenue: BigDecimal,
    pub total_cost: BigDecimal,
}

pub struct PricingService {
    pool: PgPool,
    ai: Arc<dyn AiGateway>,
    ai_config: AiConfig,
    pricing: PricingConfig,
}

impl PricingService {
    pub fn new(
        pool: PgPool,
        ai: Arc<dyn AiGateway>,
        ai_config: AiConfig,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            pool,
            ai,
            ai_config,
            pricing,
        }
    }

    /// Run document extraction for a freshly uploaded quote. Deletes the
    /// quote on extraction failure, mirroring the invoice path.
    pub async fn ingest_extraction(&self, quote_id: Uuid) -> Result<usize, AppError> {
        let quote = queries_quotes::get_quote(&self.pool, quote_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "quote",
                id: quote_id,
            })?;

        if !self.ai.is_configured() {
            return Err(AppError::Validation(
                "AI API key is not configured".to_string(),
            ));
        }

        let extracted = match retry_ai(self.ai_config.max_retries, self.ai_config.retry_base_ms, || {
            self.ai.extract_quote(&quote.storage_path)
        })
        .await
        {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::error!("Quote {} extraction failed, deleting: {}", quote_id, e);
                queries_quotes::delete_quote(&self.pool, quote_id).await?;
                return Err(AppError::Extraction(e.to_string()));
            }
        };

        let items: Vec<queries_quotes::NewQuoteItem> = extracted
            .items
            .into_iter()
            .map(|item| queries_quotes::NewQuoteItem {
                quote_id,
                raw_text: item.description,
                quantity: item.quantity.unwrap_or_else(BigDecimal::one),
                unit: item.unit.unwrap_or_else(|| "buc".to_string()),
                deviz_unit_price: item.unit_price.unwrap_or_else(BigDecimal::zero),
            })
            .collect();
        let count = items.len();
        queries_quotes::insert_items(&self.pool, &items).await?;
        queries_quotes::set_quote_status(&self.pool, quote_id, QuoteStatus::Processed).await?;

        tracing::info!("Quote {}: {} items extracted", quote_id, count);
        Ok(count)
    }

    /// The full pipeline for one quote. Re-running with unchanged catalog
    /// data and unchanged AI answers reproduces the same sources and
    /// prices.
    pub async fn run(&self, quote_id: Uuid) -> Result<(), AppError> {
        queries_quotes::get_quote(&self.pool, quote_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "quote",
                id: quote_id,
            })?;

        let items = queries_quotes::list_items(&self.pool, quote_id).await?;
        if items.is_empty() {
            tracing::info!("Quote {} has no items, skipping pricing", quote_id);
            return Ok(());
        }

        let catalog = queries_catalog::priced_materials(&self.pool).await?;

        // Distinct raw texts, insertion-ordered.
        let mut resolutions: IndexMap<String, TextResolution> = IndexMap::new();
        for item in &items {
            resolutions
                .entry(item.raw_text.clone())
                .or_insert_with(|| TextResolution::new(&item.raw_text));
        }

        tracing::info!(
            "Quote {}: pricing {} distinct texts ({} items)",
            quote_id,
            resolutions.len(),
            items.len()
        );

        clean_phase(
            self.ai.as_ref(),
            &mut resolutions,
            self.pricing.clean_chunk_size,
            Duration::from_millis(self.pricing.chunk_pause_ms),
            self.ai_config.max_retries,
            self.ai_config.retry_base_ms,
        )
        .await;

        price_phase(
            self.ai.as_ref(),
            &mut resolutions,
            &catalog,
            Duration::from_millis(self.pricing.market_delay_ms),
            self.ai_config.max_retries,
            self.ai_config.retry_base_ms,
        )
        .await;

        // Fan the distinct resolutions back out to every concrete item.
        for item in &items {
            let Some(res) = resolutions.get(&item.raw_text) else {
                continue;
            };
            let (internal, market) = match res.source {
                PriceSource::Internal => (res.final_price.as_ref(), None),
                PriceSource::Market => (None, res.final_price.as_ref()),
                _ => (None, None),
            };
            queries_quotes::update_item_pricing(
                &self.pool,
                item.id,
                internal,
                market,
                res.market_url.as_deref(),
                res.market_store.as_deref(),
                res.source,
            )
            .await?;
        }

        queries_quotes::set_quote_status(&self.pool, quote_id, QuoteStatus::Analyzed).await?;
        tracing::info!("Quote {} analyzed", quote_id);
        Ok(())
    }

    /// Consolidated read view with margins and quote-level totals.
    pub async fn summary(&self, quote_id: Uuid) -> Result<QuoteSummary, AppError> {
        let quote = queries_quotes::get_quote(&self.pool, quote_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "quote",
                id: quote_id,
            })?;
        let items = queries_quotes::list_items(&self.pool, quote_id).await?;

        let total_revenue = items
            .iter()
            .map(|i| &i.deviz_unit_price * &i.quantity)
            .sum::<BigDecimal>();
        let total_cost = items
            .iter()
            .filter_map(|i| i.resolved_cost().map(|c| c * &i.quantity))
            .sum::<BigDecimal>();

        Ok(QuoteSummary {
            quote,
            lines: consolidate(&items),
            total_revenue,
            total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::RecordingGateway;
    use crate::ai::{CleanedItem, MarketQuote};
    use chrono::Utc;
    use std::sync::atomic::Ordering;

    fn priced(name: &str, price: i32) -> PricedMaterial {
        PricedMaterial {
            id: Uuid::new_v4(),
            name: name.to_string(),
            unit: "buc".to_string(),
            latest_price: BigDecimal::from(price),
            priced_at: Utc::now(),
        }
    }

    fn resolution_map(texts: &[&str]) -> IndexMap<String, TextResolution> {
        texts
            .iter()
            .map(|t| (t.to_string(), TextResolution::new(t)))
            .collect()
    }

    fn quote_item(raw_text: &str, deviz: i32) -> QuoteItem {
        QuoteItem {
            id: Uuid::new_v4(),
            quote_id: Uuid::new_v4(),
            raw_text: raw_text.to_string(),
            quantity: BigDecimal::from(1),
            unit: "buc".to_string(),
            deviz_unit_price: BigDecimal::from(deviz),
            internal_unit_price: None,
            market_unit_price: None,
            manual_price: None,
            market_source_url: None,
            market_source_name: None,
            selected_price_source: PriceSource::None,
        }
    }

    #[test]
    fn internal_match_is_bidirectional() {
        let catalog = vec![priced("Ciment", 30), priced("Vopsea lavabila 15l", 120)];
        assert_eq!(
            internal_price("Ciment Baumit 40kg", &catalog).map(|m| m.id),
            Some(catalog[0].id)
        );
        assert_eq!(
            internal_price("Vopsea", &catalog).map(|m| m.id),
            Some(catalog[1].id)
        );
        assert!(internal_price("Cabluri electrice", &catalog).is_none());
    }

    #[tokio::test]
    async fn service_only_lines_never_trigger_market_search() {
        let ai = RecordingGateway::default();
        ai.clean_result.lock().unwrap().push(CleanedItem {
            original_text: "Montaj usa interior".to_string(),
            clean_name: "usa interior".to_string(),
            is_service_only: true,
        });

        let mut resolutions = resolution_map(&["Montaj usa interior"]);
        clean_phase(&ai, &mut resolutions, 20, Duration::ZERO, 3, 1).await;
        price_phase(&ai, &mut resolutions, &[], Duration::ZERO, 3, 1).await;

        let res = &resolutions["Montaj usa interior"];
        assert_eq!(res.source, PriceSource::Manual);
        assert!(res.final_price.is_none());
        assert_eq!(ai.market_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn internal_hit_short_circuits_market_search() {
        let ai = RecordingGateway::default();
        let catalog = vec![priced("Ciment", 30)];

        let mut resolutions = resolution_map(&["Ciment Baumit 40kg"]);
        price_phase(&ai, &mut resolutions, &catalog, Duration::ZERO, 3, 1).await;

        let res = &resolutions["Ciment Baumit 40kg"];
        assert_eq!(res.source, PriceSource::Internal);
        assert_eq!(res.final_price, Some(BigDecimal::from(30)));
        assert_eq!(ai.market_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn market_fallback_captures_store_and_url() {
        let ai = RecordingGateway::default();
        ai.market_result.lock().unwrap().insert(
            "Teava PVC 110".to_string(),
            MarketQuote {
                found: true,
                price: Some(BigDecimal::from(45)),
                currency: Some("RON".to_string()),
                store_name: Some("Dedeman".to_string()),
                source_url: Some("https://dedeman.ro/teava-pvc-110".to_string()),
            },
        );

        let mut resolutions = resolution_map(&["Teava PVC 110"]);
        price_phase(&ai, &mut resolutions, &[], Duration::ZERO, 3, 1).await;

        let res = &resolutions["Teava PVC 110"];
        assert_eq!(res.source, PriceSource::Market);
        assert_eq!(res.final_price, Some(BigDecimal::from(45)));
        assert_eq!(res.market_store.as_deref(), Some("Dedeman"));
        assert_eq!(
            res.market_url.as_deref(),
            Some("https://dedeman.ro/teava-pvc-110")
        );
    }

    #[tokio::test]
    async fn not_found_or_zero_price_leaves_line_unpriced() {
        let ai = RecordingGateway::default();
        ai.market_result.lock().unwrap().insert(
            "Produs obscur".to_string(),
            MarketQuote {
                found: true,
                price: Some(BigDecimal::zero()),
                ..Default::default()
            },
        );

        let mut resolutions = resolution_map(&["Produs obscur", "Alt produs"]);
        price_phase(&ai, &mut resolutions, &[], Duration::ZERO, 3, 1).await;

        assert_eq!(resolutions["Produs obscur"].source, PriceSource::None);
        assert_eq!(resolutions["Alt produs"].source, PriceSource::None);
        assert_eq!(ai.market_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cleaning_failure_falls_back_to_raw_names() {
        let ai = RecordingGateway {
            fail_cleaning: true,
            ..Default::default()
        };

        let mut resolutions = resolution_map(&["Montaj usa interior"]);
        clean_phase(&ai, &mut resolutions, 20, Duration::ZERO, 3, 1).await;

        let res = &resolutions["Montaj usa interior"];
        assert_eq!(res.clean_name, "Montaj usa interior");
        assert!(!res.is_service_only);
    }

    #[tokio::test]
    async fn pricing_is_deterministic_for_unchanged_inputs() {
        let catalog = vec![priced("Ciment", 30)];
        let texts = ["Ciment Baumit 40kg", "Montaj usa interior"];

        let mut first = resolution_map(&texts);
        let mut second = resolution_map(&texts);
        for run in [&mut first, &mut second] {
            let ai = RecordingGateway::default();
            ai.clean_result.lock().unwrap().push(CleanedItem {
                original_text: "Montaj usa interior".to_string(),
                clean_name: "usa interior".to_string(),
                is_service_only: true,
            });
            clean_phase(&ai, run, 20, Duration::ZERO, 3, 1).await;
            price_phase(&ai, run, &catalog, Duration::ZERO, 3, 1).await;
        }

        for text in texts {
            assert_eq!(first[text].source, second[text].source);
            assert_eq!(first[text].final_price, second[text].final_price);
        }
    }

    #[test]
    fn margin_requires_a_resolved_cost() {
        let mut item = quote_item("Ciment Baumit 40kg", 100);
        assert!(item_margin(&item).is_none());

        item.selected_price_source = PriceSource::Internal;
        item.internal_unit_price = Some(BigDecimal::from(60));
        let margin = item_margin(&item).unwrap();
        assert_eq!(margin.profit, BigDecimal::from(40));
        assert_eq!(margin.margin_pct, BigDecimal::from(40));
    }

    #[test]
    fn consolidation_groups_by_market_url() {
        let mut a = quote_item("Teava PVC 110 tronson 1", 80);
        a.selected_price_source = PriceSource::Market;
        a.market_unit_price = Some(BigDecimal::from(45));
        a.market_source_url = Some("https://dedeman.ro/teava-pvc-110".to_string());
        a.quantity = BigDecimal::from(3);

        let mut b = quote_item("Teava PVC 110 tronson 2", 80);
        b.selected_price_source = PriceSource::Market;
        b.market_unit_price = Some(BigDecimal::from(45));
        b.market_source_url = Some("https://dedeman.ro/teava-pvc-110".to_string());
        b.quantity = BigDecimal::from(2);

        let c = quote_item("Ceva diferit", 50);

        let lines = consolidate(&[a, b, c]);
        assert_eq!(lines.len(), 2);
        let grouped = lines.iter().find(|l| l.group_size == 2).unwrap();
        assert_eq!(grouped.total_quantity, BigDecimal::from(5));
    }

    #[test]
    fn consolidation_keeps_distinct_internal_prices_apart() {
        let mut a = quote_item("Ciment", 40);
        a.selected_price_source = PriceSource::Internal;
        a.internal_unit_price = Some(BigDecimal::from(30));

        let mut b = quote_item("Ciment", 40);
        b.selected_price_source = PriceSource::Internal;
        b.internal_unit_price = Some(BigDecimal::from(25));

        let lines = consolidate(&[a, b]);
        assert_eq!(lines.len(), 2);
    }
}
