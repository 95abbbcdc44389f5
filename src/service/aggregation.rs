//! Cost aggregation. One engine computes every project cost figure so
//! that exchange-rate handling cannot drift between views: a confirmed
//! line always contributes quantity x unit_price x exchange_rate, in RON.

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::queries_projects;
use crate::error::AppError;
use crate::models::{
    CategoryKind, CategorySpend, ConfirmedItemRow, MaterialUsage, ProjectCategory, ProjectCosts,
    ProjectCostSummary,
};

/// Budget progress in percent. Absent when nothing is allocated, rather
/// than a division by zero or a fake 100%.
pub fn progress_pct(spent: &BigDecimal, allocated: &BigDecimal) -> Option<BigDecimal> {
    if *allocated <= BigDecimal::zero() {
        return None;
    }
    Some(spent / allocated * BigDecimal::from(100))
}

/// Pure aggregation over one project's confirmed lines plus its labor and
/// subcontractor totals. Labor and subcontractor spend fold into the first
/// category of the matching kind; without one they still count toward the
/// project total.
pub fn aggregate_costs(
    items: &[ConfirmedItemRow],
    labor_spent: BigDecimal,
    subcontractor_spent: BigDecimal,
    categories: &[ProjectCategory],
) -> ProjectCosts {
    let mut materials_spent = BigDecimal::zero();
    let mut category_spent: HashMap<Uuid, BigDecimal> = HashMap::new();
    let mut usage: IndexMap<String, MaterialUsage> = IndexMap::new();

    for item in items {
        let cost = &item.quantity * &item.unit_price * &item.exchange_rate;
        materials_spent += &cost;

        if let Some(category_id) = item.project_category_id {
            *category_spent.entry(category_id).or_default() += &cost;
        }

        let entry = usage
            .entry(item.raw_name.clone())
            .or_insert_with(|| MaterialUsage {
                raw_name: item.raw_name.clone(),
                unit: item.raw_unit.clone(),
                quantity: BigDecimal::zero(),
                total_cost: BigDecimal::zero(),
            });
        entry.quantity += &item.quantity;
        entry.total_cost += &cost;
    }

    let labor_category = categories.iter().find(|c| c.kind == CategoryKind::Labor);
    let sub_category = categories
        .iter()
        .find(|c| c.kind == CategoryKind::Subcontractor);

    if let Some(category) = labor_category {
        *category_spent.entry(category.id).or_default() += &labor_spent;
    }
    if let Some(category) = sub_category {
        *category_spent.entry(category.id).or_default() += &subcontractor_spent;
    }

    let category_rows = categories
        .iter()
        .map(|c| {
            let spent = category_spent.get(&c.id).cloned().unwrap_or_default();
            CategorySpend {
                id: c.id,
                name: c.name.clone(),
                kind: c.kind,
                allocated_amount: c.allocated_amount.clone(),
                progress_pct: progress_pct(&spent, &c.allocated_amount),
                spent,
            }
        })
        .collect();

    let mut material_usage: Vec<MaterialUsage> = usage.into_values().collect();
    material_usage.sort_by(|a, b| b.total_cost.cmp(&a.total_cost));

    let total_spent = &materials_spent + &labor_spent + &subcontractor_spent;
    ProjectCosts {
        materials_spent,
        labor_spent,
        subcontractor_spent,
        total_spent,
        categories: category_rows,
        material_usage,
    }
}

/// A category with recorded spend must keep its history; only empty
/// categories may go.
pub fn ensure_category_deletable(name: &str, spent: &BigDecimal) -> Result<(), AppError> {
    if *spent > BigDecimal::zero() {
        return Err(AppError::Validation(format!(
            "Category '{}' has {} RON in recorded spend and cannot be deleted",
            name, spent
        )));
    }
    Ok(())
}

pub struct CostService {
    pool: PgPool,
}

impl CostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn project_costs(&self, project_id: Uuid) -> Result<ProjectCosts, AppError> {
        queries_projects::get_project(&self.pool, project_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "project",
                id: project_id,
            })?;

        let items = queries_projects::confirmed_items(&self.pool, project_id).await?;
        let labor = queries_projects::labor_total(&self.pool, project_id).await?;
        let sub = queries_projects::subcontractor_total(&self.pool, project_id).await?;
        let categories = queries_projects::list_categories(&self.pool, project_id).await?;

        Ok(aggregate_costs(&items, labor, sub, &categories))
    }

    /// Dashboard list: every project with its total spend, one figure per
    /// cost stream so projects without activity still appear with zeros.
    pub async fn project_summaries(&self) -> Result<Vec<ProjectCostSummary>, AppError> {
        let projects = queries_projects::list_projects(&self.pool).await?;
        let materials: HashMap<Uuid, BigDecimal> =
            queries_projects::materials_spent_by_project(&self.pool)
                .await?
                .into_iter()
                .collect();
        let labor: HashMap<Uuid, BigDecimal> =
            queries_projects::labor_spent_by_project(&self.pool)
                .await?
                .into_iter()
                .collect();
        let sub: HashMap<Uuid, BigDecimal> =
            queries_projects::subcontractor_spent_by_project(&self.pool)
                .await?
                .into_iter()
                .collect();

        Ok(projects
            .into_iter()
            .map(|p| {
                let total_spent = materials.get(&p.id).cloned().unwrap_or_default()
                    + labor.get(&p.id).cloned().unwrap_or_default()
                    + sub.get(&p.id).cloned().unwrap_or_default();
                ProjectCostSummary {
                    id: p.id,
                    name: p.name,
                    budget: p.budget,
                    status: p.status,
                    total_spent,
                }
            })
            .collect())
    }

    /// Delete a category only when no money has been booked against it.
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), AppError> {
        let category = queries_projects::get_category(&self.pool, category_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "project category",
                id: category_id,
            })?;

        let items = queries_projects::confirmed_items(&self.pool, category.project_id).await?;
        let labor = queries_projects::labor_total(&self.pool, category.project_id).await?;
        let sub = queries_projects::subcontractor_total(&self.pool, category.project_id).await?;
        let categories =
            queries_projects::list_categories(&self.pool, category.project_id).await?;

        let costs = aggregate_costs(&items, labor, sub, &categories);
        let spent = costs
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.spent.clone())
            .unwrap_or_default();

        ensure_category_deletable(&category.name, &spent)?;

        queries_projects::delete_category(&self.pool, category_id).await?;
        tracing::info!("Deleted empty category {}", category_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(kind: CategoryKind, allocated: i32) -> ProjectCategory {
        ProjectCategory {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: format!("{:?}", kind),
            kind,
            allocated_amount: BigDecimal::from(allocated),
            color: "#888888".to_string(),
            created_at: Utc::now(),
        }
    }

    fn item(
        raw_name: &str,
        quantity: i32,
        unit_price: &str,
        exchange_rate: &str,
        category_id: Option<Uuid>,
    ) -> ConfirmedItemRow {
        ConfirmedItemRow {
            raw_name: raw_name.to_string(),
            raw_unit: "buc".to_string(),
            quantity: BigDecimal::from(quantity),
            unit_price: unit_price.parse().unwrap(),
            exchange_rate: exchange_rate.parse().unwrap(),
            project_category_id: category_id,
        }
    }

    #[test]
    fn exchange_rate_applies_to_every_confirmed_line() {
        let materials = category(CategoryKind::Material, 1000);
        let items = vec![
            // 10 x 20 EUR at 4.97 = 994 RON
            item("Ciment", 10, "20", "4.97", Some(materials.id)),
            // 5 x 30 RON at 1.0 = 150 RON
            item("Adeziv", 5, "30", "1.0", Some(materials.id)),
        ];

        let costs = aggregate_costs(&items, BigDecimal::zero(), BigDecimal::zero(), &[materials]);
        assert_eq!(costs.materials_spent, BigDecimal::from(1144));
        assert_eq!(costs.total_spent, BigDecimal::from(1144));
        assert_eq!(costs.categories[0].spent, BigDecimal::from(1144));
    }

    #[test]
    fn labor_and_subcontractor_fold_into_matching_kinds() {
        let materials = category(CategoryKind::Material, 1000);
        let labor = category(CategoryKind::Labor, 500);
        let sub = category(CategoryKind::Subcontractor, 2000);
        let categories = vec![materials, labor.clone(), sub.clone()];

        let costs = aggregate_costs(
            &[],
            BigDecimal::from(250),
            BigDecimal::from(800),
            &categories,
        );

        let by_id = |id: Uuid| {
            costs
                .categories
                .iter()
                .find(|c| c.id == id)
                .unwrap()
                .spent
                .clone()
        };
        assert_eq!(by_id(labor.id), BigDecimal::from(250));
        assert_eq!(by_id(sub.id), BigDecimal::from(800));
        assert_eq!(costs.total_spent, BigDecimal::from(1050));
    }

    #[test]
    fn totals_survive_without_matching_category() {
        // No labor category: the spend still counts at project level.
        let costs = aggregate_costs(&[], BigDecimal::from(250), BigDecimal::zero(), &[]);
        assert_eq!(costs.labor_spent, BigDecimal::from(250));
        assert_eq!(costs.total_spent, BigDecimal::from(250));
    }

    #[test]
    fn zero_allocation_has_no_progress() {
        assert_eq!(
            progress_pct(&BigDecimal::from(50), &BigDecimal::zero()),
            None
        );
        assert_eq!(
            progress_pct(&BigDecimal::from(50), &BigDecimal::from(200)),
            Some(BigDecimal::from(25))
        );
    }

    #[test]
    fn usage_keeps_different_raw_names_separate() {
        let items = vec![
            item("Ciment Baumit 40kg", 2, "30", "1.0", None),
            item("ciment baumit sac", 3, "30", "1.0", None),
            item("Ciment Baumit 40kg", 1, "30", "1.0", None),
        ];

        let costs = aggregate_costs(&items, BigDecimal::zero(), BigDecimal::zero(), &[]);
        assert_eq!(costs.material_usage.len(), 2);
        let first = &costs.material_usage[0];
        assert_eq!(first.raw_name, "Ciment Baumit 40kg");
        assert_eq!(first.quantity, BigDecimal::from(3));
        assert_eq!(first.total_cost, BigDecimal::from(90));
    }

    #[test]
    fn category_with_spend_cannot_be_deleted() {
        let err = ensure_category_deletable("Materiale", &BigDecimal::from(120));
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(ensure_category_deletable("Materiale", &BigDecimal::zero()).is_ok());
    }

    #[test]
    fn usage_is_sorted_by_cost_descending() {
        let items = vec![
            item("Adeziv", 1, "10", "1.0", None),
            item("Ciment", 1, "500", "1.0", None),
        ];
        let costs = aggregate_costs(&items, BigDecimal::zero(), BigDecimal::zero(), &[]);
        assert_eq!(costs.material_usage[0].raw_name, "Ciment");
    }
}
