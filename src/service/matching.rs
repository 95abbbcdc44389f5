//! Catalog name resolution, shared by reconciliation and quote pricing.
//! Strategy chain: exact alias -> bidirectional substring -> external AI.

use std::collections::HashMap;

use uuid::Uuid;

use crate::ai::{retry_ai, AiGateway, CatalogEntry, MatchCandidate};
use crate::error::AppError;
use crate::models::Material;

/// Case-insensitive bidirectional containment test.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Default suggestion for a raw invoice name: first substring hit in
/// catalog (alphabetical) order. A heuristic the user can always override.
pub fn suggest_material(raw_name: &str, catalog: &[Material]) -> Option<Uuid> {
    catalog
        .iter()
        .find(|m| names_match(raw_name, &m.name))
        .map(|m| m.id)
}

/// Split candidates into alias hits (zero cost, never sent to the AI) and
/// the leftover that needs the external matcher.
pub fn split_by_alias(
    items: Vec<MatchCandidate>,
    aliases: &HashMap<String, Uuid>,
) -> (HashMap<Uuid, Uuid>, Vec<MatchCandidate>) {
    let mut matched = HashMap::new();
    let mut leftover = Vec::new();

    for item in items {
        match aliases.get(&item.raw_name) {
            Some(material_id) => {
                matched.insert(item.id, *material_id);
            }
            None => leftover.push(item),
        }
    }

    (matched, leftover)
}

/// Resolve candidates against alias memory first, then the external
/// matcher for whatever is left. The matcher's associations are taken
/// as-is (it enforces its own confidence threshold); the merged result is
/// a suggestion set, nothing is auto-confirmed.
pub async fn resolve_matches(
    ai: &dyn AiGateway,
    items: Vec<MatchCandidate>,
    aliases: &HashMap<String, Uuid>,
    catalog: &[CatalogEntry],
    max_retries: u32,
    retry_base_ms: u64,
) -> Result<HashMap<Uuid, Uuid>, AppError> {
    let (mut matched, leftover) = split_by_alias(items, aliases);

    // Every name was remembered, or there is nothing to match against.
    if leftover.is_empty() || catalog.is_empty() {
        return Ok(matched);
    }

    if !ai.is_configured() {
        return Err(AppError::Validation(
            "AI API key is not configured".to_string(),
        ));
    }

    tracing::info!(
        "AI matching: {} alias hits, {} items sent to matcher",
        matched.len(),
        leftover.len()
    );

    let ai_matches = retry_ai(max_retries, retry_base_ms, || {
        ai.match_items(&leftover, catalog)
    })
    .await?;

    // Key sets are disjoint: only alias misses were sent out.
    matched.extend(ai_matches);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::RecordingGateway;
    use std::sync::atomic::Ordering;

    fn material(name: &str) -> Material {
        Material {
            id: Uuid::new_v4(),
            name: name.to_string(),
            unit: "buc".to_string(),
            brand: None,
        }
    }

    fn candidate(raw_name: &str) -> MatchCandidate {
        MatchCandidate {
            id: Uuid::new_v4(),
            raw_name: raw_name.to_string(),
            raw_unit: "buc".to_string(),
        }
    }

    #[test]
    fn names_match_is_bidirectional_and_case_insensitive() {
        assert!(names_match("Ciment Baumit 40kg", "ciment"));
        assert!(names_match("ciment", "Ciment Baumit 40kg"));
        assert!(!names_match("ciment", "adeziv gresie"));
    }

    #[test]
    fn suggestion_takes_first_catalog_hit() {
        let catalog = vec![
            material("Adeziv gresie"),
            material("Ciment"),
            material("Ciment alb"),
        ];
        let suggested = suggest_material("Ciment Baumit 40kg", &catalog);
        assert_eq!(suggested, Some(catalog[1].id));
    }

    #[test]
    fn no_suggestion_without_overlap() {
        let catalog = vec![material("Adeziv gresie")];
        assert_eq!(suggest_material("Teava PVC", &catalog), None);
    }

    #[tokio::test]
    async fn alias_hits_never_reach_the_matcher() {
        let ai = RecordingGateway::default();
        let item = candidate("Ciment Baumit 40kg");
        let material_id = Uuid::new_v4();
        let aliases = HashMap::from([("Ciment Baumit 40kg".to_string(), material_id)]);
        let catalog = vec![CatalogEntry {
            id: material_id,
            name: "Ciment".to_string(),
            unit: "sac".to_string(),
        }];

        let item_id = item.id;
        let matches = resolve_matches(&ai, vec![item], &aliases, &catalog, 3, 1)
            .await
            .unwrap();

        assert_eq!(matches.get(&item_id), Some(&material_id));
        assert_eq!(ai.match_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_catalog_skips_the_matcher() {
        let ai = RecordingGateway::default();
        let matches = resolve_matches(&ai, vec![candidate("Teava PVC")], &HashMap::new(), &[], 3, 1)
            .await
            .unwrap();

        assert!(matches.is_empty());
        assert_eq!(ai.match_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn leftover_items_are_sent_to_the_matcher() {
        let ai = RecordingGateway::default();
        let known = candidate("Ciment Baumit 40kg");
        let unknown = candidate("Teava PVC 110");
        let known_material = Uuid::new_v4();
        let pvc_material = Uuid::new_v4();

        ai.match_result
            .lock()
            .unwrap()
            .insert(unknown.id, pvc_material);
        let aliases = HashMap::from([(known.raw_name.clone(), known_material)]);
        let catalog = vec![CatalogEntry {
            id: pvc_material,
            name: "Teava PVC".to_string(),
            unit: "m".to_string(),
        }];

        let (known_id, unknown_id) = (known.id, unknown.id);
        let matches = resolve_matches(&ai, vec![known, unknown], &aliases, &catalog, 3, 1)
            .await
            .unwrap();

        assert_eq!(matches.get(&known_id), Some(&known_material));
        assert_eq!(matches.get(&unknown_id), Some(&pvc_material));
        assert_eq!(ai.match_calls.load(Ordering::SeqCst), 1);
    }
}
