//! Server-side experiment variant rotation.
//!
//! Variants of an experiment group are ordered by label (`A`, `B`, ...).
//! Each config fetch carries the id of the variant last served to that
//! browser; the group answers with the next variant in label order,
//! wrapping at the end. A browser that keeps coming back therefore walks
//! the full cycle, which splits traffic evenly without any server-side
//! per-visitor state.

use popreach_core::types::WidgetDefinition;
use std::collections::BTreeMap;

/// Collapses each experiment group down to the single variant this
/// browser should see, passing ungrouped definitions through untouched.
/// Original definition order is preserved.
pub fn select_variants(
    definitions: Vec<WidgetDefinition>,
    last_variant_id: Option<&str>,
) -> Vec<WidgetDefinition> {
    let mut groups: BTreeMap<String, Vec<&WidgetDefinition>> = BTreeMap::new();
    for def in &definitions {
        if let Some(group_id) = &def.experiment_group_id {
            groups.entry(group_id.clone()).or_default().push(def);
        }
    }

    let mut chosen: Vec<String> = Vec::new();
    for variants in groups.values_mut() {
        variants.sort_by(|a, b| {
            a.ordering_label()
                .cmp(b.ordering_label())
                .then_with(|| a.id.cmp(&b.id))
        });
        chosen.push(next_in_cycle(variants, last_variant_id));
    }

    definitions
        .into_iter()
        .filter(|def| {
            def.experiment_group_id.is_none() || chosen.iter().any(|id| *id == def.id)
        })
        .collect()
}

/// The variant after `last_variant_id` in label order, wrapping; the
/// first variant when the hint is absent or not part of this group.
fn next_in_cycle(variants: &[&WidgetDefinition], last_variant_id: Option<&str>) -> String {
    let position = last_variant_id.and_then(|last| variants.iter().position(|v| v.id == last));
    let index = match position {
        Some(i) => (i + 1) % variants.len(),
        None => 0,
    };
    variants[index].id.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use popreach_core::types::{TargetingSettings, WidgetChrome, WidgetKind};
    use proptest::prelude::*;

    fn variant(id: &str, group: Option<&str>, label: Option<&str>) -> WidgetDefinition {
        WidgetDefinition {
            id: id.into(),
            site_id: "site-1".into(),
            kind: WidgetKind::Popup,
            experiment_group_id: group.map(String::from),
            variant_label: label.map(String::from),
            chrome: WidgetChrome::default(),
            targeting: TargetingSettings::default(),
            pages: vec![],
            thank_you_page_index: None,
            is_active: true,
        }
    }

    #[test]
    fn test_first_fetch_serves_the_first_label() {
        let defs = vec![
            variant("w-b", Some("exp-1"), Some("B")),
            variant("w-a", Some("exp-1"), Some("A")),
        ];
        let selected = select_variants(defs, None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "w-a");
    }

    #[test]
    fn test_hint_advances_to_the_next_label_and_wraps() {
        let defs = vec![
            variant("w-a", Some("exp-1"), Some("A")),
            variant("w-b", Some("exp-1"), Some("B")),
            variant("w-c", Some("exp-1"), Some("C")),
        ];
        let selected = select_variants(defs.clone(), Some("w-a"));
        assert_eq!(selected[0].id, "w-b");
        let selected = select_variants(defs.clone(), Some("w-c"));
        assert_eq!(selected[0].id, "w-a");
    }

    #[test]
    fn test_unknown_hint_falls_back_to_the_first_label() {
        let defs = vec![
            variant("w-a", Some("exp-1"), Some("A")),
            variant("w-b", Some("exp-1"), Some("B")),
        ];
        let selected = select_variants(defs, Some("gone"));
        assert_eq!(selected[0].id, "w-a");
    }

    #[test]
    fn test_ungrouped_definitions_pass_through() {
        let defs = vec![
            variant("w-solo", None, None),
            variant("w-a", Some("exp-1"), Some("A")),
            variant("w-b", Some("exp-1"), Some("B")),
        ];
        let selected = select_variants(defs, None);
        let ids: Vec<&str> = selected.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["w-solo", "w-a"]);
    }

    #[test]
    fn test_unlabeled_variant_orders_as_a() {
        let defs = vec![
            variant("w-1", Some("exp-1"), None),
            variant("w-2", Some("exp-1"), Some("B")),
        ];
        let selected = select_variants(defs, None);
        assert_eq!(selected[0].id, "w-1");
    }

    proptest! {
        /// Feeding each response back as the next hint walks the full
        /// group before repeating any variant.
        #[test]
        fn round_robin_cycles_through_every_variant(size in 1usize..6) {
            let defs: Vec<WidgetDefinition> = (0..size)
                .map(|i| {
                    let label = char::from(b'A' + i as u8).to_string();
                    variant(&format!("w-{label}"), Some("exp-1"), Some(&label))
                })
                .collect();

            let mut last: Option<String> = None;
            let mut seen = Vec::new();
            for _ in 0..size {
                let selected = select_variants(defs.clone(), last.as_deref());
                prop_assert_eq!(selected.len(), 1);
                let id = selected[0].id.clone();
                prop_assert!(!seen.contains(&id), "repeated {} before full cycle", id);
                seen.push(id.clone());
                last = Some(id);
            }

            // The next fetch starts the cycle over.
            let selected = select_variants(defs, last.as_deref());
            prop_assert_eq!(selected[0].id.clone(), seen[0].clone());
        }
    }
}
