//! Viewport-to-display-set resolution.

use super::types::{DisplaySetInfo, DisplaySetMatchMap, StageMatch, ViewportMatchDetails};
use crate::matching::{DisplaySetMatchDetails, MatchCandidate, MatchingEngine};
use crate::model::{DisplaySetOptions, DisplaySetSelector, Viewport};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Picks the candidate at `offset` in a selector's ranked list.
///
/// `offset >= 0` indexes the list directly; `-1` takes the first candidate
/// not in `in_display`. Anything below `-1` resolves nothing.
pub fn find_deduplicated<'d>(
    details: Option<&'d DisplaySetMatchDetails>,
    offset: i32,
    in_display: &[String],
) -> Option<&'d MatchCandidate> {
    let details = details?;
    match offset {
        n if n >= 0 => usize::try_from(n).ok().and_then(|n| details.candidate(n)),
        -1 => details
            .matching_scores
            .iter()
            .find(|c| !in_display.contains(&c.display_set_instance_uid)),
        n => {
            warn!(offset = n, "unsupported display set index");
            None
        }
    }
}

/// Resolves viewport templates for one pass.
///
/// A resolver accumulates every uid it hands out into its `in_display`
/// list, so `display_set_index = -1` skips anything already placed earlier
/// in the pass.
pub struct ViewportResolver<'a> {
    engine: &'a MatchingEngine<'a>,
    selectors: &'a BTreeMap<String, DisplaySetSelector>,
    reuse_id_map: &'a BTreeMap<String, String>,
    in_display: Vec<String>,
}

impl<'a> ViewportResolver<'a> {
    pub fn new(
        engine: &'a MatchingEngine<'a>,
        selectors: &'a BTreeMap<String, DisplaySetSelector>,
        reuse_id_map: &'a BTreeMap<String, String>,
        in_display: &[String],
    ) -> Self {
        Self {
            engine,
            selectors,
            reuse_id_map,
            in_display: in_display.to_vec(),
        }
    }

    /// Uids placed so far, seeded with the caller's list.
    pub fn in_display(&self) -> &[String] {
        &self.in_display
    }

    fn ensure_matched(&self, entry: &DisplaySetOptions, matches: &mut DisplaySetMatchMap) {
        if matches.contains_key(&entry.id) {
            return;
        }
        let Some(selector) = self.selectors.get(&entry.id) else {
            warn!(selector = %entry.id, "no display set selector for viewport entry");
            return;
        };
        if let Some(details) = self.engine.match_images(&entry.id, selector) {
            matches.insert(entry.id.clone(), details);
        }
    }

    fn resolve_entry(
        &self,
        entry: &DisplaySetOptions,
        matches: &DisplaySetMatchMap,
    ) -> Option<String> {
        if let Some(uid) = entry.reuse_id.as_ref().and_then(|key| self.reuse_id_map.get(key)) {
            return Some(uid.clone());
        }
        let found = find_deduplicated(
            matches.get(&entry.id),
            entry.display_set_index,
            &self.in_display,
        );
        if found.is_none() {
            warn!(
                selector = %entry.id,
                display_set_index = entry.display_set_index,
                "viewport requests a display set that no candidate matches"
            );
        }
        found.map(|c| c.display_set_instance_uid.clone())
    }

    /// Resolves one viewport template, matching its selectors into `matches`.
    pub fn match_viewport(
        &mut self,
        viewport: &Viewport,
        matches: &mut DisplaySetMatchMap,
    ) -> ViewportMatchDetails {
        for entry in &viewport.display_sets {
            self.ensure_matched(entry, matches);
        }

        let display_sets_info: Vec<DisplaySetInfo> = viewport
            .display_sets
            .iter()
            .map(|entry| DisplaySetInfo {
                display_set_instance_uid: self.resolve_entry(entry, matches),
                display_set_options: entry.clone(),
            })
            .collect();

        self.in_display.extend(
            display_sets_info
                .iter()
                .filter_map(|info| info.display_set_instance_uid.clone()),
        );

        ViewportMatchDetails {
            viewport_options: viewport.viewport_options.clone(),
            display_sets_info,
        }
    }

    /// Resolves every viewport of a stage, in declaration order.
    pub fn match_all(&mut self, viewports: &[Viewport]) -> StageMatch {
        let mut result = StageMatch::default();
        let mut counted: BTreeSet<String> = BTreeSet::new();

        for (index, viewport) in viewports.iter().enumerate() {
            let details = self.match_viewport(viewport, &mut result.display_set_match_details);
            if let Some(uid) = details.primary_uid() {
                if counted.insert(uid.to_string()) {
                    result.matched_viewports += 1;
                }
            }
            result.viewport_match_details.insert(index, details);
        }

        debug!(
            viewports = viewports.len(),
            matched = result.matched_viewports,
            "assigned viewports"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewportOptions;
    use crate::rules::AttributeTable;
    use crate::testing::{ct_selector, scenario_data};

    fn viewport(entries: &[(&str, i32, Option<&str>)]) -> Viewport {
        Viewport {
            viewport_options: ViewportOptions::default(),
            display_sets: entries
                .iter()
                .map(|(id, index, reuse)| DisplaySetOptions {
                    id: id.to_string(),
                    display_set_index: *index,
                    reuse_id: reuse.map(str::to_string),
                    options: Default::default(),
                })
                .collect(),
            display_sets_by_position: None,
        }
    }

    fn selectors() -> BTreeMap<String, DisplaySetSelector> {
        BTreeMap::from([("main".to_string(), ct_selector())])
    }

    #[test]
    fn test_same_candidate_counts_once() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selectors = selectors();
        let reuse = BTreeMap::new();
        let mut resolver = ViewportResolver::new(&engine, &selectors, &reuse, &[]);
        let result = resolver.match_all(&[
            viewport(&[("main", 0, None)]),
            viewport(&[("main", 0, None)]),
        ]);
        assert_eq!(result.matched_viewports, 1);
        assert_eq!(result.viewport_match_details.len(), 2);
        assert_eq!(
            result.viewport_match_details[&0].primary_uid(),
            result.viewport_match_details[&1].primary_uid()
        );
    }

    #[test]
    fn test_second_offset_counts_twice() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selectors = selectors();
        let reuse = BTreeMap::new();
        let mut resolver = ViewportResolver::new(&engine, &selectors, &reuse, &[]);
        let result = resolver.match_all(&[
            viewport(&[("main", 0, None)]),
            viewport(&[("main", 1, None)]),
        ]);
        assert_eq!(result.matched_viewports, 2);
    }

    #[test]
    fn test_reuse_map_takes_precedence() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selectors = selectors();
        let reuse = BTreeMap::from([("left".to_string(), "anything".to_string())]);
        let mut resolver = ViewportResolver::new(&engine, &selectors, &reuse, &[]);
        let mut matches = DisplaySetMatchMap::new();
        let details =
            resolver.match_viewport(&viewport(&[("main", 0, Some("left"))]), &mut matches);
        assert_eq!(details.primary_uid(), Some("anything"));
        assert!(matches.contains_key("main"));
    }

    #[test]
    fn test_minus_one_skips_in_display() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selectors = selectors();
        let reuse = BTreeMap::new();
        let best = engine.match_images("main", &ct_selector()).unwrap();
        let shown = vec![best.display_set_instance_uid.clone()];
        let mut resolver = ViewportResolver::new(&engine, &selectors, &reuse, &shown);
        let mut matches = DisplaySetMatchMap::new();
        let details = resolver.match_viewport(&viewport(&[("main", -1, None)]), &mut matches);
        assert_eq!(
            details.primary_uid(),
            Some(best.matching_scores[1].display_set_instance_uid.as_str())
        );
        let details = resolver.match_viewport(&viewport(&[("main", -1, None)]), &mut matches);
        assert_eq!(details.primary_uid(), None);
        assert_eq!(resolver.in_display().len(), 2);
    }

    #[test]
    fn test_unresolved_entries_kept() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let selectors = selectors();
        let reuse = BTreeMap::new();
        let mut resolver = ViewportResolver::new(&engine, &selectors, &reuse, &[]);
        let result = resolver.match_all(&[viewport(&[("main", 7, None), ("unknown", 0, None)])]);
        assert_eq!(result.matched_viewports, 0);
        let info = &result.viewport_match_details[&0].display_sets_info;
        assert_eq!(info.len(), 2);
        assert!(info.iter().all(|i| i.display_set_instance_uid.is_none()));
        assert!(!result.display_set_match_details.contains_key("unknown"));
    }

    #[test]
    fn test_find_deduplicated_offsets() {
        let (studies, sets) = scenario_data();
        let table = AttributeTable::with_builtins();
        let engine = MatchingEngine::new(&studies, &sets, &table);
        let details = engine.match_images("main", &ct_selector());
        let d = details.as_ref();
        assert_eq!(
            find_deduplicated(d, 0, &[]).map(|c| c.series_number),
            Some(Some(2))
        );
        assert_eq!(
            find_deduplicated(d, 1, &[]).map(|c| c.series_number),
            Some(Some(5))
        );
        assert!(find_deduplicated(d, 2, &[]).is_none());
        assert!(find_deduplicated(d, -2, &[]).is_none());
        assert!(find_deduplicated(None, 0, &[]).is_none());
    }
}
