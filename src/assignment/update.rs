//! Drag-and-drop update planning.

use super::types::{DisplaySetMatchMap, ViewportMatchMap, ViewportUpdate};
use crate::error::{HangingError, Result};
use crate::model::{DisplaySetSelector, Stage};
use std::collections::BTreeMap;

/// Plans the viewport reloads needed to show `new_uid` in `viewport_index`.
///
/// Viewports without protocol constraints (no template, no declared display
/// sets, `allow_unmatched_view`, unknown selector, or no current match for
/// the selector) change alone. Otherwise `validate` checks the new display
/// set against the selector, and every viewport of the stage that uses the
/// same selector is returned with `new_uid` substituted for it.
///
/// # Errors
///
/// `UnsupportedUpdate` when the target template declares several display
/// sets; whatever `validate` returns.
pub fn plan_viewport_update<F>(
    stage: &Stage,
    selectors: &BTreeMap<String, DisplaySetSelector>,
    viewport_matches: &ViewportMatchMap,
    display_set_matches: &DisplaySetMatchMap,
    viewport_index: usize,
    new_uid: &str,
    validate: F,
) -> Result<Vec<ViewportUpdate>>
where
    F: FnOnce(&str, &DisplaySetSelector) -> Result<()>,
{
    let single = || Ok(vec![ViewportUpdate::single(viewport_index, new_uid)]);

    let Some(target) = stage.viewports.get(viewport_index) else {
        return single();
    };
    if target.display_sets.len() > 1 {
        return Err(HangingError::UnsupportedUpdate {
            viewport_index,
            display_sets: target.display_sets.len(),
        });
    }
    let Some(entry) = target.display_sets.first() else {
        return single();
    };
    if target.viewport_options.allow_unmatched_view {
        return single();
    }
    let selector_id = entry.id.as_str();
    let Some(selector) = selectors.get(selector_id) else {
        return single();
    };

    validate(selector_id, selector)?;

    if !display_set_matches.contains_key(selector_id) {
        return single();
    }

    let updates = stage
        .viewports
        .iter()
        .enumerate()
        .filter(|(_, vp)| vp.display_sets.iter().any(|ds| ds.id == selector_id))
        .map(|(index, vp)| {
            let current = viewport_matches.get(&index);
            let mut uids = Vec::new();
            let mut options = Vec::new();
            for (position, ds) in vp.display_sets.iter().enumerate() {
                let uid = if ds.id == selector_id {
                    Some(new_uid.to_string())
                } else {
                    current
                        .and_then(|m| m.display_sets_info.get(position))
                        .and_then(|info| info.display_set_instance_uid.clone())
                        .or_else(|| {
                            display_set_matches
                                .get(&ds.id)
                                .map(|d| d.display_set_instance_uid.clone())
                        })
                };
                if let Some(uid) = uid {
                    uids.push(uid);
                    options.push(ds.options.clone());
                }
            }
            ViewportUpdate {
                viewport_index: index,
                display_set_instance_uids: uids,
                viewport_options: Some(vp.viewport_options.clone()),
                display_set_options: options,
            }
        })
        .collect();

    Ok(updates)
}
