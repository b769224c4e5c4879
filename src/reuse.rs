//! Reuse-id harvesting.
//!
//! Before switching protocol or stage, the host snapshots its viewport grid
//! and turns it into the `reuse_id_map` for
//! [`SetProtocolOptions`](crate::service::SetProtocolOptions): every
//! display-set entry whose template carries a `reuse_id` maps that id to the
//! display set currently shown, so the next layout keeps it in place.

use crate::assignment::ViewportMatchMap;
use crate::model::DisplaySetOptions;
use std::collections::BTreeMap;

/// Reuse key naming the first display set of the active viewport.
pub const ACTIVE_DISPLAY_SET: &str = "activeDisplaySet";

/// One viewport of the host's grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridViewport {
    /// Display sets shown, aligned with `display_set_options`. An empty uid
    /// marks an unfilled entry.
    pub display_set_instance_uids: Vec<String>,
    /// The template entries the viewport was filled from; empty for
    /// viewports the user filled by hand.
    pub display_set_options: Vec<DisplaySetOptions>,
}

/// The host's viewport grid at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSnapshot {
    pub viewports: Vec<GridViewport>,
    pub active_viewport_index: usize,
}

impl GridSnapshot {
    /// Builds a snapshot from the service's viewport match details.
    ///
    /// Gaps in the viewport indices become empty viewports.
    pub fn from_match_details(details: &ViewportMatchMap, active_viewport_index: usize) -> Self {
        let len = details.keys().next_back().map_or(0, |&last| last + 1);
        let mut viewports = vec![GridViewport::default(); len];
        for (&index, match_details) in details {
            let viewport = &mut viewports[index];
            for info in &match_details.display_sets_info {
                viewport
                    .display_set_instance_uids
                    .push(info.display_set_instance_uid.clone().unwrap_or_default());
                viewport.display_set_options.push(info.display_set_options.clone());
            }
        }
        Self {
            viewports,
            active_viewport_index,
        }
    }
}

/// Adds the reuse ids in `snapshot` to `reuse_id_map` and returns it.
///
/// Later viewports overwrite earlier ones sharing a reuse id. The active
/// viewport's first display set is recorded under [`ACTIVE_DISPLAY_SET`].
///
/// ```
/// use u_hanging::model::DisplaySetOptions;
/// use u_hanging::reuse::{collect_reuse_ids, GridSnapshot, GridViewport, ACTIVE_DISPLAY_SET};
/// use std::collections::BTreeMap;
///
/// let snapshot = GridSnapshot {
///     viewports: vec![GridViewport {
///         display_set_instance_uids: vec!["ds-1".into()],
///         display_set_options: vec![DisplaySetOptions {
///             reuse_id: Some("left".into()),
///             ..DisplaySetOptions::default()
///         }],
///     }],
///     active_viewport_index: 0,
/// };
/// let map = collect_reuse_ids(&snapshot, BTreeMap::new());
/// assert_eq!(map["left"], "ds-1");
/// assert_eq!(map[ACTIVE_DISPLAY_SET], "ds-1");
/// ```
pub fn collect_reuse_ids(
    snapshot: &GridSnapshot,
    mut reuse_id_map: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    for (index, viewport) in snapshot.viewports.iter().enumerate() {
        for (position, options) in viewport.display_set_options.iter().enumerate() {
            let Some(uid) = viewport
                .display_set_instance_uids
                .get(position)
                .filter(|uid| !uid.is_empty())
            else {
                continue;
            };
            if index == snapshot.active_viewport_index && position == 0 {
                reuse_id_map.insert(ACTIVE_DISPLAY_SET.to_string(), uid.clone());
            }
            if let Some(reuse_id) = options.reuse_id.as_ref().filter(|id| !id.is_empty()) {
                reuse_id_map.insert(reuse_id.clone(), uid.clone());
            }
        }
    }
    reuse_id_map
}
