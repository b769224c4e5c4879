//! Viewport assignment results.

use crate::matching::DisplaySetMatchDetails;
use crate::model::{DisplaySetOptions, Options, ViewportOptions};
use std::collections::BTreeMap;

/// One display-set entry of a viewport and what it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySetInfo {
    /// `None` when no candidate existed at the requested offset.
    pub display_set_instance_uid: Option<String>,
    /// The template entry this came from.
    pub display_set_options: DisplaySetOptions,
}

/// Resolved contents of one viewport slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportMatchDetails {
    pub viewport_options: ViewportOptions,
    /// One entry per template display set, in template order.
    pub display_sets_info: Vec<DisplaySetInfo>,
}

impl ViewportMatchDetails {
    /// Resolved instance uids, skipping unresolved entries.
    pub fn display_set_instance_uids(&self) -> Vec<&str> {
        self.display_sets_info
            .iter()
            .filter_map(|info| info.display_set_instance_uid.as_deref())
            .collect()
    }

    /// The uid the first entry resolved to.
    pub fn primary_uid(&self) -> Option<&str> {
        self.display_sets_info
            .first()
            .and_then(|info| info.display_set_instance_uid.as_deref())
    }
}

/// Viewport match details keyed by viewport index.
pub type ViewportMatchMap = BTreeMap<usize, ViewportMatchDetails>;

/// Display-set match details keyed by selector id.
pub type DisplaySetMatchMap = BTreeMap<String, DisplaySetMatchDetails>;

/// Result of one assignment pass over a stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageMatch {
    /// Viewports whose first entry resolved to a display set not already
    /// counted for an earlier viewport of the pass.
    pub matched_viewports: usize,
    pub viewport_match_details: ViewportMatchMap,
    pub display_set_match_details: DisplaySetMatchMap,
}

/// A viewport the caller must reload after a drag-and-drop.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportUpdate {
    pub viewport_index: usize,
    pub display_set_instance_uids: Vec<String>,
    /// Template options; `None` when the viewport has no template.
    pub viewport_options: Option<ViewportOptions>,
    /// Per-display-set options, aligned with `display_set_instance_uids`.
    pub display_set_options: Vec<Options>,
}

impl ViewportUpdate {
    /// Only `viewport_index` changes, to `uid`.
    pub fn single(viewport_index: usize, uid: impl Into<String>) -> Self {
        Self {
            viewport_index,
            display_set_instance_uids: vec![uid.into()],
            viewport_options: None,
            display_set_options: Vec::new(),
        }
    }
}
