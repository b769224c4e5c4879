//! Request, option and view types of the service API.

use crate::assignment::{DisplaySetMatchMap, ViewportMatchMap};
use crate::model::{AttributeValue, DisplaySet, Protocol, Stage, Study};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Input of [`HangingProtocolService::run`](super::HangingProtocolService::run).
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Studies in the caller's recency order.
    pub studies: Vec<Study>,
    /// `None` takes the provider's active display sets.
    pub display_sets: Option<Vec<DisplaySet>>,
    /// Study protocol ranking runs against; defaults to the first study.
    pub active_study_instance_uid: Option<String>,
}

impl RunRequest {
    pub fn new(studies: Vec<Study>) -> Self {
        Self {
            studies,
            ..Self::default()
        }
    }

    pub fn with_display_sets(mut self, display_sets: Vec<DisplaySet>) -> Self {
        self.display_sets = Some(display_sets);
        self
    }

    pub fn with_active_study(mut self, study_instance_uid: impl Into<String>) -> Self {
        self.active_study_instance_uid = Some(study_instance_uid.into());
        self
    }
}

/// Options for applying a protocol or changing stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetProtocolOptions {
    /// Reuse id to display-set uid, typically harvested with
    /// [`collect_reuse_ids`](crate::reuse::collect_reuse_ids).
    pub reuse_id_map: BTreeMap<String, String>,
    /// Display sets already on screen; `display_set_index = -1` skips them.
    pub in_display: Option<Vec<String>>,
    pub stage_id: Option<String>,
    pub stage_index: Option<usize>,
}

impl SetProtocolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reuse_id(mut self, reuse_id: impl Into<String>, uid: impl Into<String>) -> Self {
        self.reuse_id_map.insert(reuse_id.into(), uid.into());
        self
    }

    pub fn with_reuse_id_map(mut self, map: BTreeMap<String, String>) -> Self {
        self.reuse_id_map = map;
        self
    }

    pub fn with_in_display(mut self, uids: Vec<String>) -> Self {
        self.in_display = Some(uids);
        self
    }

    pub fn with_stage_id(mut self, stage_id: impl Into<String>) -> Self {
        self.stage_id = Some(stage_id.into());
        self
    }

    pub fn with_stage_index(mut self, index: usize) -> Self {
        self.stage_index = Some(index);
        self
    }

    pub(crate) fn in_display_slice(&self) -> &[String] {
        self.in_display.as_deref().unwrap_or(&[])
    }
}

/// The protocol and stage currently applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveProtocol {
    pub protocol: Arc<Protocol>,
    pub stage_index: usize,
}

impl ActiveProtocol {
    pub fn stage(&self) -> Option<&Stage> {
        self.protocol.stage(self.stage_index)
    }
}

/// Borrowed view of the current match-detail maps.
#[derive(Debug, Clone, Copy)]
pub struct MatchDetailsView<'a> {
    pub viewport_match_details: &'a ViewportMatchMap,
    pub display_set_match_details: &'a DisplaySetMatchMap,
}

/// What an image-load strategy receives.
#[derive(Debug, Clone, Copy)]
pub struct ImageLoadRequest<'a> {
    pub data: &'a AttributeValue,
    pub display_set_match_details: &'a DisplaySetMatchMap,
    pub viewport_match_details: &'a ViewportMatchMap,
}

/// Custom image loading. Returns the payload to broadcast when it
/// rearranged the data, `None` to fall back to default loading.
pub type ImageLoadStrategy =
    Arc<dyn Fn(&ImageLoadRequest<'_>) -> Option<AttributeValue> + Send + Sync>;
