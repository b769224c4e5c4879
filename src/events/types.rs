//! Notifications emitted by the hanging-protocol service.

use super::bus::Event;
use crate::assignment::{DisplaySetMatchMap, ViewportMatchMap};
use crate::model::{AttributeValue, LayoutRect, Protocol, Stage};
use std::sync::Arc;

/// A protocol (or stage) was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolChanged {
    pub protocol: Arc<Protocol>,
    pub stage_index: usize,
    pub stage: Stage,
    pub viewport_match_details: ViewportMatchMap,
    pub display_set_match_details: DisplaySetMatchMap,
}

/// The grid the layout consumer must build.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLayout {
    pub layout_type: String,
    pub num_rows: usize,
    pub num_cols: usize,
    pub layout_options: Vec<LayoutRect>,
}

/// Stage enablement was recomputed for a newly applied protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct StageActivation {
    pub protocol_id: String,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HangingEvent {
    ProtocolChanged(ProtocolChanged),
    NewLayout(NewLayout),
    StageActivation(StageActivation),
    /// An image-load strategy rearranged the data and returned this payload.
    CustomImageLoadPerformed(AttributeValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProtocolChanged,
    NewLayout,
    StageActivation,
    CustomImageLoadPerformed,
}

impl Event for HangingEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            HangingEvent::ProtocolChanged(_) => EventKind::ProtocolChanged,
            HangingEvent::NewLayout(_) => EventKind::NewLayout,
            HangingEvent::StageActivation(_) => EventKind::StageActivation,
            HangingEvent::CustomImageLoadPerformed(_) => EventKind::CustomImageLoadPerformed,
        }
    }
}
