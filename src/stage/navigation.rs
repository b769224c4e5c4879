//! Stage selection and navigation.

use crate::model::{Stage, StageEnable};

/// Direction of a stage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    /// `"after"` / `"before"`, as used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Next => "after",
            Direction::Previous => "before",
        }
    }
}

/// Picks the stage to show after (re)applying a protocol.
///
/// 1. `stage_id`: the first non-disabled stage with that id, else `0`.
/// 2. `stage_index`: that index unless the stage is disabled. An index past
///    the end is returned as-is; applying it fails with `StageOutOfRange`.
/// 3. The first `Enabled` stage, else the first non-disabled one, else `0`.
pub fn find_stage(stages: &[Stage], stage_id: Option<&str>, stage_index: Option<usize>) -> usize {
    if let Some(stage_id) = stage_id {
        return stages
            .iter()
            .position(|s| s.id == stage_id && !s.is_disabled())
            .unwrap_or(0);
    }

    if let Some(index) = stage_index {
        if stages.get(index).map_or(true, |s| !s.is_disabled()) {
            return index;
        }
    }

    stages
        .iter()
        .position(|s| s.enable == Some(StageEnable::Enabled))
        .or_else(|| stages.iter().position(|s| !s.is_disabled()))
        .unwrap_or(0)
}

/// The nearest non-disabled stage strictly after/before `from`.
pub fn next_available(stages: &[Stage], from: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Next => (from.saturating_add(1)..stages.len())
            .find(|&i| !stages[i].is_disabled()),
        Direction::Previous => (0..from.min(stages.len()))
            .rev()
            .find(|&i| !stages[i].is_disabled()),
    }
}
