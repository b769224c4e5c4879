//! Viewport assignment and reuse resolution.
//!
//! Maps the viewport templates of a stage to concrete display sets:
//!
//! - **Reuse**: an entry whose `reuse_id` is in the caller's reuse map keeps
//!   that display set
//! - **Offsets**: otherwise the entry takes the selector's candidate at its
//!   `display_set_index` (`-1` = first candidate not yet shown)
//! - **Updates**: drag-and-drop planning for viewports sharing a selector

mod resolver;
mod types;
mod update;

pub use resolver::{find_deduplicated, ViewportResolver};
pub use types::{
    DisplaySetInfo, DisplaySetMatchMap, StageMatch, ViewportMatchDetails, ViewportMatchMap,
    ViewportUpdate,
};
pub use update::plan_viewport_update;
