//! Stage activation and navigation.
//!
//! A stage is `Disabled`, `Passive` or `Enabled` depending on how many of
//! its viewports a matching pass can fill. Navigation never lands on a
//! disabled stage.

mod activation;
mod navigation;

pub use activation::{classify, needs_matching};
pub use navigation::{find_stage, next_available, Direction};
