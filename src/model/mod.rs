//! Data model: protocols, stages, viewport templates, studies and display sets.
//!
//! # Key Types
//!
//! - [`ProtocolDefinition`]: a protocol as authored, with optional fields
//! - [`Protocol`]: the normalized form every other module works with
//! - [`DisplaySet`] / [`Study`]: candidate data supplied by the caller
//! - [`AttributeValue`]: dynamically-typed metadata value

mod data;
mod definition;
mod protocol;
mod value;

pub use data::{DisplaySet, SeriesSummary, Study};
pub use definition::{
    DisplaySetOptionsDefinition, ProtocolDefinition, StageDefinition, ViewportDefinition,
};
pub use protocol::{
    Constraint, CustomPredicate, DisplaySetOptions, DisplaySetSelector, InitialImageOptions,
    LayoutProperties, LayoutRect, MatchingRule, PredicateFn, Protocol, RegexPattern, Stage,
    StageEnable, SyncGroup, Viewport, ViewportOptions, ViewportStructure,
};
pub use value::{AttributeValue, Options};
