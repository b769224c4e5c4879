//! Hanging-protocol matching and stage arbitration.
//!
//! Decides which display sets of a set of studies appear in which viewports
//! of a multi-viewport layout:
//!
//! - **Rules**: weighted, optionally required predicates over study and
//!   display-set attributes, including synthetic attributes such as
//!   `ModalitiesInStudy`.
//! - **Matching**: scores every display set against a selector and ranks the
//!   candidates (score, then study recency, then series number).
//! - **Registry**: protocols registered as static definitions or generators,
//!   normalized into canonical form before use.
//! - **Stages**: each stage of the applied protocol is classified as enabled,
//!   passive or disabled from how many viewports it can fill; navigation
//!   skips disabled stages.
//! - **Assignment**: viewport templates are resolved to display sets,
//!   honoring reuse ids that keep display sets in place across re-layouts.
//! - **Service**: [`service::HangingProtocolService`] runs the whole pipeline
//!   for a session and publishes [`events::HangingEvent`]s.
//!
//! # Architecture
//!
//! The crate is synchronous and single-threaded. Every module below
//! `service` is a pure function of its inputs; the service owns all session
//! state and replaces it atomically, so failed operations leave the session
//! as it was.

pub mod assignment;
pub mod error;
pub mod events;
pub mod matching;
pub mod model;
pub mod registry;
pub mod reuse;
pub mod rules;
pub mod service;
pub mod stage;

#[cfg(test)]
mod testing;

pub use error::{HangingError, Result};
