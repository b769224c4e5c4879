//! Protocol orchestration.
//!
//! [`HangingProtocolService`] ties the registry, the matching engine, stage
//! activation and viewport assignment together into one session:
//!
//! 1. [`run`](HangingProtocolService::run) loads the studies and picks a
//!    protocol, either the one named or the best match for the active study.
//! 2. [`set_protocol`](HangingProtocolService::set_protocol) and the stage
//!    navigation methods re-run assignment and publish [`HangingEvent`]s.
//! 3. Queries expose the active protocol, the match details, and the
//!    viewports to fill or reload as the user changes the layout.
//!
//! Display sets come from a [`DisplaySetProvider`] owned by the service.
//!
//! [`HangingEvent`]: crate::events::HangingEvent

mod config;
mod orchestrator;
mod provider;
mod types;

pub use config::ServiceConfig;
pub use orchestrator::HangingProtocolService;
pub use provider::{DisplaySetProvider, InMemoryDisplaySets};
pub use types::{
    ActiveProtocol, ImageLoadRequest, ImageLoadStrategy, MatchDetailsView, RunRequest,
    SetProtocolOptions,
};
