//! Notifications.
//!
//! The service publishes [`HangingEvent`]s through an [`EventBus`] once all
//! session state for an operation has been committed. Listeners receive the
//! event together with a shared reference to the service, so they can query
//! it but not mutate it during delivery.

mod bus;
mod types;

pub use bus::{Event, EventBus, Subscription};
pub use types::{EventKind, HangingEvent, NewLayout, ProtocolChanged, StageActivation};
