//! Protocol registry.
//!
//! Stores protocols under their ids, either as static definitions
//! (normalized once at registration) or as generator closures (invoked and
//! normalized on every lookup). Both paths go through [`normalize`].

mod normalize;
mod store;

pub use normalize::normalize;
pub use store::{
    GeneratorContext, ProtocolGenerator, ProtocolRegistry, ProtocolSource, RegisteredProtocol,
    RegistrationOutcome,
};
