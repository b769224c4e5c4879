//! Protocol storage and lookup.

use super::normalize::normalize;
use crate::error::{GeneratorError, HangingError, Result};
use crate::model::{DisplaySet, Protocol, ProtocolDefinition, Study, ViewportOptions};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Session data visible to a protocol generator.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub studies: &'a [Study],
    pub display_sets: &'a [DisplaySet],
    /// Id of the protocol currently applied, if any.
    pub active_protocol_id: Option<&'a str>,
}

impl<'a> GeneratorContext<'a> {
    /// A context with no session data.
    pub fn empty() -> Self {
        Self {
            studies: &[],
            display_sets: &[],
            active_protocol_id: None,
        }
    }
}

/// Builds a protocol definition from the current session.
pub type ProtocolGenerator = Arc<
    dyn Fn(&GeneratorContext<'_>) -> std::result::Result<ProtocolDefinition, GeneratorError>
        + Send
        + Sync,
>;

/// What the caller registers under a protocol id.
#[derive(Clone)]
pub enum ProtocolSource {
    /// A fixed definition, normalized once at registration.
    Static(ProtocolDefinition),
    /// A closure invoked on every lookup.
    Generator(ProtocolGenerator),
}

impl ProtocolSource {
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(&GeneratorContext<'_>) -> std::result::Result<ProtocolDefinition, GeneratorError>
            + Send
            + Sync
            + 'static,
    {
        Self::Generator(Arc::new(f))
    }
}

impl From<ProtocolDefinition> for ProtocolSource {
    fn from(definition: ProtocolDefinition) -> Self {
        Self::Static(definition)
    }
}

impl fmt::Debug for ProtocolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(def) => f.debug_tuple("Static").field(def).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// A stored registry entry.
#[derive(Clone)]
pub enum RegisteredProtocol {
    Static(Arc<Protocol>),
    Generator(ProtocolGenerator),
}

impl fmt::Debug for RegisteredProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(p) => f.debug_tuple("Static").field(&p.id).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Added,
    /// An entry with the same id existed and was overwritten.
    Replaced,
}

/// Registered protocols keyed by id, in registration order.
///
/// An optional active-id list restricts and orders enumeration.
pub struct ProtocolRegistry {
    entries: HashMap<String, RegisteredProtocol>,
    order: Vec<String>,
    active_ids: Option<Vec<String>>,
    default_viewport_options: ViewportOptions,
}

impl ProtocolRegistry {
    pub fn new(default_viewport_options: ViewportOptions) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            active_ids: None,
            default_viewport_options,
        }
    }

    /// Registers `source` under `id`.
    ///
    /// Static definitions are normalized now and rejected if malformed;
    /// generators are normalized on every lookup.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        source: impl Into<ProtocolSource>,
    ) -> Result<RegistrationOutcome> {
        let id = id.into();
        let entry = match source.into() {
            ProtocolSource::Static(definition) => {
                let protocol =
                    normalize(definition, &self.default_viewport_options).map_err(|err| {
                        warn!(protocol_id = %id, error = %err, "rejected protocol definition");
                        err
                    })?;
                RegisteredProtocol::Static(Arc::new(protocol))
            }
            ProtocolSource::Generator(generator) => RegisteredProtocol::Generator(generator),
        };

        if self.entries.insert(id.clone(), entry).is_some() {
            warn!(protocol_id = %id, "replaced an already registered protocol");
            Ok(RegistrationOutcome::Replaced)
        } else {
            debug!(protocol_id = %id, "registered protocol");
            self.order.push(id);
            Ok(RegistrationOutcome::Added)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProtocol> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every registered id, in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Resolves `id`, invoking and normalizing a generator if needed.
    ///
    /// # Errors
    ///
    /// `ProtocolNotFound`, `GeneratorFailed`, or `NormalizationFailure` for a
    /// malformed generated definition.
    pub fn try_resolve(&self, id: &str, context: &GeneratorContext<'_>) -> Result<Arc<Protocol>> {
        match self.entries.get(id) {
            None => Err(HangingError::ProtocolNotFound { id: id.to_string() }),
            Some(RegisteredProtocol::Static(protocol)) => Ok(Arc::clone(protocol)),
            Some(RegisteredProtocol::Generator(generator)) => {
                let definition =
                    generator(context).map_err(|source| HangingError::GeneratorFailed {
                        id: id.to_string(),
                        source,
                    })?;
                normalize(definition, &self.default_viewport_options).map(Arc::new)
            }
        }
    }

    /// Like [`try_resolve`](Self::try_resolve), but generator and
    /// normalization failures are logged and reported as `None`.
    pub fn resolve(&self, id: &str, context: &GeneratorContext<'_>) -> Option<Arc<Protocol>> {
        match self.try_resolve(id, context) {
            Ok(protocol) => Some(protocol),
            Err(HangingError::ProtocolNotFound { .. }) => None,
            Err(err) => {
                warn!(protocol_id = id, error = %err, "protocol unavailable");
                None
            }
        }
    }

    /// Restricts enumeration to `ids`, in that order. `None` or an empty
    /// list re-enables every registered protocol.
    pub fn set_active_protocols(&mut self, ids: Option<Vec<String>>) {
        self.active_ids = ids.filter(|ids| !ids.is_empty());
    }

    /// Appends `id` to the active list, creating it if none exists.
    pub fn add_active_protocol(&mut self, id: impl Into<String>) {
        self.active_ids.get_or_insert_with(Vec::new).push(id.into());
    }

    /// Ids enumeration walks: the active list if set, else every id.
    pub fn enumerated_ids(&self) -> Vec<String> {
        match &self.active_ids {
            Some(ids) => ids.clone(),
            None => self.order.clone(),
        }
    }

    /// Resolves every enumerated protocol, skipping unknown or failing ids.
    pub fn protocols(&self, context: &GeneratorContext<'_>) -> Vec<Arc<Protocol>> {
        self.enumerated_ids()
            .iter()
            .filter_map(|id| self.resolve(id, context))
            .collect()
    }

    /// Removes every entry and the active list.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.active_ids = None;
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new(ViewportOptions::default())
    }
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("order", &self.order)
            .field("active_ids", &self.active_ids)
            .finish_non_exhaustive()
    }
}
