//! Error types for the hanging-protocol engine.

/// Error returned by a protocol generator closure.
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HangingError>;

/// Unified error type covering every failure mode of the engine.
///
/// Lookups absorb `GeneratorFailed` (the protocol is treated as unavailable
/// for that call). `ProtocolNotFound`, `ReuseTargetNotFound` and
/// `NoStageAvailable` abort before any state changes. Errors raised while
/// assigning viewports (`StageOutOfRange`, `UnsupportedUpdate`, ...) make the
/// service roll back to the protocol and stage it had before the call.
#[derive(Debug, thiserror::Error)]
pub enum HangingError {
    /// A protocol definition could not be normalized into canonical form.
    #[error("Protocol {id} rejected: {reason}")]
    NormalizationFailure {
        /// Id (or name) of the rejected protocol, `<unnamed>` if it has none.
        id: String,
        /// What is missing or malformed.
        reason: String,
    },

    /// No protocol is registered (or resolvable) under the requested id.
    #[error("Protocol {id} not found. Register it first with add_protocol().")]
    ProtocolNotFound {
        /// Requested protocol id.
        id: String,
    },

    /// A protocol generator returned an error.
    #[error("Protocol generator for {id} failed: {source}")]
    GeneratorFailed {
        /// Id the generator is registered under.
        id: String,
        /// The underlying error.
        #[source]
        source: GeneratorError,
    },

    /// A `reuse_id_map` entry points at a display set the provider does not know.
    #[error("Reuse id {reuse_id} targets unloaded display set {display_set_instance_uid}.")]
    ReuseTargetNotFound {
        /// The reuse key.
        reuse_id: String,
        /// The display set it maps to.
        display_set_instance_uid: String,
    },

    /// A display set referenced by the caller is unknown to the provider.
    #[error("Display set {display_set_instance_uid} not found.")]
    DisplaySetNotFound {
        /// The unknown display set.
        display_set_instance_uid: String,
    },

    /// Drag-and-drop replacement into a viewport showing several display sets.
    #[error("Viewport {viewport_index} shows {display_sets} display sets; update is unsupported.")]
    UnsupportedUpdate {
        /// Target viewport.
        viewport_index: usize,
        /// Number of display sets declared by its template.
        display_sets: usize,
    },

    /// A dropped display set does not satisfy the selector's required rules.
    #[error("Display set {display_set_instance_uid} fails required rules of {selector_id}.")]
    RequiredRuleViolation {
        /// The rejected display set.
        display_set_instance_uid: String,
        /// The selector whose required rules failed.
        selector_id: String,
    },

    /// A query named a protocol other than the active one.
    #[error("Currently applied protocol {active} is different from {requested}.")]
    ProtocolMismatch {
        /// The active protocol id (empty when none is active).
        active: String,
        /// The protocol id the caller passed.
        requested: String,
    },

    /// The operation needs an active protocol and none is set.
    #[error("No hanging protocol is active. Call run() or set_protocol() first.")]
    NoActiveProtocol,

    /// A stage index does not exist in the active protocol.
    #[error("Stage {stage_index} does not exist in protocol {protocol_id} ({stage_count} stages).")]
    StageOutOfRange {
        /// Protocol being applied.
        protocol_id: String,
        /// Requested stage.
        stage_index: usize,
        /// Number of stages the protocol has.
        stage_count: usize,
    },

    /// Stage navigation found no non-disabled stage in the requested direction.
    #[error("No enabled stage {direction} stage {from} in protocol {protocol_id}.")]
    NoStageAvailable {
        /// Active protocol.
        protocol_id: String,
        /// Stage navigation started from.
        from: usize,
        /// `"after"` or `"before"`.
        direction: &'static str,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {field} = {value}: {reason}")]
    InvalidConfig {
        /// Offending field.
        field: String,
        /// Its value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A protocol document could not be parsed.
    #[cfg(feature = "serde")]
    #[error("Protocol document could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl HangingError {
    /// Whether this is a "not found" condition, reported before any state changed.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HangingError::ProtocolNotFound { .. }
                | HangingError::ReuseTargetNotFound { .. }
                | HangingError::DisplaySetNotFound { .. }
        )
    }
}
