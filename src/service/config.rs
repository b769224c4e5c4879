//! Service configuration.
//!
//! [`ServiceConfig`] holds the defaults the hanging-protocol service falls
//! back to when protocols or callers leave something unspecified.

use crate::error::{HangingError, Result};
use crate::model::ViewportOptions;

/// Configuration for [`HangingProtocolService`](super::HangingProtocolService).
///
/// # Defaults
///
/// ```
/// use u_hanging::service::ServiceConfig;
///
/// let config = ServiceConfig::default();
/// assert_eq!(config.default_protocol_id, "default");
/// assert!(config.require_reuse_targets);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_hanging::service::ServiceConfig;
///
/// let config = ServiceConfig::default()
///     .with_default_protocol_id("mr-brain")
///     .with_score_epsilon(1e-6)
///     .with_require_reuse_targets(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ServiceConfig {
    /// Protocol applied by `run` when no protocol's rules match the active
    /// study.
    pub default_protocol_id: String,

    /// Options given to viewports that a protocol declares without any.
    pub default_viewport_options: ViewportOptions,

    /// Scores closer than this compare equal when ranking candidates.
    pub score_epsilon: f64,

    /// Whether `set_protocol` checks that every reuse-map target is known
    /// to the display-set provider.
    pub require_reuse_targets: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_protocol_id: "default".to_string(),
            default_viewport_options: ViewportOptions::default(),
            score_epsilon: 1e-9,
            require_reuse_targets: true,
        }
    }
}

impl ServiceConfig {
    pub fn with_default_protocol_id(mut self, id: impl Into<String>) -> Self {
        self.default_protocol_id = id.into();
        self
    }

    pub fn with_default_viewport_options(mut self, options: ViewportOptions) -> Self {
        self.default_viewport_options = options;
        self
    }

    /// Sets the score comparison epsilon.
    pub fn with_score_epsilon(mut self, eps: f64) -> Self {
        self.score_epsilon = eps;
        self
    }

    pub fn with_require_reuse_targets(mut self, require: bool) -> Self {
        self.require_reuse_targets = require;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.default_protocol_id.is_empty() {
            return Err(invalid("default_protocol_id", "\"\"", "must not be empty"));
        }
        if !self.score_epsilon.is_finite() || self.score_epsilon < 0.0 {
            return Err(invalid(
                "score_epsilon",
                &self.score_epsilon.to_string(),
                "must be a finite, non-negative number",
            ));
        }
        if self.default_viewport_options.viewport_type.is_empty() {
            return Err(invalid(
                "default_viewport_options.viewport_type",
                "\"\"",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> HangingError {
    HangingError::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
