//! Engine configuration values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Settings for one binding engine.
///
/// Every field has a default, so an empty configuration source is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Attribute that holds a control's binding pointer.
    pub bind_attribute: String,

    /// Prefix of attribute-binding declarations (`bind-attr:disabled="/locked"`).
    pub attribute_binding_prefix: String,

    /// Per-validator time limit. `None` waits forever.
    pub validator_timeout_ms: Option<u64>,

    /// Yield one scheduler tick between a visit and its validation pass.
    pub defer_validation: bool,

    /// Capacity of the outward event channel.
    pub event_capacity: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            bind_attribute: "bind".to_string(),
            attribute_binding_prefix: "bind-attr:".to_string(),
            validator_timeout_ms: None,
            defer_validation: true,
            event_capacity: 64,
        }
    }
}

impl FormConfig {
    /// Validator timeout as a [`Duration`].
    pub fn validator_timeout(&self) -> Option<Duration> {
        self.validator_timeout_ms.map(Duration::from_millis)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bind_attribute.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "bind_attribute",
                "must not be empty",
            ));
        }
        if self.attribute_binding_prefix.is_empty() {
            return Err(ConfigError::invalid_value(
                "attribute_binding_prefix",
                "must not be empty",
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "event_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn with_bind_attribute(mut self, name: impl Into<String>) -> Self {
        self.bind_attribute = name.into();
        self
    }

    /// Timeouts beyond `u64::MAX` milliseconds saturate.
    pub fn with_validator_timeout(mut self, timeout: Duration) -> Self {
        self.validator_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_defer_validation(mut self, defer: bool) -> Self {
        self.defer_validation = defer;
        self
    }
}
