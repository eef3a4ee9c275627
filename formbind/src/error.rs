//! Error types for the binding engine

use std::time::Duration;

use formbind_config::ConfigError;
use thiserror::Error;

/// Result type for formbind operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors surfaced to callers of the engine's setup APIs.
///
/// Nothing in the data/validation path returns these: unbindable controls are
/// ignored and validator failures are logged and dropped.
#[derive(Debug, Error)]
pub enum FormError {
    /// Selector text could not be parsed
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Engine configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl FormError {
    pub(crate) fn selector(selector: &str, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            message: message.into(),
        }
    }
}

/// Why a validator produced no result.
///
/// The engine treats every variant as "no opinion": it is logged and the
/// validator's entry is left out of the control's results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidatorError {
    /// The validator could not evaluate the value
    #[error("validator '{validator}' failed: {message}")]
    Failed { validator: String, message: String },

    /// A declared validation attribute could not be interpreted
    #[error("validator '{validator}' cannot use {attribute}=\"{value}\"")]
    InvalidAttribute {
        validator: String,
        attribute: String,
        value: String,
    },

    /// The validator exceeded the configured time limit
    #[error("validator '{validator}' timed out after {}ms", .after.as_millis())]
    Timeout { validator: String, after: Duration },
}

impl ValidatorError {
    pub fn failed(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            validator: validator.into(),
            message: message.into(),
        }
    }

    pub fn invalid_attribute(
        validator: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            validator: validator.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_error_display() {
        let err = FormError::selector("input[", "unterminated attribute");
        assert_eq!(
            err.to_string(),
            "invalid selector 'input[': unterminated attribute"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = ValidatorError::Timeout {
            validator: "remote-unique".into(),
            after: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "validator 'remote-unique' timed out after 250ms"
        );
    }

    #[test]
    fn test_invalid_attribute_display() {
        let err = ValidatorError::invalid_attribute("min", "min", "abc");
        assert!(err.to_string().contains("min=\"abc\""));
    }
}
