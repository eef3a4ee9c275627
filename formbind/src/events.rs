//! Events published to [`BindingSet::subscribe`](crate::BindingSet::subscribe) receivers.

use formbind_pointer::Pointer;
use serde::Serialize;
use serde_json::Value;

use crate::validator::{ControlValidation, FormValidationResult};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FormEvent {
    /// A user edit passed validation
    Change(ChangeEvent),
    /// A validation pass finished
    ReportValidity(ReportValidityEvent),
}

/// Payload of a valid, value-changing edit.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    /// Copy of the whole data tree after the write
    pub data: Value,
    pub pointer: Pointer,
    pub value: Value,
    pub validation_results: FormValidationResult,
}

/// Payload of a report pass.
///
/// `errors` holds only visited controls; `is_valid` reflects every group,
/// visited or not.
#[derive(Debug, Clone, Serialize)]
pub struct ReportValidityEvent {
    pub result: Vec<ControlValidation>,
    pub errors: Vec<ControlValidation>,
    pub is_valid: bool,
}

impl From<&FormValidationResult> for ReportValidityEvent {
    fn from(validation: &FormValidationResult) -> Self {
        Self {
            result: validation.result.clone(),
            errors: validation.visible(),
            is_valid: validation.is_valid,
        }
    }
}
