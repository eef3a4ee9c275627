//! Validator strategies, their results and registry.
//!
//! Validators are async so they can consult remote state; synchronous checks
//! simply return immediately. A validator that cannot judge a value returns a
//! [`ValidatorError`]; the engine logs it and leaves the entry out.

mod builtin;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use formbind_pointer::Pointer;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::control::{Control, ControlId, ControlRef};
use crate::error::ValidatorError;

pub use builtin::{
    default_validators, GreaterThanValidator, MaxLengthValidator, MaxValidator,
    MinLengthValidator, MinValidator, PatternValidator, RequiredValidator,
};

/// Strategy judging a control's value.
#[async_trait(?Send)]
pub trait Validator {
    fn name(&self) -> &str;

    fn matches(&self, control: &dyn Control) -> bool;

    /// Judge `value`, the data at the control's pointer. `data` is a snapshot
    /// of the whole tree for cross-field checks.
    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        data: &Value,
    ) -> Result<ValidationResult, ValidatorError>;
}

/// One validator's judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub name: String,
    pub expected: Value,
    pub actual: Value,
    pub valid: bool,
    /// Defaults to the control's own pointer when the validator leaves it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Pointer>,
}

impl ValidationResult {
    pub fn new(name: impl Into<String>, expected: Value, actual: Value, valid: bool) -> Self {
        Self {
            name: name.into(),
            expected,
            actual,
            valid,
            field: None,
        }
    }

    pub fn with_field(mut self, field: Pointer) -> Self {
        self.field = Some(field);
        self
    }
}

/// All results for one control.
#[derive(Clone)]
pub struct ControlValidation {
    pub control: ControlRef,
    pub pointer: Option<Pointer>,
    pub results: Vec<ValidationResult>,
    pub visited: bool,
}

impl ControlValidation {
    pub fn id(&self) -> ControlId {
        self.control.id()
    }

    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.valid)
    }
}

impl fmt::Debug for ControlValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlValidation")
            .field("control", &self.control.id())
            .field("pointer", &self.pointer)
            .field("results", &self.results)
            .field("visited", &self.visited)
            .finish()
    }
}

impl Serialize for ControlValidation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ControlValidation", 4)?;
        state.serialize_field("control", &self.control.id().to_string())?;
        state.serialize_field("pointer", &self.pointer)?;
        state.serialize_field("results", &self.results)?;
        state.serialize_field("visited", &self.visited)?;
        state.end()
    }
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormValidationResult {
    /// One group per validated control, in binding order
    pub result: Vec<ControlValidation>,
    /// Groups containing at least one failed result
    pub errors: Vec<ControlValidation>,
    pub is_valid: bool,
}

impl FormValidationResult {
    pub fn from_groups(result: Vec<ControlValidation>) -> Self {
        let errors: Vec<ControlValidation> =
            result.iter().filter(|g| !g.is_valid()).cloned().collect();
        Self {
            is_valid: errors.is_empty(),
            result,
            errors,
        }
    }

    /// Errors of visited controls only; what the UI may show.
    pub fn visible(&self) -> Vec<ControlValidation> {
        self.errors.iter().filter(|g| g.visited).cloned().collect()
    }

    pub fn group_for(&self, control: ControlId) -> Option<&ControlValidation> {
        self.result.iter().find(|g| g.id() == control)
    }
}

fn same_validator(a: &Rc<dyn Validator>, b: &Rc<dyn Validator>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Ordered validator list.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: RefCell<Vec<Rc<dyn Validator>>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for validator in default_validators() {
            registry.add(validator, false);
        }
        registry
    }

    /// Register at the end, or at the front with `prepend`. A validator
    /// already present is moved.
    pub fn add(&self, validator: Rc<dyn Validator>, prepend: bool) {
        let mut list = self.validators.borrow_mut();
        list.retain(|existing| !same_validator(existing, &validator));
        trace!(validator = validator.name(), prepend, "validator registered");
        if prepend {
            list.insert(0, validator);
        } else {
            list.push(validator);
        }
    }

    pub fn remove(&self, validator: &Rc<dyn Validator>) {
        self.validators
            .borrow_mut()
            .retain(|existing| !same_validator(existing, validator));
    }

    /// Validators accepting `control`, in registration order.
    pub fn matching_validators(&self, control: &dyn Control) -> Vec<Rc<dyn Validator>> {
        self.validators
            .borrow()
            .iter()
            .filter(|v| v.matches(control))
            .cloned()
            .collect()
    }

    /// Keep results accepted by `predicate`, dropping groups left empty.
    pub fn filter_validation_results<P>(
        groups: &[ControlValidation],
        predicate: P,
    ) -> Vec<ControlValidation>
    where
        P: Fn(&ControlValidation, &ValidationResult) -> bool,
    {
        groups
            .iter()
            .filter_map(|group| {
                let results: Vec<ValidationResult> = group
                    .results
                    .iter()
                    .filter(|r| predicate(group, r))
                    .cloned()
                    .collect();
                (!results.is_empty()).then(|| ControlValidation {
                    results,
                    ..group.clone()
                })
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.validators
            .borrow()
            .iter()
            .map(|v| v.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.validators.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.validators.borrow_mut().clear();
    }
}
