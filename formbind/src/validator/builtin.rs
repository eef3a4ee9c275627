//! Attribute-driven validators.
//!
//! Each validator applies to controls declaring its attribute (`required`,
//! `pattern="..."`, `min="18"`, ...). Apart from `required`, an empty value
//! passes; emptiness is `required`'s concern.

use std::rc::Rc;

use async_trait::async_trait;
use formbind_pointer::get_value;
use regex::Regex;
use serde_json::{json, Value};

use super::{ValidationResult, Validator};
use crate::binder::parse_number;
use crate::control::Control;
use crate::error::ValidatorError;

/// Built-in validators in registration order.
pub fn default_validators() -> Vec<Rc<dyn Validator>> {
    vec![
        Rc::new(RequiredValidator),
        Rc::new(PatternValidator),
        Rc::new(MinValidator),
        Rc::new(MaxValidator),
        Rc::new(MinLengthValidator),
        Rc::new(MaxLengthValidator),
        Rc::new(GreaterThanValidator),
    ]
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s).and_then(|n| n.as_f64()),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read the validator's attribute, failing when the control lacks it.
fn declared(control: &dyn Control, validator: &str) -> Result<String, ValidatorError> {
    control
        .attribute(validator)
        .ok_or_else(|| ValidatorError::failed(validator, "attribute missing"))
}

fn numeric_attribute(control: &dyn Control, validator: &str) -> Result<f64, ValidatorError> {
    let raw = declared(control, validator)?;
    parse_number(&raw)
        .and_then(|n| n.as_f64())
        .ok_or_else(|| ValidatorError::invalid_attribute(validator, validator, raw))
}

fn length_attribute(control: &dyn Control, validator: &str) -> Result<usize, ValidatorError> {
    let raw = declared(control, validator)?;
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ValidatorError::invalid_attribute(validator, validator, raw))
}

fn length_of(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => as_text(other).chars().count(),
    }
}

/// `required`: `Null`, empty strings, empty arrays and `false` fail.
pub struct RequiredValidator;

#[async_trait(?Send)]
impl Validator for RequiredValidator {
    fn name(&self) -> &str {
        "required"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("required")
    }

    async fn validate(
        &self,
        _control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let valid = !is_empty(value) && value != &Value::Bool(false);
        Ok(ValidationResult::new(self.name(), json!(true), value.clone(), valid))
    }
}

/// `pattern`: the whole value must match the regular expression.
pub struct PatternValidator;

#[async_trait(?Send)]
impl Validator for PatternValidator {
    fn name(&self) -> &str {
        "pattern"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("pattern")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let pattern = declared(control, "pattern")?;
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|_| ValidatorError::invalid_attribute("pattern", "pattern", pattern.clone()))?;
        let valid = is_empty(value) || regex.is_match(&as_text(value));
        Ok(ValidationResult::new(
            self.name(),
            Value::String(pattern),
            value.clone(),
            valid,
        ))
    }
}

/// `min`: numeric lower bound, inclusive.
pub struct MinValidator;

#[async_trait(?Send)]
impl Validator for MinValidator {
    fn name(&self) -> &str {
        "min"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("min")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let min = numeric_attribute(control, "min")?;
        let valid = is_empty(value) || as_number(value).is_some_and(|n| n >= min);
        Ok(ValidationResult::new(self.name(), json!(min), value.clone(), valid))
    }
}

/// `max`: numeric upper bound, inclusive.
pub struct MaxValidator;

#[async_trait(?Send)]
impl Validator for MaxValidator {
    fn name(&self) -> &str {
        "max"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("max")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let max = numeric_attribute(control, "max")?;
        let valid = is_empty(value) || as_number(value).is_some_and(|n| n <= max);
        Ok(ValidationResult::new(self.name(), json!(max), value.clone(), valid))
    }
}

/// `minlength`: characters of a string, or items of an array.
pub struct MinLengthValidator;

#[async_trait(?Send)]
impl Validator for MinLengthValidator {
    fn name(&self) -> &str {
        "minlength"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("minlength")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let min = length_attribute(control, "minlength")?;
        let valid = is_empty(value) || length_of(value) >= min;
        Ok(ValidationResult::new(self.name(), json!(min), value.clone(), valid))
    }
}

pub struct MaxLengthValidator;

#[async_trait(?Send)]
impl Validator for MaxLengthValidator {
    fn name(&self) -> &str {
        "maxlength"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("maxlength")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let max = length_attribute(control, "maxlength")?;
        let valid = is_empty(value) || length_of(value) <= max;
        Ok(ValidationResult::new(self.name(), json!(max), value.clone(), valid))
    }
}

/// `greater-than="/other/field"`: the value must exceed the value found at
/// that pointer. Passes when either side is not a number.
pub struct GreaterThanValidator;

#[async_trait(?Send)]
impl Validator for GreaterThanValidator {
    fn name(&self) -> &str {
        "greater-than"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("greater-than")
    }

    async fn validate(
        &self,
        control: &dyn Control,
        value: &Value,
        data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        let other_pointer = declared(control, "greater-than")?;
        let other = get_value(data, &other_pointer).cloned().unwrap_or(Value::Null);
        let valid = match (as_number(value), as_number(&other)) {
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => true,
        };
        Ok(ValidationResult::new(self.name(), other, value.clone(), valid))
    }
}
