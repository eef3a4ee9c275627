//! Built-in binders for common control kinds.
//!
//! All of them react to `change` as the value commit and `blur` as the touch.

use std::rc::{Rc, Weak};

use serde_json::{Number, Value};

use super::Binder;
use crate::binding::{ChangeOptions, ControlCallbacks};
use crate::control::{Control, ControlEvent, ControlRef, ListenerId};
use crate::selector::Selector;
use crate::validator::ValidationResult;

/// Built-in binders in precedence order.
pub fn default_binders(bind_attribute: &str) -> Vec<Rc<dyn Binder>> {
    vec![
        Rc::new(CheckboxBinder::new(bind_attribute)),
        Rc::new(NumberBinder::new(bind_attribute)),
        Rc::new(SelectBinder::new(bind_attribute)),
        Rc::new(InputBinder::new(bind_attribute)),
        Rc::new(CustomElementBinder::new(bind_attribute)),
    ]
}

/// Wire `change` and `blur`, reading the committed value with `read`.
fn wire<F>(control: &ControlRef, callbacks: ControlCallbacks, read: F) -> Vec<ListenerId>
where
    F: Fn(&dyn Control, &ControlEvent) -> Option<(Value, ChangeOptions)> + 'static,
{
    let weak: Weak<dyn Control> = Rc::downgrade(control);
    let on_change = callbacks.clone();
    let change = control.add_event_listener(
        "change",
        Rc::new(move |event: &ControlEvent| {
            let Some(control) = weak.upgrade() else {
                return;
            };
            if let Some((value, options)) = read(control.as_ref(), event) {
                on_change.on_change_with(value, options);
            }
        }),
    );
    let blur = control.add_event_listener(
        "blur",
        Rc::new(move |_: &ControlEvent| callbacks.on_touch()),
    );
    vec![change, blur]
}

fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text-like `input` elements and `textarea`. Values are strings.
pub struct InputBinder {
    selector: Selector,
}

impl InputBinder {
    pub fn new(bind_attribute: &str) -> Self {
        Self {
            selector: Selector::tag("input")
                .has(bind_attribute)
                .or(Selector::tag("textarea").has(bind_attribute)),
        }
    }
}

impl Binder for InputBinder {
    fn name(&self) -> &str {
        "input"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        self.selector.matches(control)
    }

    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks) -> Vec<ListenerId> {
        wire(control, callbacks, |control, _| {
            let value = match control.property("value") {
                None | Some(Value::Null) => Value::String(String::new()),
                Some(Value::String(s)) => Value::String(s),
                Some(other) => Value::String(display_string(&other)),
            };
            Some((value, ChangeOptions::default()))
        })
    }

    fn write_value(&self, control: &dyn Control, value: &Value) {
        control.set_property("value", Value::String(display_string(value)));
    }

    fn report_validity(&self, control: &dyn Control, results: &[ValidationResult]) {
        if results.iter().all(|r| r.valid) {
            control.remove_attribute("aria-invalid");
        } else {
            control.set_attribute("aria-invalid", "true");
        }
    }
}

/// `input[type=number]` and `input[type=range]`. Empty text reads as `Null`.
pub struct NumberBinder {
    selector: Selector,
}

impl NumberBinder {
    pub fn new(bind_attribute: &str) -> Self {
        Self {
            selector: Selector::tag("input")
                .equals("type", "number")
                .has(bind_attribute)
                .or(Selector::tag("input")
                    .equals("type", "range")
                    .has(bind_attribute)),
        }
    }
}

/// Parse a number the way a numeric input would, keeping integers integral.
pub(crate) fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

impl Binder for NumberBinder {
    fn name(&self) -> &str {
        "number"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        self.selector.matches(control)
    }

    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks) -> Vec<ListenerId> {
        wire(control, callbacks, |control, _| {
            let value = match control.property("value") {
                Some(Value::Number(n)) => Value::Number(n),
                Some(Value::String(s)) if s.trim().is_empty() => Value::Null,
                // Unparseable text is passed on so validators can reject it.
                Some(Value::String(s)) => parse_number(&s).map(Value::Number).unwrap_or(Value::String(s)),
                _ => Value::Null,
            };
            Some((value, ChangeOptions::default()))
        })
    }

    fn write_value(&self, control: &dyn Control, value: &Value) {
        control.set_property("value", Value::String(display_string(value)));
    }

    fn report_validity(&self, control: &dyn Control, results: &[ValidationResult]) {
        if results.iter().all(|r| r.valid) {
            control.remove_attribute("aria-invalid");
        } else {
            control.set_attribute("aria-invalid", "true");
        }
    }
}

/// `input[type=checkbox]`, bound to a boolean through the `checked` property.
pub struct CheckboxBinder {
    selector: Selector,
}

impl CheckboxBinder {
    pub fn new(bind_attribute: &str) -> Self {
        Self {
            selector: Selector::tag("input")
                .equals("type", "checkbox")
                .has(bind_attribute),
        }
    }
}

impl Binder for CheckboxBinder {
    fn name(&self) -> &str {
        "checkbox"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        self.selector.matches(control)
    }

    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks) -> Vec<ListenerId> {
        wire(control, callbacks, |control, _| {
            let checked = matches!(control.property("checked"), Some(Value::Bool(true)));
            Some((Value::Bool(checked), ChangeOptions::default()))
        })
    }

    fn write_value(&self, control: &dyn Control, value: &Value) {
        control.set_property("checked", Value::Bool(value == &Value::Bool(true)));
    }
}

/// `select`; with the `multiple` attribute the value is an array of strings.
pub struct SelectBinder {
    selector: Selector,
}

impl SelectBinder {
    pub fn new(bind_attribute: &str) -> Self {
        Self {
            selector: Selector::tag("select").has(bind_attribute),
        }
    }
}

impl Binder for SelectBinder {
    fn name(&self) -> &str {
        "select"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        self.selector.matches(control)
    }

    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks) -> Vec<ListenerId> {
        wire(control, callbacks, |control, _| {
            let current = control.property("value").unwrap_or(Value::Null);
            let value = if control.has_attribute("multiple") {
                match current {
                    Value::Array(items) => Value::Array(items),
                    Value::Null => Value::Array(Vec::new()),
                    single => Value::Array(vec![single]),
                }
            } else {
                Value::String(display_string(&current))
            };
            Some((value, ChangeOptions::default()))
        })
    }

    fn write_value(&self, control: &dyn Control, value: &Value) {
        let shown = if control.has_attribute("multiple") {
            match value {
                Value::Array(items) => Value::Array(
                    items.iter().map(|v| Value::String(display_string(v))).collect(),
                ),
                Value::Null => Value::Array(Vec::new()),
                single => Value::Array(vec![Value::String(display_string(single))]),
            }
        } else {
            Value::String(display_string(value))
        };
        control.set_property("value", shown);
    }
}

/// Custom elements (tag names containing `-`).
///
/// A `change` event may carry `{ "value": .., "ref": "sub/path" }` as detail;
/// without detail the `value` property is read. Values are passed through
/// untouched, and validation results are exposed as the `validationResults`
/// property.
pub struct CustomElementBinder {
    bind_attribute: String,
}

impl CustomElementBinder {
    pub fn new(bind_attribute: &str) -> Self {
        Self {
            bind_attribute: bind_attribute.to_string(),
        }
    }
}

impl Binder for CustomElementBinder {
    fn name(&self) -> &str {
        "custom-element"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.tag_name().contains('-') && control.has_attribute(&self.bind_attribute)
    }

    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks) -> Vec<ListenerId> {
        wire(control, callbacks, |control, event| match &event.detail {
            Some(Value::Object(detail)) => {
                let value = detail.get("value").cloned().unwrap_or(Value::Null);
                let options = match detail.get("ref") {
                    Some(Value::String(reference)) => ChangeOptions::with_reference(reference.clone()),
                    _ => ChangeOptions::default(),
                };
                Some((value, options))
            }
            _ => Some((
                control.property("value").unwrap_or(Value::Null),
                ChangeOptions::default(),
            )),
        })
    }

    fn write_value(&self, control: &dyn Control, value: &Value) {
        control.set_property("value", value.clone());
    }

    fn report_validity(&self, control: &dyn Control, results: &[ValidationResult]) {
        let results = serde_json::to_value(results).unwrap_or(Value::Null);
        control.set_property("validationResults", results);
    }
}
