//! The host-facing control capability.
//!
//! The engine never touches a UI toolkit directly. A host exposes each element
//! through [`Control`]: identity, attributes, properties, children and event
//! listeners. Binders and validators are written against this trait only.
//!
//! [`VirtualControl`](crate::VirtualControl) is an in-memory implementation.

use std::fmt;
use std::rc::Rc;

use formbind_pointer::Pointer;
use serde_json::Value;
use ulid::Ulid;

/// Shared handle to a host control.
pub type ControlRef = Rc<dyn Control>;

/// Callback registered on a control for one event kind.
pub type EventListener = Rc<dyn Fn(&ControlEvent)>;

/// Stable identity of a control for the lifetime of the host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(Ulid);

impl ControlId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ControlId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by [`Control::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A native event raised by a control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlEvent {
    /// Event name, e.g. `change`, `blur`
    pub kind: String,
    /// Payload carried by custom controls
    pub detail: Option<Value>,
}

impl ControlEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// What the engine needs from a host element.
///
/// All methods take `&self`; hosts use interior mutability. Tag names are
/// compared case-insensitively.
pub trait Control {
    fn id(&self) -> ControlId;

    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn attribute_names(&self) -> Vec<String>;

    fn set_attribute(&self, name: &str, value: &str);

    fn remove_attribute(&self, name: &str);

    /// Live property such as `value` or `checked`.
    fn property(&self, name: &str) -> Option<Value>;

    fn set_property(&self, name: &str, value: Value);

    /// Direct children, including encapsulated and projected content.
    fn children(&self) -> Vec<ControlRef>;

    fn add_event_listener(&self, event: &str, listener: EventListener) -> ListenerId;

    fn remove_event_listener(&self, id: ListenerId);

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

impl fmt::Debug for dyn Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("id", &self.id())
            .field("tag", &self.tag_name())
            .finish()
    }
}

/// `control` followed by all of its descendants, depth first.
pub fn descendants_and_self(control: &ControlRef) -> Vec<ControlRef> {
    let mut out = Vec::new();
    let mut stack = vec![Rc::clone(control)];
    while let Some(next) = stack.pop() {
        let mut children = next.children();
        children.reverse();
        stack.extend(children);
        out.push(next);
    }
    out
}

/// The pointer a control declares in `bind_attribute`, if any.
pub fn bound_pointer(control: &dyn Control, bind_attribute: &str) -> Option<Pointer> {
    control
        .attribute(bind_attribute)
        .map(|pointer| Pointer::new(&pointer))
}

/// Attribute bindings declared as `<prefix><attribute>="<pointer>"`.
///
/// ```
/// use formbind::{attribute_bindings, VirtualControl};
///
/// let fieldset = VirtualControl::new("fieldset")
///     .with_attribute("bind-attr:disabled", "#/locked")
///     .into_ref();
/// let bindings = attribute_bindings(&*fieldset, "bind-attr:");
/// assert_eq!(bindings[0].0, "disabled");
/// assert_eq!(bindings[0].1.as_str(), "/locked");
/// ```
pub fn attribute_bindings(control: &dyn Control, prefix: &str) -> Vec<(String, Pointer)> {
    control
        .attribute_names()
        .into_iter()
        .filter_map(|name| {
            let target = name.strip_prefix(prefix)?;
            if target.is_empty() {
                return None;
            }
            let pointer = control.attribute(&name)?;
            Some((target.to_string(), Pointer::new(&pointer)))
        })
        .collect()
}

/// Mirror `value` onto an attribute. Null and `false` remove it, `true`
/// sets it empty, strings are written verbatim, anything else as JSON.
pub fn apply_attribute_value(control: &dyn Control, attribute: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => control.remove_attribute(attribute),
        Value::Bool(true) => control.set_attribute(attribute, ""),
        Value::String(s) => control.set_attribute(attribute, s),
        other => control.set_attribute(attribute, &other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualControl;
    use serde_json::json;

    #[test]
    fn test_descendants_order() {
        let form = VirtualControl::new("form").into_ref();
        let a = VirtualControl::new("div").into_ref();
        let a1 = VirtualControl::new("input").into_ref();
        let b = VirtualControl::new("select").into_ref();
        a.append_child(Rc::clone(&a1));
        form.append_child(Rc::clone(&a));
        form.append_child(Rc::clone(&b));

        let root: ControlRef = form.clone();
        let tags: Vec<String> = descendants_and_self(&root)
            .iter()
            .map(|c| c.tag_name())
            .collect();
        assert_eq!(tags, vec!["form", "div", "input", "select"]);
    }

    #[test]
    fn test_bound_pointer_normalized() {
        let input = VirtualControl::new("input")
            .with_attribute("bind", "#/personalData/age")
            .into_ref();
        assert_eq!(
            bound_pointer(&*input, "bind"),
            Some(Pointer::new("/personalData/age"))
        );
        assert_eq!(bound_pointer(&*input, "data-bind"), None);
    }

    #[test]
    fn test_attribute_bindings_skip_bare_prefix() {
        let el = VirtualControl::new("div")
            .with_attribute("bind-attr:", "/x")
            .with_attribute("bind-attr:title", "/name")
            .with_attribute("title", "static")
            .into_ref();
        let bindings = attribute_bindings(&*el, "bind-attr:");
        assert_eq!(bindings, vec![("title".to_string(), Pointer::new("/name"))]);
    }

    #[test]
    fn test_apply_attribute_value() {
        let el = VirtualControl::new("button").into_ref();
        apply_attribute_value(&*el, "disabled", &json!(true));
        assert_eq!(el.attribute("disabled"), Some(String::new()));
        apply_attribute_value(&*el, "disabled", &json!(false));
        assert_eq!(el.attribute("disabled"), None);
        apply_attribute_value(&*el, "data-count", &json!(3));
        assert_eq!(el.attribute("data-count"), Some("3".to_string()));
        apply_attribute_value(&*el, "title", &json!("Hi"));
        assert_eq!(el.attribute("title"), Some("Hi".to_string()));
        apply_attribute_value(&*el, "title", &Value::Null);
        assert!(!el.has_attribute("title"));
    }
}
